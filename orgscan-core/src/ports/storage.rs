// orgscan-core/src/ports/storage.rs

// A flat string-to-string store, like a browser's local storage. The cache
// layers its two-record protocol on top; adapters only move bytes.

use crate::infrastructure::error::InfrastructureError;

pub trait KeyValueStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, InfrastructureError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), InfrastructureError>;

    /// Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), InfrastructureError>;

    fn keys(&self) -> Result<Vec<String>, InfrastructureError>;

    fn contains(&self, key: &str) -> Result<bool, InfrastructureError> {
        Ok(self.get_item(key)?.is_some())
    }
}
