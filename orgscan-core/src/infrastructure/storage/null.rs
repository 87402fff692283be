// orgscan-core/src/infrastructure/storage/null.rs

use crate::infrastructure::error::InfrastructureError;
use crate::ports::storage::KeyValueStorage;

/// Caching disabled: writes are accepted and forgotten.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStorage;

impl KeyValueStorage for NullStorage {
    fn get_item(&self, _key: &str) -> Result<Option<String>, InfrastructureError> {
        Ok(None)
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<(), InfrastructureError> {
        Ok(())
    }

    fn remove_item(&self, _key: &str) -> Result<(), InfrastructureError> {
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, InfrastructureError> {
        Ok(vec![])
    }
}
