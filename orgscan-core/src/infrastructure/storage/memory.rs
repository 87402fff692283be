// orgscan-core/src/infrastructure/storage/memory.rs

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::infrastructure::error::InfrastructureError;
use crate::ports::storage::KeyValueStorage;

/// In-process store. With a capacity it behaves like a browser's local
/// storage: a write that would exceed the byte budget is refused.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<BTreeMap<String, String>>,
    capacity: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Mutex::new(BTreeMap::new()),
            capacity: Some(capacity),
        }
    }

    /// Bytes currently held (keys and values).
    pub fn used_bytes(&self) -> usize {
        self.lock().iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        // A panic while holding the lock cannot leave the map half-written.
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, InfrastructureError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), InfrastructureError> {
        let mut items = self.lock();
        if let Some(capacity) = self.capacity {
            let others: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let requested = key.len() + value.len();
            if others + requested > capacity {
                return Err(InfrastructureError::StorageQuotaExceeded {
                    key: key.to_string(),
                    requested,
                    capacity,
                });
            }
        }
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), InfrastructureError> {
        self.lock().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, InfrastructureError> {
        Ok(self.lock().keys().cloned().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_basic_operations() -> Result<()> {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("a")?, None);
        storage.set_item("a", "1")?;
        storage.set_item("b", "2")?;
        assert_eq!(storage.get_item("a")?.as_deref(), Some("1"));
        assert_eq!(storage.keys()?, vec!["a".to_string(), "b".to_string()]);
        storage.remove_item("a")?;
        storage.remove_item("missing")?;
        assert!(!storage.contains("a")?);
        Ok(())
    }

    #[test]
    fn test_capacity_is_enforced() -> Result<()> {
        let storage = MemoryStorage::with_capacity(10);
        storage.set_item("k", "12345")?;
        let err = storage.set_item("z", "123456789").unwrap_err();
        assert!(matches!(err, InfrastructureError::StorageQuotaExceeded { .. }));

        // Overwriting a key only counts its new size.
        storage.set_item("k", "123456789")?;
        assert_eq!(storage.used_bytes(), 10);
        Ok(())
    }
}
