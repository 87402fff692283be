// orgscan-core/src/domain/dataset.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::encoding::url_encode;
use crate::domain::entity::Entity;

/// Which extraction unit to run, with which parameters, and where its result
/// is cached. Two parameterisations of the same alias never share a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetIdentity {
    pub alias: String,
    pub cache_key: String,
    pub parameters: BTreeMap<String, String>,
}

impl DatasetIdentity {
    pub fn new(alias: impl Into<String>) -> Self {
        let alias = alias.into();
        Self {
            cache_key: alias.clone(),
            alias,
            parameters: BTreeMap::new(),
        }
    }

    /// Adds a parameter and folds it into the cache key.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self.cache_key = derive_cache_key(&self.alias, &self.parameters);
        self
    }

    /// Overrides the derived cache key.
    pub fn with_cache_key(mut self, cache_key: impl Into<String>) -> Self {
        self.cache_key = cache_key.into();
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }
}

fn derive_cache_key(alias: &str, parameters: &BTreeMap<String, String>) -> String {
    if parameters.is_empty() {
        return alias.to_string();
    }
    let suffix: Vec<String> = parameters
        .iter()
        .map(|(name, value)| format!("{}={}", url_encode(name), url_encode(value)))
        .collect();
    format!("{}?{}", alias, suffix.join("&"))
}

/// Output of an extraction unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DatasetValue {
    /// Records keyed by their 15-character id (or natural key).
    Map(BTreeMap<String, Entity>),
    List(Vec<Entity>),
}

impl DatasetValue {
    pub fn len(&self) -> usize {
        match self {
            Self::Map(map) => map.len(),
            Self::List(list) => list.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entities(&self) -> Box<dyn Iterator<Item = &Entity> + '_> {
        match self {
            Self::Map(map) => Box::new(map.values()),
            Self::List(list) => Box::new(list.iter()),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Entity> {
        match self {
            Self::Map(map) => map.get(key),
            Self::List(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_tracks_parameters() {
        let plain = DatasetIdentity::new("custom-fields");
        assert_eq!(plain.cache_key, "custom-fields");

        let account = DatasetIdentity::new("custom-fields").with_parameter("object", "Account");
        let contact = DatasetIdentity::new("custom-fields").with_parameter("object", "Contact");
        assert_eq!(account.cache_key, "custom-fields?object=Account");
        assert_ne!(account.cache_key, contact.cache_key);
        assert_eq!(account.parameter("object"), Some("Account"));
    }

    #[test]
    fn test_parameter_order_does_not_change_key() {
        let a = DatasetIdentity::new("x")
            .with_parameter("b", "2")
            .with_parameter("a", "1");
        let b = DatasetIdentity::new("x")
            .with_parameter("a", "1")
            .with_parameter("b", "2");
        assert_eq!(a.cache_key, b.cache_key);
    }

    #[test]
    fn test_parameter_values_cannot_forge_other_parameters() {
        let forged = DatasetIdentity::new("x").with_parameter("object", "A&z=1");
        let split = DatasetIdentity::new("x")
            .with_parameter("object", "A")
            .with_parameter("z", "1");
        assert_ne!(forged.cache_key, split.cache_key);
        assert_eq!(forged.cache_key, "x?object=A%26z%3D1");
        assert_eq!(forged.parameter("object"), Some("A&z=1"));
    }

    #[test]
    fn test_explicit_cache_key() {
        let id = DatasetIdentity::new("profiles").with_cache_key("profiles-v2");
        assert_eq!(id.alias, "profiles");
        assert_eq!(id.cache_key, "profiles-v2");
    }
}
