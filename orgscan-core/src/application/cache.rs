// orgscan-core/src/application/cache.rs

// Two physical records per logical key:
//   orgscan.meta.<key>  small, answers "is it cached?" and feeds details()
//   orgscan.data.<key>  the payload
// Data is always written before metadata and removed together with it. A
// missing or unreadable half makes the whole entry absent and is cleaned up
// on the spot.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::dataset::DatasetValue;
use crate::domain::entity::Entity;
use crate::infrastructure::codec;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::storage::KeyValueStorage;

pub const CACHE_PREFIX: &str = "orgscan.";
pub const METADATA_PREFIX: &str = "orgscan.meta.";
pub const DATA_PREFIX: &str = "orgscan.data.";
/// Object fields with this suffix are back-references rebuilt on each load.
pub const BACK_REFERENCE_SUFFIX: &str = "Ref";

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Map,
    Array,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub length: usize,
    /// Milliseconds since the epoch.
    pub created: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DataRecord {
    /// `[[key, value], ...]` for maps, `[value, ...]` for arrays.
    content: Value,
    created: i64,
}

/// One line of [`DataCache::details`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheItemDetails {
    pub name: String,
    pub is_empty: bool,
    pub is_map: bool,
    pub length: usize,
    pub created: DateTime<Utc>,
}

pub struct DataCache {
    storage: Arc<dyn KeyValueStorage>,
    ttl: Duration,
    clock: Clock,
}

impl DataCache {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            storage,
            ttl: Duration::hours(24),
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub fn has(&self, key: &str) -> bool {
        let (meta_key, data_key) = physical_keys(key);
        match self.storage.contains(&meta_key) {
            Ok(true) => {}
            Ok(false) => return false,
            Err(e) => {
                warn!(key, error = %e, "Cache metadata unreadable");
                return false;
            }
        }
        match self.storage.contains(&data_key) {
            Ok(true) => true,
            Ok(false) | Err(_) => {
                warn!(key, "Cache metadata without data, removing it");
                self.remove_quietly(&meta_key);
                false
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<DatasetValue> {
        match self.read_entry(key) {
            Ok(Some(value)) => Some(value),
            Ok(None) => None,
            Err(reason) => {
                warn!(key, reason = %reason, "Evicting cache entry");
                self.remove(key);
                None
            }
        }
    }

    // Ok(None): plain miss. Err: the entry exists but must be evicted.
    fn read_entry(&self, key: &str) -> Result<Option<DatasetValue>, String> {
        let (meta_key, data_key) = physical_keys(key);

        let Some(meta_raw) = self.storage.get_item(&meta_key).map_err(|e| e.to_string())? else {
            return Ok(None);
        };
        let mut meta: MetadataRecord = codec::decode(&meta_raw).map_err(|e| e.to_string())?;

        let Some(data_raw) = self.storage.get_item(&data_key).map_err(|e| e.to_string())? else {
            return Err("data record missing".to_string());
        };
        let data: DataRecord = codec::decode(&data_raw).map_err(|e| e.to_string())?;

        let created = Utc
            .timestamp_millis_opt(meta.created)
            .single()
            .ok_or_else(|| format!("invalid creation timestamp {}", meta.created))?;
        if self.now() - created > self.ttl {
            return Err("expired".to_string());
        }

        let value = match (meta.kind, data.content) {
            (ContentKind::Map, Value::Array(pairs)) => {
                let mut map = BTreeMap::new();
                for pair in pairs {
                    let (name, mut item): (String, Value) =
                        serde_json::from_value(pair).map_err(|e| e.to_string())?;
                    strip_back_references(&mut item);
                    map.insert(name, entity_from(item)?);
                }
                DatasetValue::Map(map)
            }
            (ContentKind::Array, Value::Array(items)) => DatasetValue::List(
                items
                    .into_iter()
                    .map(|mut item| {
                        strip_back_references(&mut item);
                        entity_from(item)
                    })
                    .collect::<Result<_, _>>()?,
            ),
            (kind, _) => return Err(format!("content does not match type {:?}", kind)),
        };

        if meta.length != value.len() {
            meta.length = value.len();
            if let Err(e) = self.write_metadata(&meta_key, &meta) {
                warn!(key, error = %e, "Could not refresh cache metadata length");
            }
        }
        debug!(key, length = value.len(), "Cache hit");
        Ok(Some(value))
    }

    /// Best effort: a failed write is logged, rolled back and otherwise
    /// ignored. `None` removes the entry.
    pub fn set(&self, key: &str, value: Option<&DatasetValue>) {
        let Some(value) = value else {
            self.remove(key);
            return;
        };
        if let Err(e) = self.write_entry(key, value) {
            warn!(key, error = %e, "Cache write failed, entry dropped");
            self.remove(key);
        }
    }

    fn write_entry(&self, key: &str, value: &DatasetValue) -> Result<(), InfrastructureError> {
        let (meta_key, data_key) = physical_keys(key);
        let created = self.now().timestamp_millis();

        let (kind, content) = match value {
            DatasetValue::Map(map) => {
                let mut pairs = Vec::with_capacity(map.len());
                for (name, entity) in map {
                    let mut item = serde_json::to_value(entity)?;
                    strip_back_references(&mut item);
                    pairs.push(Value::Array(vec![Value::String(name.clone()), item]));
                }
                (ContentKind::Map, Value::Array(pairs))
            }
            DatasetValue::List(list) => {
                let mut items = Vec::with_capacity(list.len());
                for entity in list {
                    let mut item = serde_json::to_value(entity)?;
                    strip_back_references(&mut item);
                    items.push(item);
                }
                (ContentKind::Array, Value::Array(items))
            }
        };

        let data = codec::encode(&DataRecord { content, created })?;
        let meta = MetadataRecord {
            kind,
            length: value.len(),
            created,
        };

        self.storage.set_item(&data_key, &data)?;
        self.write_metadata(&meta_key, &meta)?;
        debug!(key, length = meta.length, bytes = data.len(), "Cache entry written");
        Ok(())
    }

    fn write_metadata(&self, meta_key: &str, meta: &MetadataRecord) -> Result<(), InfrastructureError> {
        let encoded = codec::encode(meta)?;
        self.storage.set_item(meta_key, &encoded)
    }

    pub fn remove(&self, key: &str) {
        let (meta_key, data_key) = physical_keys(key);
        self.remove_quietly(&meta_key);
        self.remove_quietly(&data_key);
    }

    fn remove_quietly(&self, physical_key: &str) {
        if let Err(e) = self.storage.remove_item(physical_key) {
            warn!(key = physical_key, error = %e, "Could not remove cache record");
        }
    }

    /// Lists cached entries from their metadata alone.
    pub fn details(&self) -> Vec<CacheItemDetails> {
        let keys = match self.storage.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Cannot enumerate cache");
                return vec![];
            }
        };
        keys.iter()
            .filter_map(|k| k.strip_prefix(METADATA_PREFIX).map(|name| (k, name)))
            .filter_map(|(physical, name)| {
                let raw = self.storage.get_item(physical).ok().flatten()?;
                let meta: MetadataRecord = match codec::decode(&raw) {
                    Ok(meta) => meta,
                    Err(e) => {
                        warn!(key = name, error = %e, "Unreadable cache metadata");
                        return None;
                    }
                };
                Some(CacheItemDetails {
                    name: name.to_string(),
                    is_empty: meta.length == 0,
                    is_map: meta.kind == ContentKind::Map,
                    length: meta.length,
                    created: Utc.timestamp_millis_opt(meta.created).single()?,
                })
            })
            .collect()
    }

    /// Removes every record under the cache prefix, including orphans.
    pub fn clear(&self) {
        match self.storage.keys() {
            Ok(keys) => keys
                .iter()
                .filter(|k| k.starts_with(CACHE_PREFIX))
                .for_each(|k| self.remove_quietly(k)),
            Err(e) => warn!(error = %e, "Cannot enumerate cache"),
        }
    }
}

fn physical_keys(key: &str) -> (String, String) {
    (
        format!("{}{}", METADATA_PREFIX, key),
        format!("{}{}", DATA_PREFIX, key),
    )
}

fn entity_from(item: Value) -> Result<Entity, String> {
    serde_json::from_value(item).map_err(|e| e.to_string())
}

/// Drops every object field whose name ends with the back-reference suffix,
/// at any depth.
pub fn strip_back_references(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|k, _| !k.ends_with(BACK_REFERENCE_SUFFIX));
            map.values_mut().for_each(strip_back_references);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_back_references),
        _ => {}
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::entity::{Profile, User};
    use crate::infrastructure::storage::MemoryStorage;
    use serde_json::json;
    use std::sync::Mutex;

    fn user(id: &str, with_profile: bool) -> Entity {
        Entity::User(User {
            id: id.into(),
            name: format!("user {}", id),
            is_active: true,
            profile_id: "00e000000000001".into(),
            profile_ref: with_profile.then(|| {
                Box::new(Profile {
                    id: "00e000000000001".into(),
                    name: "Standard".into(),
                    ..Profile::default()
                })
            }),
            ..User::default()
        })
    }

    fn users_map() -> DatasetValue {
        DatasetValue::Map(BTreeMap::from([
            ("005000000000001".to_string(), user("005000000000001", true)),
            ("005000000000002".to_string(), user("005000000000002", false)),
        ]))
    }

    fn setup() -> (Arc<MemoryStorage>, DataCache) {
        let storage = Arc::new(MemoryStorage::new());
        let cache = DataCache::new(storage.clone());
        (storage, cache)
    }

    #[test]
    fn test_set_then_get_drops_back_references() {
        let (storage, cache) = setup();
        cache.set("users", Some(&users_map()));

        assert!(cache.has("users"));
        let DatasetValue::Map(map) = cache.get("users").unwrap() else {
            panic!("expected a map");
        };
        assert_eq!(map.len(), 2);
        let Entity::User(first) = &map["005000000000001"] else {
            panic!("expected a user");
        };
        assert!(first.profile_ref.is_none());
        assert_eq!(first.profile_id, "00e000000000001");

        assert_eq!(
            storage.keys().unwrap(),
            vec!["orgscan.data.users".to_string(), "orgscan.meta.users".to_string()]
        );
    }

    #[test]
    fn test_list_round_trip() {
        let (_, cache) = setup();
        let list = DatasetValue::List(vec![user("005000000000003", false)]);
        cache.set("list", Some(&list));
        assert_eq!(cache.get("list"), Some(list));
    }

    #[test]
    fn test_none_removes_entry() {
        let (storage, cache) = setup();
        cache.set("users", Some(&users_map()));
        cache.set("users", None);
        assert!(!cache.has("users"));
        assert!(storage.keys().unwrap().is_empty());
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let storage = Arc::new(MemoryStorage::new());
        let now = Arc::new(Mutex::new(Utc::now()));
        let clock_now = now.clone();
        let cache = DataCache::new(storage.clone())
            .with_clock(Arc::new(move || *clock_now.lock().unwrap()));

        cache.set("users", Some(&users_map()));
        *now.lock().unwrap() += Duration::hours(24) + Duration::seconds(1);

        assert_eq!(cache.get("users"), None);
        assert!(!cache.has("users"));
        assert!(storage.keys().unwrap().is_empty());
    }

    #[test]
    fn test_metadata_without_data_heals() {
        let (storage, cache) = setup();
        cache.set("users", Some(&users_map()));
        storage.remove_item("orgscan.data.users").unwrap();

        assert!(!cache.has("users"));
        assert_eq!(storage.get_item("orgscan.meta.users").unwrap(), None);
    }

    #[test]
    fn test_corrupt_data_is_a_miss() {
        let (storage, cache) = setup();
        cache.set("users", Some(&users_map()));
        storage.set_item("orgscan.data.users", "zz-not-hex").unwrap();

        assert_eq!(cache.get("users"), None);
        assert!(storage.keys().unwrap().is_empty());
    }

    #[test]
    fn test_orphan_data_is_ignored_then_overwritten() {
        let (storage, cache) = setup();
        storage.set_item("orgscan.data.users", "stale").unwrap();
        assert!(!cache.has("users"));
        assert_eq!(cache.get("users"), None);

        cache.set("users", Some(&users_map()));
        assert_eq!(cache.get("users").map(|v| v.len()), Some(2));
    }

    #[test]
    fn test_metadata_length_is_refreshed() {
        let (storage, cache) = setup();
        cache.set("users", Some(&users_map()));
        let stale = MetadataRecord {
            kind: ContentKind::Map,
            length: 99,
            created: Utc::now().timestamp_millis(),
        };
        storage
            .set_item("orgscan.meta.users", &codec::encode(&stale).unwrap())
            .unwrap();

        assert!(cache.get("users").is_some());
        assert_eq!(cache.details()[0].length, 2);
    }

    #[test]
    fn test_quota_failure_rolls_back_both_records() {
        let storage = Arc::new(MemoryStorage::with_capacity(64));
        let cache = DataCache::new(storage.clone());
        cache.set("users", Some(&users_map()));

        assert!(!cache.has("users"));
        assert!(storage.keys().unwrap().is_empty());
    }

    #[test]
    fn test_failed_metadata_write_removes_written_data() {
        let created = Utc::now();
        let fixed = |storage: Arc<MemoryStorage>| {
            DataCache::new(storage).with_clock(Arc::new(move || created))
        };

        // Measure both records with the same timestamp so their sizes match.
        let sizing = Arc::new(MemoryStorage::new());
        fixed(sizing.clone()).set("users", Some(&users_map()));
        let bytes = |key: &str| key.len() + sizing.get_item(key).unwrap().unwrap().len();
        let data_bytes = bytes("orgscan.data.users");
        let meta_bytes = bytes("orgscan.meta.users");

        let storage = Arc::new(MemoryStorage::with_capacity(data_bytes + meta_bytes - 1));
        let cache = fixed(storage.clone());
        cache.set("users", Some(&users_map()));

        assert!(!cache.has("users"));
        assert!(storage.keys().unwrap().is_empty());
        assert_eq!(storage.used_bytes(), 0);
    }

    #[test]
    fn test_details_and_clear() {
        let (storage, cache) = setup();
        cache.set("users", Some(&users_map()));
        cache.set("empty", Some(&DatasetValue::List(vec![])));
        storage.set_item("unrelated", "keep me").unwrap();

        let details = cache.details();
        assert_eq!(details.len(), 2);
        let empty = details.iter().find(|d| d.name == "empty").unwrap();
        assert!(empty.is_empty && !empty.is_map);
        let users = details.iter().find(|d| d.name == "users").unwrap();
        assert!(users.is_map);
        assert_eq!(users.length, 2);

        cache.clear();
        assert!(cache.details().is_empty());
        assert_eq!(storage.keys().unwrap(), vec!["unrelated".to_string()]);
    }

    #[test]
    fn test_strip_back_references_is_recursive() {
        let mut value = json!({
            "profileRef": { "id": "x" },
            "name": "n",
            "nested": [{ "ownerRef": 1, "keep": true }]
        });
        strip_back_references(&mut value);
        assert_eq!(value, json!({ "name": "n", "nested": [{ "keep": true }] }));
    }
}
