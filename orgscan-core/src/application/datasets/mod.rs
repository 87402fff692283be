// orgscan-core/src/application/datasets/mod.rs

// Built-in extraction units. Each one issues a fixed set of calls through the
// access layer and maps raw rows onto record properties; the factory does the
// sealing and scoring.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::application::ports::Dataset;
use crate::domain::ids::id15;
use crate::ports::platform::Row;

pub mod apex_classes;
pub mod apex_triggers;
pub mod custom_fields;
pub mod permission_sets;
pub mod profile_password_policies;
pub mod profiles;
pub mod users;

pub use apex_classes::ApexClassesDataset;
pub use apex_triggers::ApexTriggersDataset;
pub use custom_fields::CustomFieldsDataset;
pub use permission_sets::PermissionSetsDataset;
pub use profile_password_policies::ProfilePasswordPoliciesDataset;
pub use profiles::ProfilesDataset;
pub use users::UsersDataset;

pub mod alias {
    pub const CUSTOM_FIELDS: &str = "custom-fields";
    pub const APEX_CLASSES: &str = "apex-classes";
    pub const APEX_TRIGGERS: &str = "apex-triggers";
    pub const USERS: &str = "users";
    pub const PROFILES: &str = "profiles";
    pub const PERMISSION_SETS: &str = "permission-sets";
    pub const PROFILE_PASSWORD_POLICIES: &str = "profile-password-policies";
}

/// Managed code installed from a package cannot be changed, so it is left out.
pub(crate) const EDITABLE_ONLY: &str = "ManageableState IN ('installedEditable', 'unmanaged')";

pub fn builtin_datasets() -> Vec<Arc<dyn Dataset>> {
    vec![
        Arc::new(CustomFieldsDataset),
        Arc::new(ApexClassesDataset),
        Arc::new(ApexTriggersDataset),
        Arc::new(UsersDataset),
        Arc::new(ProfilesDataset),
        Arc::new(PermissionSetsDataset),
        Arc::new(ProfilePasswordPoliciesDataset),
    ]
}

/// Reads `path` (dot-separated for relationship fields) from a row.
pub(crate) fn field<'a>(row: &'a Row, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = row.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    (!current.is_null()).then_some(current)
}

pub(crate) fn text(row: &Row, path: &str) -> Option<String> {
    match field(row, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn text_or_empty(row: &Row, path: &str) -> String {
    text(row, path).unwrap_or_default()
}

pub(crate) fn flag(row: &Row, path: &str) -> bool {
    matches!(field(row, path), Some(Value::Bool(true)))
}

pub(crate) fn number(row: &Row, path: &str) -> Option<f64> {
    match field(row, path)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

pub(crate) fn count(row: &Row, path: &str) -> u64 {
    number(row, path).map_or(0, |n| n.max(0.0) as u64)
}

/// 15-character form of an id column, empty when absent.
pub(crate) fn short_id(row: &Row, path: &str) -> String {
    text(row, path).map(|id| id15(&id).to_string()).unwrap_or_default()
}

/// Platform timestamps look like `2024-01-31T09:15:00.000+0000`; records
/// hold RFC 3339.
pub(crate) fn timestamp(row: &Row, path: &str) -> Value {
    let Some(raw) = text(row, path) else {
        return Value::Null;
    };
    DateTime::parse_from_rfc3339(&raw)
        .or_else(|_| DateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map(|dt| Value::String(dt.with_timezone(&Utc).to_rfc3339()))
        .unwrap_or(Value::Null)
}

pub(crate) fn record_url(id: &str) -> String {
    format!("/{}", id)
}

/// Unwraps a `json!({...})` literal into a property bag.
pub(crate) fn properties(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
