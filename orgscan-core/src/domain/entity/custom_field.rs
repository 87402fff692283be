// orgscan-core/src/domain/entity/custom_field.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityType, impl_scored};
use crate::domain::dependency::Dependencies;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct CustomField {
    pub id: String,
    pub url: String,
    /// Developer name with the `__c` suffix.
    pub name: String,
    pub label: String,
    pub package: String,
    pub description: Option<String>,
    pub object_id: String,
    pub object_name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub tooltip: Option<String>,
    pub length: Option<u32>,
    pub formula: Option<String>,
    pub is_restricted_picklist: bool,
    pub hard_coded_urls: Vec<String>,
    pub hard_coded_ids: Vec<String>,
    pub created_date: Option<DateTime<Utc>>,
    pub last_modified_date: Option<DateTime<Utc>>,
    pub dependencies: Option<Dependencies>,
    pub score: u32,
    pub bad_fields: Vec<String>,
    pub bad_reason_ids: Vec<u32>,
}

impl_scored!(CustomField, EntityType::CustomField, id, dependencies);
