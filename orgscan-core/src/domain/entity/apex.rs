// orgscan-core/src/domain/entity/apex.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityType, impl_scored};
use crate::domain::dependency::Dependencies;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ApexClass {
    pub id: String,
    pub url: String,
    pub name: String,
    pub api_version: Option<f64>,
    pub package: String,
    pub is_test: bool,
    pub is_test_see_all_data: bool,
    pub is_abstract: bool,
    pub is_interface: bool,
    pub is_enum: bool,
    /// `with sharing`, `without sharing`, `inherited sharing` or nothing.
    pub specified_sharing: Option<String>,
    pub nb_system_asserts: u32,
    /// Line coverage ratio between 0 and 1, when the org has coverage data.
    pub coverage: Option<f64>,
    pub length: u32,
    pub hard_coded_urls: Vec<String>,
    pub hard_coded_ids: Vec<String>,
    pub created_date: Option<DateTime<Utc>>,
    pub last_modified_date: Option<DateTime<Utc>>,
    pub dependencies: Option<Dependencies>,
    pub score: u32,
    pub bad_fields: Vec<String>,
    pub bad_reason_ids: Vec<u32>,
}

impl_scored!(ApexClass, EntityType::ApexClass, id, dependencies);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ApexTrigger {
    pub id: String,
    pub url: String,
    pub name: String,
    pub api_version: Option<f64>,
    pub package: String,
    pub object_name: String,
    pub is_active: bool,
    pub length: u32,
    #[serde(rename = "hasSOQL")]
    pub has_soql: bool,
    #[serde(rename = "hasDML")]
    pub has_dml: bool,
    pub hard_coded_urls: Vec<String>,
    pub hard_coded_ids: Vec<String>,
    pub created_date: Option<DateTime<Utc>>,
    pub last_modified_date: Option<DateTime<Utc>>,
    pub dependencies: Option<Dependencies>,
    pub score: u32,
    pub bad_fields: Vec<String>,
    pub bad_reason_ids: Vec<u32>,
}

impl_scored!(ApexTrigger, EntityType::ApexTrigger, id, dependencies);
