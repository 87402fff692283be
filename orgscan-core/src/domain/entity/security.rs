// orgscan-core/src/domain/entity/security.rs

use serde::{Deserialize, Serialize};

use super::{EntityType, impl_scored};

/// Permissions that make a profile or permission set "powerful".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ImportantPermissions {
    pub api_enabled: bool,
    pub view_setup: bool,
    pub modify_all_data: bool,
    pub view_all_data: bool,
    pub manage_users: bool,
    pub customize_application: bool,
}

impl ImportantPermissions {
    pub fn grants_full_data_access(&self) -> bool {
        self.modify_all_data || self.view_all_data
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Profile {
    pub id: String,
    pub url: String,
    pub name: String,
    pub description: Option<String>,
    pub license: String,
    pub is_custom: bool,
    pub package: String,
    pub member_count: u32,
    pub important_permissions: ImportantPermissions,
    pub score: u32,
    pub bad_fields: Vec<String>,
    pub bad_reason_ids: Vec<u32>,
}

impl_scored!(Profile, EntityType::Profile, id);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct PermissionSet {
    pub id: String,
    pub url: String,
    pub name: String,
    pub description: Option<String>,
    pub license: String,
    pub is_custom: bool,
    pub is_group: bool,
    pub package: String,
    pub member_count: u32,
    pub important_permissions: ImportantPermissions,
    pub score: u32,
    pub bad_fields: Vec<String>,
    pub bad_reason_ids: Vec<u32>,
}

impl_scored!(PermissionSet, EntityType::PermissionSet, id);

/// Password and lockout settings of one profile, read from the metadata API.
/// The record is keyed by profile name since the metadata API has no ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ProfilePasswordPolicy {
    pub name: String,
    /// Minutes; 0 means locked until an admin resets it.
    pub lockout_interval: u32,
    /// `None` means no lockout at all.
    pub max_login_attempts: Option<u32>,
    pub minimum_password_length: u32,
    pub minimum_password_lifetime: bool,
    pub obscure: bool,
    /// 0 = no restriction, 1 = alpha + numeric, higher is stricter.
    pub password_complexity: u8,
    /// Days; 0 means never expires.
    pub password_expiration: u32,
    pub password_history: u32,
    /// 0 = answer may contain the password, 1 = it may not.
    pub password_question: u8,
    pub score: u32,
    pub bad_fields: Vec<String>,
    pub bad_reason_ids: Vec<u32>,
}

impl_scored!(ProfilePasswordPolicy, EntityType::ProfilePasswordPolicy, name);
