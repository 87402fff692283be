// orgscan-core/src/domain/entity/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityType, Profile, impl_scored};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct User {
    pub id: String,
    pub url: String,
    pub name: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub number_failed_logins: u32,
    pub on_lightning_experience: bool,
    pub profile_id: String,
    /// Joined by the users recipe; never persisted.
    pub profile_ref: Option<Box<Profile>>,
    pub score: u32,
    pub bad_fields: Vec<String>,
    pub bad_reason_ids: Vec<u32>,
}

impl_scored!(User, EntityType::User, id);
