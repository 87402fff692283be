// orgscan-core/src/domain/entity/mod.rs

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::domain::dependency::Dependencies;
use crate::domain::error::DomainError;

pub mod apex;
pub mod custom_field;
pub mod security;
pub mod user;

pub use apex::{ApexClass, ApexTrigger};
pub use custom_field::CustomField;
pub use security::{ImportantPermissions, PermissionSet, Profile, ProfilePasswordPolicy};
pub use user::User;

/// Keys written by the scoring engine. They are declared on every record but
/// can never be supplied as input properties.
pub const SCORE_FIELDS: [&str; 3] = ["score", "badFields", "badReasonIds"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityType {
    CustomField,
    ApexClass,
    ApexTrigger,
    User,
    Profile,
    PermissionSet,
    ProfilePasswordPolicy,
}

impl EntityType {
    pub const ALL: [EntityType; 7] = [
        Self::CustomField,
        Self::ApexClass,
        Self::ApexTrigger,
        Self::User,
        Self::Profile,
        Self::PermissionSet,
        Self::ProfilePasswordPolicy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CustomField => "CustomField",
            Self::ApexClass => "ApexClass",
            Self::ApexTrigger => "ApexTrigger",
            Self::User => "User",
            Self::Profile => "Profile",
            Self::PermissionSet => "PermissionSet",
            Self::ProfilePasswordPolicy => "ProfilePasswordPolicy",
        }
    }

    /// Types whose records carry a dependency fragment.
    pub fn has_dependencies(&self) -> bool {
        matches!(
            self,
            Self::CustomField | Self::ApexClass | Self::ApexTrigger
        )
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::UnknownEntityType(s.to_string()))
    }
}

/// Accessors shared by every scored record.
pub trait Scored {
    const ENTITY_TYPE: EntityType;

    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn score(&self) -> u32;
    fn bad_fields(&self) -> &[String];
    fn bad_reason_ids(&self) -> &[u32];
    fn mark_bad(&mut self, field: &str, reason_id: u32);
    fn reset_score(&mut self);

    fn attach_dependencies(&mut self, _dependencies: Dependencies) {}
}

macro_rules! impl_scored {
    ($ty:ty, $entity_type:expr, $id:ident) => {
        impl $crate::domain::entity::Scored for $ty {
            const ENTITY_TYPE: $crate::domain::entity::EntityType = $entity_type;

            fn id(&self) -> &str {
                &self.$id
            }
            fn name(&self) -> &str {
                &self.name
            }
            fn score(&self) -> u32 {
                self.score
            }
            fn bad_fields(&self) -> &[String] {
                &self.bad_fields
            }
            fn bad_reason_ids(&self) -> &[u32] {
                &self.bad_reason_ids
            }
            fn mark_bad(&mut self, field: &str, reason_id: u32) {
                self.score += 1;
                self.bad_fields.push(field.to_string());
                self.bad_reason_ids.push(reason_id);
            }
            fn reset_score(&mut self) {
                self.score = 0;
                self.bad_fields.clear();
                self.bad_reason_ids.clear();
            }
        }
    };
    ($ty:ty, $entity_type:expr, $id:ident, dependencies) => {
        impl $crate::domain::entity::Scored for $ty {
            const ENTITY_TYPE: $crate::domain::entity::EntityType = $entity_type;

            fn id(&self) -> &str {
                &self.$id
            }
            fn name(&self) -> &str {
                &self.name
            }
            fn score(&self) -> u32 {
                self.score
            }
            fn bad_fields(&self) -> &[String] {
                &self.bad_fields
            }
            fn bad_reason_ids(&self) -> &[u32] {
                &self.bad_reason_ids
            }
            fn mark_bad(&mut self, field: &str, reason_id: u32) {
                self.score += 1;
                self.bad_fields.push(field.to_string());
                self.bad_reason_ids.push(reason_id);
            }
            fn reset_score(&mut self) {
                self.score = 0;
                self.bad_fields.clear();
                self.bad_reason_ids.clear();
            }
            fn attach_dependencies(&mut self, dependencies: $crate::domain::dependency::Dependencies) {
                self.dependencies = Some(dependencies);
            }
        }
    };
}
pub(crate) use impl_scored;

/// Closed union of every record type the pipeline produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entity {
    CustomField(CustomField),
    ApexClass(ApexClass),
    ApexTrigger(ApexTrigger),
    User(User),
    Profile(Profile),
    PermissionSet(PermissionSet),
    ProfilePasswordPolicy(ProfilePasswordPolicy),
}

macro_rules! on_record {
    ($entity:expr, $record:ident => $body:expr) => {
        match $entity {
            Entity::CustomField($record) => $body,
            Entity::ApexClass($record) => $body,
            Entity::ApexTrigger($record) => $body,
            Entity::User($record) => $body,
            Entity::Profile($record) => $body,
            Entity::PermissionSet($record) => $body,
            Entity::ProfilePasswordPolicy($record) => $body,
        }
    };
}

impl Entity {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::CustomField(_) => EntityType::CustomField,
            Self::ApexClass(_) => EntityType::ApexClass,
            Self::ApexTrigger(_) => EntityType::ApexTrigger,
            Self::User(_) => EntityType::User,
            Self::Profile(_) => EntityType::Profile,
            Self::PermissionSet(_) => EntityType::PermissionSet,
            Self::ProfilePasswordPolicy(_) => EntityType::ProfilePasswordPolicy,
        }
    }

    pub fn id(&self) -> &str {
        on_record!(self, r => r.id())
    }

    pub fn name(&self) -> &str {
        on_record!(self, r => r.name())
    }

    pub fn score(&self) -> u32 {
        on_record!(self, r => r.score())
    }

    pub fn bad_fields(&self) -> &[String] {
        on_record!(self, r => r.bad_fields())
    }

    pub fn bad_reason_ids(&self) -> &[u32] {
        on_record!(self, r => r.bad_reason_ids())
    }

    pub(crate) fn mark_bad(&mut self, field: &str, reason_id: u32) {
        on_record!(self, r => r.mark_bad(field, reason_id))
    }

    pub(crate) fn reset_score(&mut self) {
        on_record!(self, r => r.reset_score())
    }

    pub(crate) fn attach_dependencies(&mut self, dependencies: Dependencies) {
        on_record!(self, r => r.attach_dependencies(dependencies))
    }

    /// Builds a record from a dynamic property bag. Only declared fields are
    /// accepted and the score fields are reserved for the scoring engine.
    pub fn from_properties(
        entity_type: EntityType,
        properties: Map<String, Value>,
    ) -> Result<Entity, DomainError> {
        match entity_type {
            EntityType::CustomField => sealed::<CustomField>(entity_type, properties).map(Entity::CustomField),
            EntityType::ApexClass => sealed::<ApexClass>(entity_type, properties).map(Entity::ApexClass),
            EntityType::ApexTrigger => sealed::<ApexTrigger>(entity_type, properties).map(Entity::ApexTrigger),
            EntityType::User => sealed::<User>(entity_type, properties).map(Entity::User),
            EntityType::Profile => sealed::<Profile>(entity_type, properties).map(Entity::Profile),
            EntityType::PermissionSet => {
                sealed::<PermissionSet>(entity_type, properties).map(Entity::PermissionSet)
            }
            EntityType::ProfilePasswordPolicy => {
                sealed::<ProfilePasswordPolicy>(entity_type, properties)
                    .map(Entity::ProfilePasswordPolicy)
            }
        }
    }
}

fn sealed<T>(entity_type: EntityType, properties: Map<String, Value>) -> Result<T, DomainError>
where
    T: Default + Serialize + DeserializeOwned,
{
    let declared = declared_fields::<T>(entity_type)?;

    for key in properties.keys() {
        if SCORE_FIELDS.contains(&key.as_str()) {
            return Err(DomainError::InvalidProperties {
                entity: entity_type.to_string(),
                reason: format!("'{}' is computed by the scoring engine", key),
            });
        }
        if !declared.contains_key(key) {
            return Err(DomainError::UnknownProperty {
                entity: entity_type.to_string(),
                property: key.clone(),
            });
        }
    }

    serde_json::from_value(Value::Object(properties)).map_err(|e| DomainError::InvalidProperties {
        entity: entity_type.to_string(),
        reason: e.to_string(),
    })
}

// Every record serialises all of its fields (no skip_serializing_if), so the
// keys of a default instance are exactly the declared shape.
fn declared_fields<T: Default + Serialize>(entity_type: EntityType) -> Result<Map<String, Value>, DomainError> {
    match serde_json::to_value(T::default()) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) | Err(_) => Err(DomainError::InvalidProperties {
            entity: entity_type.to_string(),
            reason: "record shape is not an object".to_string(),
        }),
    }
}
