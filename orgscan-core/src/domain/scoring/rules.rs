// orgscan-core/src/domain/scoring/rules.rs
//
// The rule table. Ids are append-only: never renumber, reorder or reuse them.

use chrono::Duration;

use super::rule::{RuleError, ScoreRule};
use crate::domain::entity::{Entity, EntityType};

const APEX_TYPES: &[EntityType] = &[EntityType::ApexClass, EntityType::ApexTrigger];
const CODE_TYPES: &[EntityType] = &[
    EntityType::CustomField,
    EntityType::ApexClass,
    EntityType::ApexTrigger,
];
const ACCESS_TYPES: &[EntityType] = &[EntityType::Profile, EntityType::PermissionSet];

/// Three platform releases a year: anything older than three years.
const API_VERSION_WINDOW: f64 = 9.0;
const MIN_COVERAGE: f64 = 0.75;
const MAX_TRIGGER_LENGTH: u32 = 5000;
const INACTIVE_USER_DAYS: i64 = 180;
const MAX_FAILED_LOGINS: u32 = 5;
const MAX_PASSWORD_EXPIRATION_DAYS: u32 = 90;
const MIN_PASSWORD_HISTORY: u32 = 3;
const MIN_PASSWORD_LENGTH: u32 = 8;
const MAX_LOGIN_ATTEMPTS: u32 = 10;

macro_rules! expect_record {
    ($entity:expr, $variant:ident) => {
        match $entity {
            Entity::$variant(record) => Ok(record),
            other => Err(RuleError::NotApplicable(other.entity_type())),
        }
    };
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).is_none_or(str::is_empty)
}

pub fn rule_table() -> Vec<ScoreRule> {
    vec![
        ScoreRule {
            id: 0,
            description: "Not referenced anywhere",
            bad_field: "dependencies.referenced",
            error_message: "This component is not referenced by any other component. Check if it is still needed.",
            applicable_types: &[EntityType::CustomField, EntityType::ApexClass],
            predicate: |entity, _| {
                let deps = match entity {
                    Entity::CustomField(f) => &f.dependencies,
                    Entity::ApexClass(c) if c.is_test => return Ok(false),
                    Entity::ApexClass(c) => &c.dependencies,
                    other => return Err(RuleError::NotApplicable(other.entity_type())),
                };
                Ok(deps.as_ref().is_some_and(|d| d.is_unreferenced()))
            },
        },
        ScoreRule {
            id: 1,
            description: "No description",
            bad_field: "description",
            error_message: "Custom components should be documented with a description.",
            applicable_types: &[
                EntityType::CustomField,
                EntityType::Profile,
                EntityType::PermissionSet,
            ],
            predicate: |entity, _| match entity {
                Entity::CustomField(f) => Ok(is_blank(&f.description)),
                Entity::Profile(p) => Ok(p.is_custom && is_blank(&p.description)),
                Entity::PermissionSet(p) => Ok(p.is_custom && is_blank(&p.description)),
                other => Err(RuleError::NotApplicable(other.entity_type())),
            },
        },
        ScoreRule {
            id: 2,
            description: "API version too old",
            bad_field: "apiVersion",
            error_message: "The API version of this code is more than three years old. Update it to benefit from the latest platform behaviour.",
            applicable_types: APEX_TYPES,
            predicate: |entity, ctx| {
                let version = match entity {
                    Entity::ApexClass(c) => c.api_version,
                    Entity::ApexTrigger(t) => t.api_version,
                    other => return Err(RuleError::NotApplicable(other.entity_type())),
                };
                let version = version.ok_or(RuleError::MissingValue("apiVersion"))?;
                Ok(version < ctx.current_api_version - API_VERSION_WINDOW)
            },
        },
        ScoreRule {
            id: 3,
            description: "No assert in this Apex test",
            bad_field: "nbSystemAsserts",
            error_message: "A test without assertion only raises coverage; it does not verify anything.",
            applicable_types: &[EntityType::ApexClass],
            predicate: |entity, _| {
                let class = expect_record!(entity, ApexClass)?;
                Ok(class.is_test && class.nb_system_asserts == 0)
            },
        },
        ScoreRule {
            id: 4,
            description: "Apex test with SeeAllData=true",
            bad_field: "isTestSeeAllData",
            error_message: "Tests should create their own data instead of reading the org's data.",
            applicable_types: &[EntityType::ApexClass],
            predicate: |entity, _| {
                let class = expect_record!(entity, ApexClass)?;
                Ok(class.is_test && class.is_test_see_all_data)
            },
        },
        ScoreRule {
            id: 5,
            description: "Sharing mode not specified",
            bad_field: "specifiedSharing",
            error_message: "Declare 'with sharing', 'without sharing' or 'inherited sharing' explicitly.",
            applicable_types: &[EntityType::ApexClass],
            predicate: |entity, _| {
                let class = expect_record!(entity, ApexClass)?;
                Ok(!class.is_test
                    && !class.is_interface
                    && !class.is_enum
                    && class.specified_sharing.is_none())
            },
        },
        ScoreRule {
            id: 6,
            description: "Code coverage below 75%",
            bad_field: "coverage",
            error_message: "Line coverage of this class is below the deployment threshold.",
            applicable_types: &[EntityType::ApexClass],
            predicate: |entity, _| {
                let class = expect_record!(entity, ApexClass)?;
                Ok(!class.is_test
                    && !class.is_interface
                    && class.coverage.is_some_and(|c| c < MIN_COVERAGE))
            },
        },
        ScoreRule {
            id: 7,
            description: "Hard-coded URL",
            bad_field: "hardCodedUrls",
            error_message: "Instance URLs change with domain migrations and sandboxes. Use relative URLs or custom metadata.",
            applicable_types: CODE_TYPES,
            predicate: |entity, _| match entity {
                Entity::CustomField(f) => Ok(!f.hard_coded_urls.is_empty()),
                Entity::ApexClass(c) => Ok(!c.hard_coded_urls.is_empty()),
                Entity::ApexTrigger(t) => Ok(!t.hard_coded_urls.is_empty()),
                other => Err(RuleError::NotApplicable(other.entity_type())),
            },
        },
        ScoreRule {
            id: 8,
            description: "Hard-coded record id",
            bad_field: "hardCodedIds",
            error_message: "Record ids differ between orgs. Query the record or use custom metadata instead.",
            applicable_types: CODE_TYPES,
            predicate: |entity, _| match entity {
                Entity::CustomField(f) => Ok(!f.hard_coded_ids.is_empty()),
                Entity::ApexClass(c) => Ok(!c.hard_coded_ids.is_empty()),
                Entity::ApexTrigger(t) => Ok(!t.hard_coded_ids.is_empty()),
                other => Err(RuleError::NotApplicable(other.entity_type())),
            },
        },
        ScoreRule {
            id: 9,
            description: "SOQL query inside a trigger",
            bad_field: "hasSOQL",
            error_message: "Move queries out of the trigger body into a handler class.",
            applicable_types: &[EntityType::ApexTrigger],
            predicate: |entity, _| Ok(expect_record!(entity, ApexTrigger)?.has_soql),
        },
        ScoreRule {
            id: 10,
            description: "DML statement inside a trigger",
            bad_field: "hasDML",
            error_message: "Move DML statements out of the trigger body into a handler class.",
            applicable_types: &[EntityType::ApexTrigger],
            predicate: |entity, _| Ok(expect_record!(entity, ApexTrigger)?.has_dml),
        },
        ScoreRule {
            id: 11,
            description: "Inactive trigger",
            bad_field: "isActive",
            error_message: "An inactive trigger is dead code. Delete it if it is not needed anymore.",
            applicable_types: &[EntityType::ApexTrigger],
            predicate: |entity, _| Ok(!expect_record!(entity, ApexTrigger)?.is_active),
        },
        ScoreRule {
            id: 12,
            description: "Trigger contains too much logic",
            bad_field: "length",
            error_message: "Triggers should delegate to handler classes and stay short.",
            applicable_types: &[EntityType::ApexTrigger],
            predicate: |entity, _| Ok(expect_record!(entity, ApexTrigger)?.length > MAX_TRIGGER_LENGTH),
        },
        ScoreRule {
            id: 13,
            description: "Active user who never logged in",
            bad_field: "lastLogin",
            error_message: "This active user never logged in. Deactivate it to free the licence.",
            applicable_types: &[EntityType::User],
            predicate: |entity, _| {
                let user = expect_record!(entity, User)?;
                Ok(user.is_active && user.last_login.is_none())
            },
        },
        ScoreRule {
            id: 14,
            description: "Active user not logged in for six months",
            bad_field: "lastLogin",
            error_message: "This active user did not log in for more than six months.",
            applicable_types: &[EntityType::User],
            predicate: |entity, ctx| {
                let user = expect_record!(entity, User)?;
                Ok(user.is_active
                    && user
                        .last_login
                        .is_some_and(|at| ctx.now - at > Duration::days(INACTIVE_USER_DAYS)))
            },
        },
        ScoreRule {
            id: 15,
            description: "Too many failed logins",
            bad_field: "numberFailedLogins",
            error_message: "Repeated failed logins may indicate a brute-force attempt.",
            applicable_types: &[EntityType::User],
            predicate: |entity, _| {
                Ok(expect_record!(entity, User)?.number_failed_logins > MAX_FAILED_LOGINS)
            },
        },
        ScoreRule {
            id: 16,
            description: "User still on the classic interface",
            bad_field: "onLightningExperience",
            error_message: "The classic interface is no longer enhanced. Move this user to the new interface.",
            applicable_types: &[EntityType::User],
            predicate: |entity, _| {
                let user = expect_record!(entity, User)?;
                Ok(user.is_active && !user.on_lightning_experience)
            },
        },
        ScoreRule {
            id: 17,
            description: "No active member",
            bad_field: "memberCount",
            error_message: "Nobody is assigned to this custom profile or permission set.",
            applicable_types: ACCESS_TYPES,
            predicate: |entity, _| match entity {
                Entity::Profile(p) => Ok(p.is_custom && p.member_count == 0),
                Entity::PermissionSet(p) => Ok(p.is_custom && !p.is_group && p.member_count == 0),
                other => Err(RuleError::NotApplicable(other.entity_type())),
            },
        },
        ScoreRule {
            id: 18,
            description: "Grants Modify All Data or View All Data",
            bad_field: "importantPermissions",
            error_message: "Access to all data should stay limited to a few administration profiles.",
            applicable_types: ACCESS_TYPES,
            predicate: |entity, _| match entity {
                Entity::Profile(p) => {
                    Ok(p.is_custom && p.important_permissions.grants_full_data_access())
                }
                Entity::PermissionSet(p) => {
                    Ok(p.is_custom && p.important_permissions.grants_full_data_access())
                }
                other => Err(RuleError::NotApplicable(other.entity_type())),
            },
        },
        ScoreRule {
            id: 19,
            description: "Password never expires",
            bad_field: "passwordExpiration",
            error_message: "Passwords should expire.",
            applicable_types: &[EntityType::ProfilePasswordPolicy],
            predicate: |entity, _| {
                Ok(expect_record!(entity, ProfilePasswordPolicy)?.password_expiration == 0)
            },
        },
        ScoreRule {
            id: 20,
            description: "Password expires after more than 90 days",
            bad_field: "passwordExpiration",
            error_message: "Passwords should expire at least every 90 days.",
            applicable_types: &[EntityType::ProfilePasswordPolicy],
            predicate: |entity, _| {
                Ok(expect_record!(entity, ProfilePasswordPolicy)?.password_expiration
                    > MAX_PASSWORD_EXPIRATION_DAYS)
            },
        },
        ScoreRule {
            id: 21,
            description: "Password history too short",
            bad_field: "passwordHistory",
            error_message: "Remember at least the three previous passwords.",
            applicable_types: &[EntityType::ProfilePasswordPolicy],
            predicate: |entity, _| {
                Ok(expect_record!(entity, ProfilePasswordPolicy)?.password_history
                    < MIN_PASSWORD_HISTORY)
            },
        },
        ScoreRule {
            id: 22,
            description: "Minimum password length under 8",
            bad_field: "minimumPasswordLength",
            error_message: "Passwords should be at least eight characters long.",
            applicable_types: &[EntityType::ProfilePasswordPolicy],
            predicate: |entity, _| {
                Ok(expect_record!(entity, ProfilePasswordPolicy)?.minimum_password_length
                    < MIN_PASSWORD_LENGTH)
            },
        },
        ScoreRule {
            id: 23,
            description: "Password complexity too weak",
            bad_field: "passwordComplexity",
            error_message: "Passwords should at least mix alphabetic and numeric characters.",
            applicable_types: &[EntityType::ProfilePasswordPolicy],
            predicate: |entity, _| {
                Ok(expect_record!(entity, ProfilePasswordPolicy)?.password_complexity < 1)
            },
        },
        ScoreRule {
            id: 24,
            description: "No lockout or lockout after more than 10 attempts",
            bad_field: "maxLoginAttempts",
            error_message: "Lock accounts after ten failed attempts at most.",
            applicable_types: &[EntityType::ProfilePasswordPolicy],
            predicate: |entity, _| {
                let policy = expect_record!(entity, ProfilePasswordPolicy)?;
                Ok(policy
                    .max_login_attempts
                    .is_none_or(|attempts| attempts > MAX_LOGIN_ATTEMPTS))
            },
        },
        ScoreRule {
            id: 25,
            description: "Security answer may contain the password",
            bad_field: "passwordQuestion",
            error_message: "The answer to the security question should not be allowed to contain the password.",
            applicable_types: &[EntityType::ProfilePasswordPolicy],
            predicate: |entity, _| {
                Ok(expect_record!(entity, ProfilePasswordPolicy)?.password_question == 0)
            },
        },
        ScoreRule {
            id: 26,
            description: "Name suggests a test or dummy component",
            bad_field: "name",
            error_message: "Components named after tests or dummies usually leaked from a sandbox.",
            applicable_types: &[EntityType::CustomField, EntityType::ApexClass],
            predicate: |entity, _| {
                let name = match entity {
                    Entity::CustomField(f) => &f.name,
                    Entity::ApexClass(c) if c.is_test => return Ok(false),
                    Entity::ApexClass(c) => &c.name,
                    other => return Err(RuleError::NotApplicable(other.entity_type())),
                };
                let lower = name.to_lowercase();
                Ok(lower.contains("test") || lower.contains("dummy"))
            },
        },
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::{Map, Value};
    use std::collections::HashSet;

    #[test]
    fn test_rule_ids_are_dense_and_ordered() {
        let rules = rule_table();
        for (position, rule) in rules.iter().enumerate() {
            assert_eq!(rule.id as usize, position, "rule ids must stay append-only");
        }
    }

    #[test]
    fn test_every_rule_targets_at_least_one_type() {
        for rule in rule_table() {
            assert!(!rule.applicable_types.is_empty(), "rule #{} has no target", rule.id);
            assert!(!rule.bad_field.is_empty());
        }
    }

    #[test]
    fn test_every_entity_type_is_scored() {
        let covered: HashSet<EntityType> = rule_table()
            .iter()
            .flat_map(|r| r.applicable_types.iter().copied())
            .collect();
        for entity_type in EntityType::ALL {
            assert!(covered.contains(&entity_type), "{} has no rule", entity_type);
        }
    }

    #[test]
    fn test_bad_fields_name_serialised_record_fields() {
        for rule in rule_table() {
            let top_level = rule.bad_field.split('.').next().unwrap();
            for entity_type in rule.applicable_types {
                let entity = Entity::from_properties(*entity_type, Map::new()).unwrap();
                let serialised = serde_json::to_value(&entity).unwrap();
                let record = serialised
                    .as_object()
                    .and_then(|tagged| tagged.values().next())
                    .and_then(Value::as_object)
                    .unwrap();
                assert!(
                    record.contains_key(top_level),
                    "rule #{} flags '{}', which {} does not serialise",
                    rule.id,
                    rule.bad_field,
                    entity_type
                );
            }
        }
    }
}
