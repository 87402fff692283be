// orgscan-core/src/domain/scoring/rule.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::domain::entity::{Entity, EntityType};

pub const CURRENT_API_VERSION: f64 = 60.0;

/// Inputs a predicate may read besides the record itself. Fixed for the
/// lifetime of a scoring engine so that scores are reproducible.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext {
    pub now: DateTime<Utc>,
    pub current_api_version: f64,
}

impl Default for RuleContext {
    fn default() -> Self {
        Self {
            now: Utc::now(),
            current_api_version: CURRENT_API_VERSION,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuleError {
    #[error("rule does not apply to {0}")]
    NotApplicable(EntityType),
    #[error("field '{0}' has no value")]
    MissingValue(&'static str),
}

pub type Predicate = fn(&Entity, &RuleContext) -> Result<bool, RuleError>;

/// One entry of the rule table. Ids are permanent: reports refer to them.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRule {
    pub id: u32,
    pub description: &'static str,
    pub bad_field: &'static str,
    pub error_message: &'static str,
    pub applicable_types: &'static [EntityType],
    #[serde(skip)]
    pub predicate: Predicate,
}

impl ScoreRule {
    pub fn applies_to(&self, entity_type: EntityType) -> bool {
        self.applicable_types.contains(&entity_type)
    }

    pub fn evaluate(&self, entity: &Entity, context: &RuleContext) -> Result<bool, RuleError> {
        (self.predicate)(entity, context)
    }
}

impl std::fmt::Debug for ScoreRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoreRule")
            .field("id", &self.id)
            .field("bad_field", &self.bad_field)
            .field("applicable_types", &self.applicable_types)
            .finish()
    }
}
