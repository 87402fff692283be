// orgscan-core/src/domain/scoring/engine.rs

use tracing::warn;

use super::rule::{RuleContext, ScoreRule};
use super::rules::rule_table;
use crate::domain::entity::{Entity, EntityType};
use crate::domain::error::DomainError;

pub struct ScoringEngine {
    rules: Vec<ScoreRule>,
    context: RuleContext,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(RuleContext::default())
    }
}

impl ScoringEngine {
    pub fn new(context: RuleContext) -> Self {
        Self::with_rules(rule_table(), context)
    }

    pub fn with_rules(mut rules: Vec<ScoreRule>, context: RuleContext) -> Self {
        rules.sort_by_key(|r| r.id);
        Self { rules, context }
    }

    pub fn context(&self) -> &RuleContext {
        &self.context
    }

    pub fn get_rule(&self, id: u32) -> Result<&ScoreRule, DomainError> {
        self.rules
            .binary_search_by_key(&id, |r| r.id)
            .map(|index| &self.rules[index])
            .map_err(|_| DomainError::RuleNotFound(id))
    }

    pub fn get_all_rules(&self) -> &[ScoreRule] {
        &self.rules
    }

    pub fn rules_for(&self, entity_type: EntityType) -> impl Iterator<Item = &ScoreRule> {
        self.rules.iter().filter(move |r| r.applies_to(entity_type))
    }

    /// Re-scores the record from scratch. Rules run in id order; a rule that
    /// fails to evaluate is logged and counts as not matching.
    pub fn compute_score(&self, entity: &mut Entity) {
        entity.reset_score();
        let entity_type = entity.entity_type();

        for rule in self.rules_for(entity_type) {
            match rule.evaluate(entity, &self.context) {
                Ok(true) => entity.mark_bad(rule.bad_field, rule.id),
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        rule = rule.id,
                        entity = %entity_type,
                        id = entity.id(),
                        "Score rule skipped: {}",
                        e
                    );
                }
            }
        }
    }
}
