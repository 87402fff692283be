// orgscan-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Daily API quota exceeded: usage ratio {used_ratio:.3} (critical threshold {threshold:.2})")]
    #[diagnostic(
        code(orgscan::domain::quota),
        help("Wait for the daily API counter to reset, or rely on cached datasets until then.")
    )]
    QuotaExceeded { used_ratio: f64, threshold: f64 },

    #[error("Unknown property '{property}' for entity '{entity}'")]
    #[diagnostic(
        code(orgscan::domain::unknown_property),
        help("Records are sealed: only the declared fields of the entity type can be set.")
    )]
    UnknownProperty { entity: String, property: String },

    #[error("Invalid properties for entity '{entity}': {reason}")]
    #[diagnostic(code(orgscan::domain::invalid_properties))]
    InvalidProperties { entity: String, reason: String },

    #[error("Score rule #{0} does not exist")]
    #[diagnostic(
        code(orgscan::domain::rule_not_found),
        help("Rule ids are permanent and listed by `orgscan rules`.")
    )]
    RuleNotFound(u32),

    #[error("Unknown entity type: {0}")]
    #[diagnostic(code(orgscan::domain::entity_type))]
    UnknownEntityType(String),
}
