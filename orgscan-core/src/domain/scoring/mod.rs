// orgscan-core/src/domain/scoring/mod.rs

pub mod code_scanner;
pub mod engine;
pub mod rule;
pub mod rules;

pub use code_scanner::{ApexFacts, CodeScanner};
pub use engine::ScoringEngine;
pub use rule::{CURRENT_API_VERSION, RuleContext, RuleError, ScoreRule};
