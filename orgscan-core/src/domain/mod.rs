// orgscan-core/src/domain/mod.rs

pub mod dataset;
pub mod dependency;
pub mod encoding;
pub mod entity;
pub mod error;
pub mod ids;
pub mod quota;
pub mod scoring;

// Re-exports so the other layers import from `domain` directly
pub use dataset::{DatasetIdentity, DatasetValue};
pub use dependency::{Dependencies, DependencyEdge, DependencyGraph, DependencyItem};
pub use entity::{Entity, EntityType};
pub use error::DomainError;
pub use quota::{ApiUsage, QuotaSnapshot, QuotaZone};
pub use scoring::{ScoreRule, ScoringEngine};
