// orgscan-core/src/application/ports/mod.rs

pub mod dataset;
pub mod recipe;

pub use dataset::{Dataset, DatasetContext};
pub use recipe::{DatasetResults, Recipe};
