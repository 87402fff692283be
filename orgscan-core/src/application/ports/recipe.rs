// orgscan-core/src/application/ports/recipe.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::domain::dataset::{DatasetIdentity, DatasetValue};
use crate::domain::entity::Entity;
use crate::error::OrgScanError;

/// Datasets produced by the orchestrator, keyed by alias.
pub type DatasetResults = HashMap<String, Arc<DatasetValue>>;

/// A use-case: which datasets it needs and how to shape them for display.
pub trait Recipe: Send + Sync {
    fn alias(&self) -> &'static str;

    fn extract(&self, parameters: &BTreeMap<String, String>) -> Vec<DatasetIdentity>;

    fn transform(
        &self,
        data: &DatasetResults,
        parameters: &BTreeMap<String, String>,
    ) -> Result<Vec<Entity>, OrgScanError>;
}

/// Fetches a dataset the recipe declared in `extract`.
pub fn required<'a>(data: &'a DatasetResults, alias: &str) -> Result<&'a DatasetValue, OrgScanError> {
    data.get(alias)
        .map(Arc::as_ref)
        .ok_or_else(|| OrgScanError::InternalError(format!("Dataset '{}' missing from results", alias)))
}
