// orgscan-core/src/application/recipes/listing.rs

use std::collections::BTreeMap;

use super::sorted;
use crate::application::ports::recipe::{DatasetResults, Recipe, required};
use crate::domain::dataset::DatasetIdentity;
use crate::domain::entity::Entity;
use crate::error::OrgScanError;

/// One dataset, every record, no join.
pub struct ListingRecipe {
    alias: &'static str,
}

impl ListingRecipe {
    pub fn new(alias: &'static str) -> Self {
        Self { alias }
    }
}

impl Recipe for ListingRecipe {
    fn alias(&self) -> &'static str {
        self.alias
    }

    fn extract(&self, _parameters: &BTreeMap<String, String>) -> Vec<DatasetIdentity> {
        vec![DatasetIdentity::new(self.alias)]
    }

    fn transform(
        &self,
        data: &DatasetResults,
        _parameters: &BTreeMap<String, String>,
    ) -> Result<Vec<Entity>, OrgScanError> {
        let records = required(data, self.alias)?.entities().cloned().collect();
        Ok(sorted(records))
    }
}
