// orgscan-core/src/application/recipes/mod.rs

// A recipe names the datasets a use-case needs and shapes the orchestrator's
// results for display. Recipes never talk to the platform themselves.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::application::datasets::alias;
use crate::application::orchestrator::DatasetOrchestrator;
use crate::application::ports::Recipe;
use crate::domain::entity::Entity;
use crate::error::OrgScanError;

pub mod custom_fields;
pub mod listing;
pub mod users;

pub use custom_fields::CustomFieldsRecipe;
pub use listing::ListingRecipe;
pub use users::UsersRecipe;

pub fn builtin_recipes() -> Vec<Arc<dyn Recipe>> {
    vec![
        Arc::new(CustomFieldsRecipe),
        Arc::new(UsersRecipe),
        Arc::new(ListingRecipe::new(alias::APEX_CLASSES)),
        Arc::new(ListingRecipe::new(alias::APEX_TRIGGERS)),
        Arc::new(ListingRecipe::new(alias::PERMISSION_SETS)),
        Arc::new(ListingRecipe::new(alias::PROFILE_PASSWORD_POLICIES)),
    ]
}

pub struct RecipeManager {
    orchestrator: Arc<DatasetOrchestrator>,
    recipes: HashMap<&'static str, Arc<dyn Recipe>>,
}

impl RecipeManager {
    pub fn new(orchestrator: Arc<DatasetOrchestrator>) -> Self {
        Self::with_recipes(orchestrator, builtin_recipes())
    }

    pub fn with_recipes(orchestrator: Arc<DatasetOrchestrator>, recipes: Vec<Arc<dyn Recipe>>) -> Self {
        Self {
            orchestrator,
            recipes: recipes.into_iter().map(|r| (r.alias(), r)).collect(),
        }
    }

    pub fn orchestrator(&self) -> &DatasetOrchestrator {
        &self.orchestrator
    }

    pub fn aliases(&self) -> Vec<&'static str> {
        let mut aliases: Vec<_> = self.recipes.keys().copied().collect();
        aliases.sort_unstable();
        aliases
    }

    fn recipe(&self, alias: &str) -> Result<&Arc<dyn Recipe>, OrgScanError> {
        self.recipes
            .get(alias)
            .ok_or_else(|| OrgScanError::UnknownRecipe(alias.to_string()))
    }

    #[instrument(skip(self, parameters))]
    pub async fn run(
        &self,
        alias: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<Vec<Entity>, OrgScanError> {
        let recipe = self.recipe(alias)?;
        let datasets = recipe.extract(parameters);
        let data = self.orchestrator.run(&datasets).await?;
        let records = recipe.transform(&data, parameters)?;
        info!(recipe = alias, records = records.len(), "Recipe complete");
        Ok(records)
    }

    /// Drops the cached datasets of a recipe so the next run re-extracts them.
    pub fn clean(&self, alias: &str, parameters: &BTreeMap<String, String>) -> Result<(), OrgScanError> {
        let recipe = self.recipe(alias)?;
        self.orchestrator.clean(&recipe.extract(parameters));
        Ok(())
    }
}

/// Records sorted by name, then id, for stable output.
pub(crate) fn sorted(mut records: Vec<Entity>) -> Vec<Entity> {
    records.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.id().cmp(b.id())));
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::datasets::builtin_datasets;
    use std::collections::BTreeSet;

    #[test]
    fn test_every_builtin_dataset_is_reachable_from_a_recipe() {
        let no_parameters = BTreeMap::new();
        let requested: BTreeSet<String> = builtin_recipes()
            .iter()
            .flat_map(|recipe| recipe.extract(&no_parameters))
            .map(|identity| identity.alias)
            .collect();
        let registered: BTreeSet<String> = builtin_datasets()
            .iter()
            .map(|dataset| dataset.alias().to_string())
            .collect();
        assert_eq!(requested, registered);
    }

    #[test]
    fn test_recipe_aliases_are_unique() {
        let recipes = builtin_recipes();
        let aliases: BTreeSet<&str> = recipes.iter().map(|recipe| recipe.alias()).collect();
        assert_eq!(aliases.len(), recipes.len());
        assert!(aliases.contains(alias::APEX_TRIGGERS));
    }
}
