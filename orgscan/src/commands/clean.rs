// orgscan/src/commands/clean.rs
//
// USE CASE: Forget the cached datasets of one recipe.

use std::path::Path;

use orgscan_core::OrgScanError;
use orgscan_core::application::builtin_recipes;
use orgscan_core::application::ports::Recipe;

use super::context::{load_config, open_cache, parameters};

pub fn execute(project_dir: &Path, recipe: &str, params: Vec<(String, String)>) -> anyhow::Result<()> {
    let config = load_config(project_dir)?;
    let cache = open_cache(project_dir, &config);

    let recipe = builtin_recipes()
        .into_iter()
        .find(|r| r.alias() == recipe)
        .ok_or_else(|| OrgScanError::UnknownRecipe(recipe.to_string()))?;

    for identity in recipe.extract(&parameters(params)) {
        cache.remove(&identity.cache_key);
        println!("   🗑️  Dataset removed: {}", identity.cache_key);
    }
    Ok(())
}
