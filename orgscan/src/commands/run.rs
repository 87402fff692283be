// orgscan/src/commands/run.rs
//
// USE CASE: Run a recipe and print its scored records.

use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use std::path::Path;
use std::sync::Arc;

use orgscan_core::application::{
    DataFactory, DatasetOrchestrator, RecipeManager, builtin_datasets,
};
use orgscan_core::domain::entity::Entity;
use orgscan_core::domain::scoring::ScoringEngine;

use super::context::{connect, load_config, open_cache, parameters};

pub async fn execute(
    project_dir: &Path,
    recipe: &str,
    params: Vec<(String, String)>,
    json: bool,
) -> anyhow::Result<()> {
    let start = std::time::Instant::now();

    let config = load_config(project_dir)?;
    let api = connect(&config)?;
    let cache = Arc::new(open_cache(project_dir, &config));
    let factory = Arc::new(DataFactory::new(ScoringEngine::default())?);
    let orchestrator = DatasetOrchestrator::new(Arc::clone(&api), factory, cache)
        .with_datasets(builtin_datasets());
    let manager = RecipeManager::new(Arc::new(orchestrator));

    let records = manager.run(recipe, &parameters(params)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        println!("{}", render(&records));
        let snapshot = api.watchdog().snapshot();
        println!(
            "✨ {} records in {:.2?} (API usage {:.0}%, {})",
            records.len(),
            start.elapsed(),
            snapshot.used_ratio * 100.0,
            snapshot.zone()
        );
    }
    Ok(())
}

fn render(records: &[Entity]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Type", "Id", "Name", "Score", "Bad fields"]);
    for record in records {
        table.add_row(vec![
            record.entity_type().to_string(),
            record.id().to_string(),
            record.name().to_string(),
            record.score().to_string(),
            record.bad_fields().join(", "),
        ]);
    }
    table
}
