// orgscan/src/commands/cache.rs
//
// USE CASE: Inspect or empty the dataset cache.

use comfy_table::{Table, presets::UTF8_FULL};
use std::path::Path;

use super::context::{load_config, open_cache};

pub fn details(project_dir: &Path) -> anyhow::Result<()> {
    let config = load_config(project_dir)?;
    let items = open_cache(project_dir, &config).details();

    if items.is_empty() {
        println!("📦 Cache is empty.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Dataset", "Kind", "Records", "Created"]);
    for item in &items {
        table.add_row(vec![
            item.name.clone(),
            if item.is_map { "map" } else { "list" }.to_string(),
            item.length.to_string(),
            item.created.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn clear(project_dir: &Path) -> anyhow::Result<()> {
    let config = load_config(project_dir)?;
    open_cache(project_dir, &config).clear();
    println!("🧹 Cache cleared.");
    Ok(())
}
