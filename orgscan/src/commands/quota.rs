// orgscan/src/commands/quota.rs
//
// USE CASE: Read the daily API usage with one cheap call.

use std::path::Path;

use super::context::{connect, load_config};

pub async fn execute(project_dir: &Path) -> anyhow::Result<()> {
    let config = load_config(project_dir)?;
    let api = connect(&config)?;

    // Any response carries the usage header; the record count endpoint is the lightest.
    api.record_count("User").await?;

    let snapshot = api.watchdog().snapshot();
    println!("🚦 API usage: {:.1}% ({})", snapshot.used_ratio * 100.0, snapshot.zone());
    println!(
        "   Thresholds: warn {:.0}%, critical {:.0}%",
        snapshot.warn_threshold * 100.0,
        snapshot.critical_threshold * 100.0
    );
    if let Some(at) = snapshot.measured_at {
        println!("   Measured at: {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    Ok(())
}
