// orgscan/src/main.rs

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{CacheAction, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Setup Logging (Tracing)
    // RUST_LOG=debug orgscan run users ... to see every platform call
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let project_dir = cli.project_dir;
    tracing::debug!(project_dir = ?project_dir, "orgscan starting");

    match cli.command {
        Commands::Run {
            recipe,
            params,
            json,
        } => commands::run::execute(&project_dir, &recipe, params, json).await,
        Commands::Clean { recipe, params } => commands::clean::execute(&project_dir, &recipe, params),
        Commands::Cache { action } => match action {
            CacheAction::Details => commands::cache::details(&project_dir),
            CacheAction::Clear => commands::cache::clear(&project_dir),
        },
        Commands::Rules { id } => commands::rules::execute(id),
        Commands::Quota => commands::quota::execute(&project_dir).await,
    }
}
