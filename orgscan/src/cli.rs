// orgscan/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "orgscan")]
#[command(about = "Extracts, caches and scores org configuration for technical debt and security risks", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Project directory (holds orgscan.yaml and the cache)
    #[arg(long, global = true, default_value = ".")]
    pub project_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🚀 Runs a recipe against the org (served from cache when possible)
    Run {
        /// Recipe alias (ex: "custom-fields")
        recipe: String,

        /// Recipe parameter, repeatable (ex: --param object=Account)
        #[arg(long = "param", short = 'p', value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Print records as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// 🧹 Drops the cached datasets of a recipe
    Clean {
        recipe: String,

        #[arg(long = "param", short = 'p', value_parser = parse_param)]
        params: Vec<(String, String)>,
    },

    /// 📦 Inspects or empties the dataset cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// 📏 Lists the score rules
    Rules {
        /// Show a single rule
        #[arg(long)]
        id: Option<u32>,
    },

    /// 🚦 Reads the current API usage of the org
    Quota,
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Lists cached datasets without reading their payload
    Details,
    /// Removes every cached dataset
    Clear,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{}'", raw)),
    }
}
