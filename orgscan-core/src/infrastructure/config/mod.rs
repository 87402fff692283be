// orgscan-core/src/infrastructure/config/mod.rs

pub mod project;

pub use project::{
    CacheConfig, LimitsConfig, ProjectConfig, WatchdogConfig, load_or_default, load_project_config,
};
