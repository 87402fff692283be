// orgscan-core/src/infrastructure/config/project.rs

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};
use validator::{Validate, ValidationError};

use crate::domain::quota::{DEFAULT_CRITICAL_THRESHOLD, DEFAULT_WARN_THRESHOLD};
use crate::domain::scoring::CURRENT_API_VERSION;
use crate::infrastructure::error::InfrastructureError;

pub const CONFIG_CANDIDATES: [&str; 2] = ["orgscan.yaml", "orgscan_project_conf.yaml"];

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProjectConfig {
    #[serde(default = "default_name")]
    pub name: String,

    #[validate(custom(function = "validate_instance_url"))]
    #[serde(default)]
    pub instance_url: Option<String>,

    /// Only ever read from the environment.
    #[serde(skip)]
    pub access_token: Option<String>,

    #[validate(range(min = 20.0, max = 99.0))]
    #[serde(default = "default_api_version")]
    pub api_version: f64,

    #[validate(nested)]
    #[serde(default)]
    pub cache: CacheConfig,

    #[validate(nested)]
    #[serde(default)]
    pub watchdog: WatchdogConfig,

    #[validate(nested)]
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            instance_url: None,
            access_token: None,
            api_version: default_api_version(),
            cache: CacheConfig::default(),
            watchdog: WatchdogConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Cache directory, resolved against the project root when relative.
    pub fn cache_dir(&self, project_dir: &Path) -> PathBuf {
        let dir = Path::new(&self.cache.directory);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            project_dir.join(dir)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[validate(length(min = 1, message = "Cache directory cannot be empty"))]
    #[serde(default = "default_cache_directory")]
    pub directory: String,

    #[validate(range(min = 1))]
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: default_cache_directory(),
            ttl_hours: default_ttl_hours(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_thresholds"))]
pub struct WatchdogConfig {
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_warn_threshold")]
    pub warn_threshold: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_critical_threshold")]
    pub critical_threshold: f64,

    #[validate(range(min = 1))]
    #[serde(default = "default_freshness_seconds")]
    pub freshness_seconds: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            warn_threshold: default_warn_threshold(),
            critical_threshold: default_critical_threshold(),
            freshness_seconds: default_freshness_seconds(),
        }
    }
}

/// Per-call size limits imposed by the platform.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LimitsConfig {
    #[validate(range(min = 1, max = 2000))]
    #[serde(default = "default_ordinal_batch_size")]
    pub ordinal_batch_size: usize,

    #[validate(range(min = 1, max = 25))]
    #[serde(default = "default_composite_batch_size")]
    pub composite_batch_size: usize,

    #[validate(range(min = 1))]
    #[serde(default = "default_dependency_ids_per_filter")]
    pub dependency_ids_per_filter: usize,

    #[validate(range(min = 1, max = 10))]
    #[serde(default = "default_metadata_members_per_read")]
    pub metadata_members_per_read: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            ordinal_batch_size: default_ordinal_batch_size(),
            composite_batch_size: default_composite_batch_size(),
            dependency_ids_per_filter: default_dependency_ids_per_filter(),
            metadata_members_per_read: default_metadata_members_per_read(),
        }
    }
}

fn default_name() -> String {
    "orgscan".to_string()
}
fn default_api_version() -> f64 {
    CURRENT_API_VERSION
}
fn default_true() -> bool {
    true
}
fn default_cache_directory() -> String {
    ".orgscan/cache".to_string()
}
fn default_ttl_hours() -> u32 {
    24
}
fn default_warn_threshold() -> f64 {
    DEFAULT_WARN_THRESHOLD
}
fn default_critical_threshold() -> f64 {
    DEFAULT_CRITICAL_THRESHOLD
}
fn default_freshness_seconds() -> u64 {
    60
}
fn default_ordinal_batch_size() -> usize {
    200
}
fn default_composite_batch_size() -> usize {
    25
}
fn default_dependency_ids_per_filter() -> usize {
    50
}
fn default_metadata_members_per_read() -> usize {
    10
}

fn validate_instance_url(url: &str) -> Result<(), ValidationError> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(ValidationError::new("instance_url_scheme"))
    }
}

fn validate_thresholds(watchdog: &WatchdogConfig) -> Result<(), ValidationError> {
    if watchdog.warn_threshold < watchdog.critical_threshold {
        Ok(())
    } else {
        Err(ValidationError::new("warn_threshold_not_below_critical"))
    }
}

// --- LOADER ---

#[instrument(skip(project_dir))]
pub fn load_project_config(project_dir: &Path) -> Result<ProjectConfig, InfrastructureError> {
    let config_path = find_main_config(project_dir)?;
    info!(path = ?config_path, "Loading project configuration");

    let content = fs::read_to_string(&config_path)?;
    let mut config: ProjectConfig = serde_yaml::from_str(&content)?;

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate(&config)?;
    Ok(config)
}

/// Same as [`load_project_config`], but a missing file yields the defaults
/// (still layered with the environment).
pub fn load_or_default(project_dir: &Path) -> Result<ProjectConfig, InfrastructureError> {
    match load_project_config(project_dir) {
        Err(InfrastructureError::ConfigNotFound(_)) => {
            info!("No project configuration found, using defaults");
            let mut config = ProjectConfig::default();
            apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
            validate(&config)?;
            Ok(config)
        }
        other => other,
    }
}

fn find_main_config(root: &Path) -> Result<PathBuf, InfrastructureError> {
    for filename in CONFIG_CANDIDATES {
        let p = root.join(filename);
        if p.exists() {
            return Ok(p);
        }
    }
    Err(InfrastructureError::ConfigNotFound(format!(
        "No configuration file found in {:?}. Checked: {:?}",
        root, CONFIG_CANDIDATES
    )))
}

fn validate(config: &ProjectConfig) -> Result<(), InfrastructureError> {
    config
        .validate()
        .map_err(|e| InfrastructureError::ConfigError(e.to_string()))
}

// Layering: ORGSCAN_CACHE_DIR=/tmp/cache orgscan run users
pub(crate) fn apply_env_overrides<F>(
    config: &mut ProjectConfig,
    lookup: F,
) -> Result<(), InfrastructureError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("ORGSCAN_INSTANCE_URL") {
        info!(old = ?config.instance_url, new = %val, "Overriding instance url via ENV");
        config.instance_url = Some(val);
    }
    if let Some(val) = lookup("ORGSCAN_ACCESS_TOKEN") {
        config.access_token = Some(val);
    }
    if let Some(val) = lookup("ORGSCAN_CACHE_DIR") {
        info!(old = %config.cache.directory, new = %val, "Overriding cache directory via ENV");
        config.cache.directory = val;
    }
    if let Some(val) = lookup("ORGSCAN_API_VERSION") {
        config.api_version = val.parse().map_err(|_| {
            InfrastructureError::ConfigError(format!("ORGSCAN_API_VERSION is not a number: '{}'", val))
        })?;
    }
    Ok(())
}
