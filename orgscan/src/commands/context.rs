// orgscan/src/commands/context.rs
//
// Wiring shared by the commands: config, cache and platform access.

use anyhow::{Context, bail};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use orgscan_core::application::{ApiAccess, DataCache, QuotaWatchdog};
use orgscan_core::infrastructure::config::ProjectConfig;
use orgscan_core::infrastructure::config::project::load_or_default;
use orgscan_core::infrastructure::{FileStorage, NullStorage, RestPlatformClient};
use orgscan_core::ports::KeyValueStorage;

pub fn load_config(project_dir: &Path) -> anyhow::Result<ProjectConfig> {
    load_or_default(project_dir).with_context(|| {
        format!(
            "Failed to load project configuration from {:?}",
            project_dir
        )
    })
}

pub fn open_cache(project_dir: &Path, config: &ProjectConfig) -> DataCache {
    let storage: Arc<dyn KeyValueStorage> = if config.cache.enabled {
        Arc::new(FileStorage::new(config.cache_dir(project_dir)))
    } else {
        Arc::new(NullStorage)
    };
    DataCache::new(storage).with_ttl(chrono::Duration::hours(i64::from(config.cache.ttl_hours)))
}

/// Platform access for commands that really call the org.
pub fn connect(config: &ProjectConfig) -> anyhow::Result<Arc<ApiAccess>> {
    let (Some(instance_url), Some(token)) = (&config.instance_url, &config.access_token) else {
        bail!(
            "❌ No org connection configured.\n👉 Set instance_url in orgscan.yaml (or ORGSCAN_INSTANCE_URL) and ORGSCAN_ACCESS_TOKEN."
        );
    };
    let client = RestPlatformClient::new(instance_url, token, config.api_version)?;
    Ok(Arc::new(ApiAccess::new(
        Arc::new(client),
        Arc::new(QuotaWatchdog::from_config(&config.watchdog)),
        config.limits.clone(),
        config.api_version,
    )))
}

pub fn parameters(params: Vec<(String, String)>) -> BTreeMap<String, String> {
    params.into_iter().collect()
}
