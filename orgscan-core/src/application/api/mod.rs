// orgscan-core/src/application/api/mod.rs

// Every platform round-trip goes through `ApiAccess::gate`, which asks the
// watchdog before the call and feeds it the reported usage afterwards.

use futures::future::try_join_all;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, instrument};

use crate::application::watchdog::QuotaWatchdog;
pub use crate::domain::encoding::url_encode;
use crate::domain::error::DomainError;
use crate::error::OrgScanError;
use crate::infrastructure::config::LimitsConfig;
use crate::ports::platform::{
    MetadataListItem, PlatformClient, PlatformError, PlatformResponse, SObjectDescription,
};

pub mod composite;
pub mod dependencies;
pub mod query;

pub use composite::CompositeRead;
pub use query::{Pagination, SoqlQuery};

pub struct ApiAccess {
    client: Arc<dyn PlatformClient>,
    watchdog: Arc<QuotaWatchdog>,
    limits: LimitsConfig,
    api_version: f64,
}

impl ApiAccess {
    pub fn new(
        client: Arc<dyn PlatformClient>,
        watchdog: Arc<QuotaWatchdog>,
        limits: LimitsConfig,
        api_version: f64,
    ) -> Self {
        Self {
            client,
            watchdog,
            limits,
            api_version,
        }
    }

    pub fn watchdog(&self) -> &QuotaWatchdog {
        &self.watchdog
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    pub fn api_version(&self) -> f64 {
        self.api_version
    }

    /// Path prefix used inside composite sub-requests.
    pub(crate) fn services_path(&self, tooling: bool) -> String {
        format!(
            "/services/data/v{:.1}{}",
            self.api_version,
            if tooling { "/tooling" } else { "" }
        )
    }

    /// Outer error: the watchdog refused the call, nothing was sent.
    /// Inner error: the platform answered with a failure.
    pub(crate) async fn gate<T, F, Fut>(
        &self,
        call: F,
    ) -> Result<Result<T, PlatformError>, DomainError>
    where
        F: FnOnce(Arc<dyn PlatformClient>) -> Fut,
        Fut: Future<Output = Result<PlatformResponse<T>, PlatformError>>,
    {
        self.watchdog.before_call()?;
        match call(Arc::clone(&self.client)).await {
            Ok(response) => {
                self.watchdog.after_call(response.usage);
                Ok(Ok(response.body))
            }
            Err(e) => {
                error!(error = %e, "Platform call failed");
                Ok(Err(e))
            }
        }
    }

    /// Like [`gate`](Self::gate), with platform failures wrapped in context.
    pub(crate) async fn call<T, F, Fut>(
        &self,
        when: &str,
        what: &str,
        call: F,
    ) -> Result<T, OrgScanError>
    where
        F: FnOnce(Arc<dyn PlatformClient>) -> Fut,
        Fut: Future<Output = Result<PlatformResponse<T>, PlatformError>>,
    {
        self.gate(call)
            .await?
            .map_err(|e| OrgScanError::platform(when, what, e))
    }

    #[instrument(skip(self))]
    pub async fn describe_global(&self) -> Result<Vec<SObjectDescription>, OrgScanError> {
        self.call("describing the global object list", "sobjects", |client| async move {
            client.describe_global().await
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn record_count(&self, object: &str) -> Result<Option<u64>, OrgScanError> {
        self.call("counting records", object, |client| async move {
            client.record_count(object).await
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn list_metadata(
        &self,
        metadata_type: &str,
    ) -> Result<Vec<MetadataListItem>, OrgScanError> {
        self.call("listing metadata", metadata_type, |client| async move {
            client.list_metadata(metadata_type).await
        })
        .await
    }

    /// Reads metadata members, at most `metadata_members_per_read` per call,
    /// all chunks in parallel.
    #[instrument(skip(self, full_names), fields(members = full_names.len()))]
    pub async fn read_metadata(
        &self,
        metadata_type: &str,
        full_names: &[String],
    ) -> Result<Vec<Value>, OrgScanError> {
        let chunk_size = self.limits.metadata_members_per_read.max(1);
        let reads = full_names.chunks(chunk_size).map(|members| {
            let what = format!("{} ({})", metadata_type, members.join(", "));
            async move {
                self.call("reading metadata", &what, |client| async move {
                    client.read_metadata(metadata_type, members).await
                })
                .await
            }
        });
        let chunks = try_join_all(reads).await?;
        Ok(chunks.into_iter().flatten().collect())
    }
}

/// Quotes a value for a record-query string literal.
pub fn soql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::testing::FakePlatform;
    use super::*;
    use crate::domain::quota::{ApiUsage, QuotaSnapshot};
    use anyhow::Result;
    use chrono::{Duration, Utc};

    fn access(platform: Arc<FakePlatform>, watchdog: QuotaWatchdog) -> ApiAccess {
        ApiAccess::new(platform, Arc::new(watchdog), LimitsConfig::default(), 60.0)
    }

    #[test]
    fn test_soql_literal_escapes_quotes() {
        assert_eq!(soql_literal("O'Brien"), r"'O\'Brien'");
    }

    #[tokio::test]
    async fn test_quota_gate_stops_call_before_network() -> Result<()> {
        let platform = Arc::new(FakePlatform::new());
        let snapshot = QuotaSnapshot {
            used_ratio: 0.95,
            measured_at: Some(Utc::now() - Duration::seconds(10)),
            ..QuotaSnapshot::default()
        };
        let api = access(platform.clone(), QuotaWatchdog::with_snapshot(snapshot, Duration::seconds(60)));

        let err = api.record_count("Account").await.unwrap_err();
        assert!(err.is_quota_exceeded());
        assert_eq!(platform.call_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_usage_flows_into_watchdog() -> Result<()> {
        let platform = Arc::new(FakePlatform::new().with_usage(ApiUsage { used: 950, max: 1000 }));
        let api = access(platform.clone(), QuotaWatchdog::default());

        assert_eq!(api.record_count("Account").await?, Some(42));
        // The crossing call went through, the next one does not.
        assert!(api.record_count("Account").await.unwrap_err().is_quota_exceeded());
        assert_eq!(platform.call_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_read_metadata_chunks_members() -> Result<()> {
        let platform = Arc::new(FakePlatform::new());
        let api = access(platform.clone(), QuotaWatchdog::default());
        let names: Vec<String> = (0..23).map(|i| format!("Policy{}", i)).collect();

        let records = api.read_metadata("ProfilePasswordPolicy", &names).await?;
        assert_eq!(records.len(), 23);
        assert_eq!(platform.call_count(), 3);
        Ok(())
    }
}
