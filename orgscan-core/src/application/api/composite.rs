// orgscan-core/src/application/api/composite.rs

use futures::future::try_join_all;
use serde_json::Value;
use tracing::{instrument, warn};

use super::ApiAccess;
use crate::error::OrgScanError;
use crate::ports::platform::{CompositeSubRequest, CompositeSubResponse, PlatformError};

/// A bulk point-read: one GET per record, bundled into composite calls of at
/// most `composite_batch_size` sub-requests.
#[derive(Debug, Clone)]
pub struct CompositeRead {
    /// Short label used in error context.
    pub what: String,
    pub tooling: bool,
    /// Error codes that turn a failed sub-request into a missing result.
    pub by_pass: Vec<String>,
    pub requests: Vec<CompositeSubRequest>,
}

impl CompositeRead {
    /// One sub-request per id; the id doubles as the reference id.
    pub fn by_ids(what: impl Into<String>, ids: &[String], url_for: impl Fn(&str) -> String) -> Self {
        Self {
            what: what.into(),
            tooling: false,
            by_pass: vec![],
            requests: ids
                .iter()
                .map(|id| CompositeSubRequest::get(url_for(id), id.clone()))
                .collect(),
        }
    }

    pub fn tooling(mut self) -> Self {
        self.tooling = true;
        self
    }

    pub fn by_passing(mut self, codes: &[&str]) -> Self {
        self.by_pass = codes.iter().map(|c| c.to_string()).collect();
        self
    }

    fn tolerates(&self, code: &str) -> bool {
        self.by_pass.iter().any(|b| b == code)
    }
}

impl ApiAccess {
    /// Returns `(reference id, body)` for every successful sub-request, in
    /// request order. Tolerated failures are dropped; any other failure aborts
    /// the whole read.
    #[instrument(skip(self, read), fields(what = %read.what, requests = read.requests.len()))]
    pub async fn composite_read(
        &self,
        read: &CompositeRead,
    ) -> Result<Vec<(String, Value)>, OrgScanError> {
        let batch_size = self.limits.composite_batch_size.max(1);
        let calls = read
            .requests
            .chunks(batch_size)
            .map(|batch| self.composite_batch(read, batch));
        let batches = try_join_all(calls).await?;
        Ok(batches.into_iter().flatten().collect())
    }

    async fn composite_batch(
        &self,
        read: &CompositeRead,
        batch: &[CompositeSubRequest],
    ) -> Result<Vec<(String, Value)>, OrgScanError> {
        let responses = match self
            .gate(|client| async move { client.composite(batch, read.tooling).await })
            .await?
        {
            Ok(responses) => responses,
            Err(e) if e.error_code().is_some_and(|c| read.tolerates(c)) => {
                warn!(error = %e, what = %read.what, "Tolerated composite failure, batch skipped");
                return Ok(vec![]);
            }
            Err(e) => {
                let payload = batch
                    .iter()
                    .map(|r| r.reference_id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(OrgScanError::platform(
                    "reading records in a composite batch",
                    format!("{} [{}]", read.what, payload),
                    e,
                ));
            }
        };

        let mut results = Vec::with_capacity(responses.len());
        for response in responses {
            if response.is_success() {
                results.push((response.reference_id, response.body));
                continue;
            }
            check_tolerated(read, &response)?;
        }
        Ok(results)
    }
}

fn check_tolerated(read: &CompositeRead, response: &CompositeSubResponse) -> Result<(), OrgScanError> {
    for fault in response.faults() {
        if read.tolerates(&fault.error_code) {
            warn!(
                reference = %response.reference_id,
                code = %fault.error_code,
                "Tolerated sub-request failure, no result"
            );
            continue;
        }
        return Err(OrgScanError::platform(
            "reading a record in a composite batch",
            format!("{} [{}]", read.what, response.reference_id),
            PlatformError::Api {
                status: response.http_status_code,
                error_code: fault.error_code,
                message: fault.message,
            },
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::application::api::testing::FakePlatform;
    use crate::application::watchdog::QuotaWatchdog;
    use crate::infrastructure::config::LimitsConfig;
    use anyhow::Result;
    use serde_json::json;
    use std::sync::Arc;

    fn access(platform: Arc<FakePlatform>) -> ApiAccess {
        ApiAccess::new(platform, Arc::new(QuotaWatchdog::default()), LimitsConfig::default(), 60.0)
    }

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("00N{:012}", i)).collect()
    }

    fn answering(missing: &'static str, code: &'static str) -> FakePlatform {
        FakePlatform::new().on_composite(move |requests| {
            Ok(requests
                .iter()
                .map(|r| {
                    if r.reference_id == missing {
                        CompositeSubResponse {
                            reference_id: r.reference_id.clone(),
                            http_status_code: 404,
                            body: json!([{ "errorCode": code, "message": "gone" }]),
                        }
                    } else {
                        CompositeSubResponse {
                            reference_id: r.reference_id.clone(),
                            http_status_code: 200,
                            body: json!({ "Id": r.reference_id }),
                        }
                    }
                })
                .collect())
        })
    }

    #[tokio::test]
    async fn test_requests_are_chunked() -> Result<()> {
        let platform = Arc::new(answering("none", "NOT_FOUND"));
        let api = access(platform.clone());
        let read = CompositeRead::by_ids("fields", &ids(60), |id| format!("/sobjects/X/{}", id));

        let results = api.composite_read(&read).await?;
        assert_eq!(results.len(), 60);
        assert_eq!(results[59].0, "00N000000000059");
        let sizes: Vec<usize> = platform.composites.lock().unwrap().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![25, 25, 10]);
        Ok(())
    }

    #[tokio::test]
    async fn test_tolerated_codes_drop_items() -> Result<()> {
        let platform = Arc::new(answering("00N000000000001", "NOT_FOUND"));
        let api = access(platform);
        let read = CompositeRead::by_ids("fields", &ids(3), |id| format!("/sobjects/X/{}", id))
            .by_passing(&["NOT_FOUND"]);

        let results = api.composite_read(&read).await?;
        assert_eq!(results.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_other_codes_abort_with_context() -> Result<()> {
        let platform = Arc::new(answering("00N000000000001", "INSUFFICIENT_ACCESS"));
        let api = access(platform);
        let read = CompositeRead::by_ids("fields", &ids(3), |id| format!("/sobjects/X/{}", id))
            .by_passing(&["NOT_FOUND"]);

        match api.composite_read(&read).await.unwrap_err() {
            OrgScanError::Platform { what, source, .. } => {
                assert_eq!(what, "fields [00N000000000001]");
                assert_eq!(source.error_code(), Some("INSUFFICIENT_ACCESS"));
            }
            other => panic!("unexpected error: {other}"),
        }
        Ok(())
    }
}
