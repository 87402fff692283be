// orgscan-core/src/application/api/dependencies.rs

use futures::future::join_all;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, instrument, warn};

use super::{ApiAccess, soql_literal, url_encode};
use crate::domain::dependency::{DependencyEdge, DependencyGraph};
use crate::domain::ids::id15;
use crate::error::OrgScanError;
use crate::ports::platform::{CompositeSubRequest, QueryPage, Row};

const DEPENDENCY_FIELDS: &str = "MetadataComponentId, MetadataComponentName, MetadataComponentType, \
     RefMetadataComponentId, RefMetadataComponentName, RefMetadataComponentType";

impl ApiAccess {
    /// Fetches every dependency edge touching `ids`, in either direction.
    ///
    /// Ids are split into filters of `dependency_ids_per_filter`, filters into
    /// composite calls of `composite_batch_size`, and the calls run in
    /// parallel. A platform failure does not abort: the graph is flagged
    /// `had_error` so that nothing gets reported as unused on partial data.
    #[instrument(skip(self, ids), fields(ids = ids.len()))]
    pub async fn dependencies_for(&self, ids: &[String]) -> Result<DependencyGraph, OrgScanError> {
        if ids.is_empty() {
            return Ok(DependencyGraph::new(vec![], false));
        }

        let per_filter = self.limits.dependency_ids_per_filter.max(1);
        let sub_requests: Vec<CompositeSubRequest> = ids
            .chunks(per_filter)
            .enumerate()
            .map(|(i, chunk)| {
                let list = chunk
                    .iter()
                    .map(|id| soql_literal(id))
                    .collect::<Vec<_>>()
                    .join(",");
                let soql = format!(
                    "SELECT {} FROM MetadataComponentDependency \
                     WHERE (RefMetadataComponentId IN ({list}) OR MetadataComponentId IN ({list}))",
                    DEPENDENCY_FIELDS
                );
                CompositeSubRequest::get(
                    format!("{}/query?q={}", self.services_path(true), url_encode(&soql)),
                    format!("dependencies{}", i),
                )
            })
            .collect();

        let per_call = self.limits.composite_batch_size.max(1);
        let calls = sub_requests.chunks(per_call).map(|batch| async move {
            self.gate(|client| async move { client.composite(batch, true).await })
                .await
        });
        let outcomes = join_all(calls).await;

        let mut had_error = false;
        let mut pages = Vec::new();
        for outcome in outcomes {
            match outcome? {
                Ok(responses) => {
                    for response in responses {
                        if !response.is_success() {
                            warn!(reference = %response.reference_id, faults = ?response.faults(), "Dependency sub-request failed");
                            had_error = true;
                            continue;
                        }
                        match serde_json::from_value::<QueryPage>(response.body) {
                            Ok(page) => pages.push(page),
                            Err(e) => {
                                warn!(error = %e, "Unreadable dependency page");
                                had_error = true;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Dependency batch failed");
                    had_error = true;
                }
            }
        }

        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut edges = Vec::new();
        for mut page in pages {
            let mut rows = std::mem::take(&mut page.records);
            while let Some(next) = page.next_records_url.take().filter(|_| !page.done) {
                match self
                    .gate(|client| async move { client.query_more(&next).await })
                    .await?
                {
                    Ok(more) => {
                        page = more;
                        rows.append(&mut page.records);
                    }
                    Err(e) => {
                        warn!(error = %e, "Dependency page continuation failed");
                        had_error = true;
                        break;
                    }
                }
            }
            for row in rows {
                let Some(edge) = edge_from_row(&row) else {
                    continue;
                };
                if seen.insert((id15(&edge.id).to_string(), id15(&edge.ref_id).to_string())) {
                    edges.push(edge);
                }
            }
        }

        debug!(edges = edges.len(), had_error, "Dependency graph built");
        Ok(DependencyGraph::new(edges, had_error))
    }
}

fn edge_from_row(row: &Row) -> Option<DependencyEdge> {
    let text = |key: &str| match row.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    };
    Some(DependencyEdge {
        id: text("MetadataComponentId")?,
        name: text("MetadataComponentName").unwrap_or_default(),
        kind: text("MetadataComponentType").unwrap_or_default(),
        ref_id: text("RefMetadataComponentId")?,
        ref_name: text("RefMetadataComponentName").unwrap_or_default(),
        ref_type: text("RefMetadataComponentType").unwrap_or_default(),
    })
}
