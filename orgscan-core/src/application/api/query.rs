// orgscan-core/src/application/api/query.rs

use futures::future::try_join_all;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{ApiAccess, soql_literal};
use crate::error::OrgScanError;
use crate::ports::platform::{PlatformError, Row};

/// Pagination strategy of one query.
#[derive(Debug, Clone, PartialEq)]
pub enum Pagination {
    /// Follow the platform's `nextRecordsUrl` cursor.
    Cursor,
    /// For objects that reject cursors: re-issue the query with a
    /// `field > last` filter, ordered by `field`, one batch at a time.
    Ordinal {
        field: String,
        /// Row key holding the ordering value (an alias for aggregates).
        value_column: String,
        aggregate: bool,
    },
}

#[derive(Debug, Clone)]
pub struct SoqlQuery {
    pub soql: String,
    pub tooling: bool,
    /// Error codes that turn a failure into an empty result.
    pub by_pass: Vec<String>,
    pub pagination: Pagination,
}

impl SoqlQuery {
    pub fn new(soql: impl Into<String>) -> Self {
        Self {
            soql: soql.into(),
            tooling: false,
            by_pass: vec![],
            pagination: Pagination::Cursor,
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

    pub fn ordinal(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.pagination = Pagination::Ordinal {
            value_column: field.clone(),
            field,
            aggregate: false,
        };
        self
    }

    /// Ordinal pagination over a grouped query, ordered by `MAX(field)`.
    pub fn ordinal_aggregate(mut self, field: impl Into<String>, value_column: impl Into<String>) -> Self {
        self.pagination = Pagination::Ordinal {
            field: field.into(),
            value_column: value_column.into(),
            aggregate: true,
        };
        self
    }

    fn is_by_passed(&self, error: &PlatformError) -> bool {
        error
            .error_code()
            .is_some_and(|code| self.by_pass.iter().any(|b| b == code))
    }
}

// Quota refusals and stalled pagination abort through the outer error; the
// inner one is left for the by-pass check.
macro_rules! platform_try {
    ($call:expr) => {
        match $call {
            Ok(value) => value,
            Err(err) => return Ok(Err(err)),
        }
    };
}

impl ApiAccess {
    /// Runs the queries concurrently. Pages of one query are fetched in
    /// sequence. Results come back in the order of `queries`.
    #[instrument(skip(self, queries), fields(count = queries.len()))]
    pub async fn soql_query(&self, queries: &[SoqlQuery]) -> Result<Vec<Vec<Row>>, OrgScanError> {
        try_join_all(queries.iter().map(|q| self.run_query(q))).await
    }

    async fn run_query(&self, query: &SoqlQuery) -> Result<Vec<Row>, OrgScanError> {
        let outcome = match &query.pagination {
            Pagination::Cursor => self.cursor_pages(query).await?,
            Pagination::Ordinal {
                field,
                value_column,
                aggregate,
            } => {
                self.ordinal_pages(query, field, value_column, *aggregate)
                    .await?
            }
        };
        match outcome {
            Ok(rows) => {
                debug!(rows = rows.len(), soql = %query.soql, "Query complete");
                Ok(rows)
            }
            Err(e) if query.is_by_passed(&e) => {
                warn!(error = %e, soql = %query.soql, "By-passed query error, treating as empty");
                Ok(vec![])
            }
            Err(e) => Err(OrgScanError::platform("running a query", &query.soql, e)),
        }
    }

    async fn cursor_pages(
        &self,
        query: &SoqlQuery,
    ) -> Result<Result<Vec<Row>, PlatformError>, OrgScanError> {
        let mut page = platform_try!(
            self.gate(|client| async move { client.query(&query.soql, query.tooling).await })
                .await?
        );
        let mut rows = std::mem::take(&mut page.records);
        while !page.done {
            let Some(next) = page.next_records_url.take() else {
                break;
            };
            page = platform_try!(
                self.gate(|client| async move { client.query_more(&next).await })
                    .await?
            );
            rows.append(&mut page.records);
        }
        Ok(Ok(rows))
    }

    async fn ordinal_pages(
        &self,
        query: &SoqlQuery,
        field: &str,
        value_column: &str,
        aggregate: bool,
    ) -> Result<Result<Vec<Row>, PlatformError>, OrgScanError> {
        let batch_size = self.limits.ordinal_batch_size.max(1);
        let mut rows = Vec::new();
        let mut last: Option<String> = None;

        loop {
            let soql = ordinal_soql(&query.soql, field, aggregate, last.as_deref(), batch_size);
            let page = platform_try!(
                self.gate(|client| async move { client.query(&soql, query.tooling).await })
                    .await?
            );
            let count = page.records.len();
            if let Some(row) = page.records.last() {
                let next = ordinal_value(row, value_column).ok_or_else(|| {
                    OrgScanError::InternalError(format!(
                        "Ordinal pagination column '{}' missing from rows of: {}",
                        value_column, query.soql
                    ))
                })?;
                if last.as_deref() == Some(next.as_str()) {
                    return Err(OrgScanError::InternalError(format!(
                        "Ordinal pagination did not advance past '{}' for: {}",
                        next, query.soql
                    )));
                }
                last = Some(next);
            }
            rows.extend(page.records);
            if count < batch_size {
                break;
            }
        }
        Ok(Ok(rows))
    }
}

/// Builds one page of an ordinal pagination. Existing WHERE (or HAVING)
/// clauses are extended with AND, so they must be a plain conjunction.
pub fn ordinal_soql(
    base: &str,
    field: &str,
    aggregate: bool,
    last: Option<&str>,
    batch_size: usize,
) -> String {
    let base = base.trim();
    let mut soql = base.to_string();
    if let Some(value) = last {
        let (clause, subject) = if aggregate {
            ("HAVING", format!("MAX({})", field))
        } else {
            ("WHERE", field.to_string())
        };
        let keyword = if has_top_level_keyword(base, clause) { "AND" } else { clause };
        soql.push_str(&format!(" {} {} > {}", keyword, subject, soql_literal(value)));
    }
    let order = if aggregate {
        format!("MAX({})", field)
    } else {
        field.to_string()
    };
    soql.push_str(&format!(" ORDER BY {} LIMIT {}", order, batch_size));
    soql
}

/// Whether `keyword` is a clause of the outer query. Words inside
/// parentheses (sub-queries, IN lists) and string literals do not count.
fn has_top_level_keyword(soql: &str, keyword: &str) -> bool {
    let mut depth = 0usize;
    let mut quoted = false;
    let mut escaped = false;
    let mut word = String::new();
    for c in soql.chars().chain(std::iter::once(' ')) {
        if quoted {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '\'' => quoted = false,
                _ => {}
            }
            continue;
        }
        if c.is_ascii_alphanumeric() || c == '_' {
            word.push(c);
            continue;
        }
        if depth == 0 && word.eq_ignore_ascii_case(keyword) {
            return true;
        }
        word.clear();
        match c {
            '\'' => quoted = true,
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    false
}

fn ordinal_value(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
