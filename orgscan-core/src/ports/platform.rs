// orgscan-core/src/ports/platform.rs

// Everything the pipeline needs from the remote platform. The access layer is
// the only caller; adapters only translate HTTP into these shapes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::quota::ApiUsage;

/// A raw row as returned by the query endpoint.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPage {
    #[serde(default)]
    pub total_size: u64,
    pub done: bool,
    #[serde(default)]
    pub next_records_url: Option<String>,
    #[serde(default)]
    pub records: Vec<Row>,
}

/// Body of a call plus the usage figure the platform attached to it.
#[derive(Debug, Clone)]
pub struct PlatformResponse<T> {
    pub body: T,
    pub usage: Option<ApiUsage>,
}

impl<T> PlatformResponse<T> {
    pub fn new(body: T, usage: Option<ApiUsage>) -> Self {
        Self { body, usage }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeSubRequest {
    pub method: String,
    pub url: String,
    pub reference_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl CompositeSubRequest {
    pub fn get(url: impl Into<String>, reference_id: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            reference_id: reference_id.into(),
            body: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeSubResponse {
    pub reference_id: String,
    pub http_status_code: u16,
    #[serde(default)]
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformFault {
    pub error_code: String,
    #[serde(default)]
    pub message: String,
}

impl CompositeSubResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.http_status_code)
    }

    /// Error entries of a failed sub-response. The platform sends an array of
    /// `{errorCode, message}`; anything else is reported as-is.
    pub fn faults(&self) -> Vec<PlatformFault> {
        if self.is_success() {
            return vec![];
        }
        match serde_json::from_value::<Vec<PlatformFault>>(self.body.clone()) {
            Ok(faults) if !faults.is_empty() => faults,
            _ => vec![PlatformFault {
                error_code: format!("HTTP_{}", self.http_status_code),
                message: self.body.to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SObjectDescription {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub custom: bool,
    #[serde(default)]
    pub queryable: bool,
    #[serde(default)]
    pub key_prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataListItem {
    pub full_name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub namespace_prefix: Option<String>,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlatformError {
    #[error("{error_code} (HTTP {status}): {message}")]
    Api {
        status: u16,
        error_code: String,
        message: String,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl PlatformError {
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Api { error_code, .. } => Some(error_code),
            _ => None,
        }
    }
}

#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn query(&self, soql: &str, tooling: bool)
    -> Result<PlatformResponse<QueryPage>, PlatformError>;

    /// Follows a `nextRecordsUrl` cursor.
    async fn query_more(
        &self,
        next_records_url: &str,
    ) -> Result<PlatformResponse<QueryPage>, PlatformError>;

    async fn composite(
        &self,
        requests: &[CompositeSubRequest],
        tooling: bool,
    ) -> Result<PlatformResponse<Vec<CompositeSubResponse>>, PlatformError>;

    async fn describe_global(&self)
    -> Result<PlatformResponse<Vec<SObjectDescription>>, PlatformError>;

    async fn record_count(&self, object: &str)
    -> Result<PlatformResponse<Option<u64>>, PlatformError>;

    async fn list_metadata(
        &self,
        metadata_type: &str,
    ) -> Result<PlatformResponse<Vec<MetadataListItem>>, PlatformError>;

    async fn read_metadata(
        &self,
        metadata_type: &str,
        full_names: &[String],
    ) -> Result<PlatformResponse<Vec<Value>>, PlatformError>;
}
