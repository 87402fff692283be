// orgscan-core/src/infrastructure/adapters/rest.rs

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use crate::domain::quota::ApiUsage;
use crate::infrastructure::adapters::metadata_soap;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::platform::{
    CompositeSubRequest, CompositeSubResponse, MetadataListItem, PlatformClient, PlatformError,
    PlatformFault, PlatformResponse, QueryPage, SObjectDescription,
};

pub const LIMIT_INFO_HEADER: &str = "sforce-limit-info";

/// Talks to the platform's REST endpoints (and the SOAP metadata endpoint)
/// with a bearer token obtained elsewhere.
pub struct RestPlatformClient {
    http: Client,
    instance_url: String,
    access_token: String,
    api_version: f64,
}

impl RestPlatformClient {
    pub fn new(
        instance_url: &str,
        access_token: &str,
        api_version: f64,
    ) -> Result<Self, InfrastructureError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", access_token))
            .map_err(|e| InfrastructureError::ConfigError(format!("Invalid access token: {}", e)))?;
        headers.insert(AUTHORIZATION, bearer);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            http,
            instance_url: instance_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            api_version,
        })
    }

    fn rest_base(&self, tooling: bool) -> String {
        format!(
            "{}/services/data/v{:.1}{}",
            self.instance_url,
            self.api_version,
            if tooling { "/tooling" } else { "" }
        )
    }

    fn soap_url(&self) -> String {
        format!("{}/services/Soap/m/{:.1}", self.instance_url, self.api_version)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<PlatformResponse<T>, PlatformError> {
        debug!(url, "GET");
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(transport)?;
        decode_json(response).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &Value,
    ) -> Result<PlatformResponse<T>, PlatformError> {
        debug!(url, "POST");
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        decode_json(response).await
    }

    async fn soap_call(&self, action: &str, envelope: String) -> Result<PlatformResponse<String>, PlatformError> {
        debug!(action, "SOAP");
        let response = self
            .http
            .post(self.soap_url())
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", action)
            .body(envelope)
            .send()
            .await
            .map_err(transport)?;
        let usage = usage_from_headers(response.headers());
        let status = response.status().as_u16();
        let text = response.text().await.map_err(transport)?;
        if let Some((error_code, message)) = metadata_soap::parse_fault(&text).map_err(PlatformError::Decode)? {
            return Err(PlatformError::Api {
                status,
                error_code,
                message,
            });
        }
        if !(200..300).contains(&status) {
            return Err(PlatformError::Api {
                status,
                error_code: format!("HTTP_{}", status),
                message: text,
            });
        }
        Ok(PlatformResponse::new(text, usage))
    }
}

#[derive(Deserialize)]
struct DescribeGlobalBody {
    sobjects: Vec<SObjectDescription>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompositeBody {
    composite_response: Vec<CompositeSubResponse>,
}

#[derive(Deserialize)]
struct RecordCountBody {
    #[serde(rename = "sObjects", default)]
    s_objects: Vec<RecordCount>,
}

#[derive(Deserialize)]
struct RecordCount {
    name: String,
    count: u64,
}

#[async_trait]
impl PlatformClient for RestPlatformClient {
    async fn query(
        &self,
        soql: &str,
        tooling: bool,
    ) -> Result<PlatformResponse<QueryPage>, PlatformError> {
        let url = format!("{}/query", self.rest_base(tooling));
        self.get_json(&url, &[("q", soql)]).await
    }

    async fn query_more(
        &self,
        next_records_url: &str,
    ) -> Result<PlatformResponse<QueryPage>, PlatformError> {
        let url = format!("{}{}", self.instance_url, next_records_url);
        self.get_json(&url, &[]).await
    }

    async fn composite(
        &self,
        requests: &[CompositeSubRequest],
        tooling: bool,
    ) -> Result<PlatformResponse<Vec<CompositeSubResponse>>, PlatformError> {
        let url = format!("{}/composite", self.rest_base(tooling));
        let body = json!({ "allOrNone": false, "compositeRequest": requests });
        let response: PlatformResponse<CompositeBody> = self.post_json(&url, &body).await?;
        Ok(PlatformResponse::new(
            response.body.composite_response,
            response.usage,
        ))
    }

    async fn describe_global(
        &self,
    ) -> Result<PlatformResponse<Vec<SObjectDescription>>, PlatformError> {
        let url = format!("{}/sobjects", self.rest_base(false));
        let response: PlatformResponse<DescribeGlobalBody> = self.get_json(&url, &[]).await?;
        Ok(PlatformResponse::new(response.body.sobjects, response.usage))
    }

    async fn record_count(
        &self,
        object: &str,
    ) -> Result<PlatformResponse<Option<u64>>, PlatformError> {
        let url = format!("{}/limits/recordCount", self.rest_base(false));
        let response: PlatformResponse<RecordCountBody> =
            self.get_json(&url, &[("sObjects", object)]).await?;
        let count = response
            .body
            .s_objects
            .into_iter()
            .find(|c| c.name == object)
            .map(|c| c.count);
        Ok(PlatformResponse::new(count, response.usage))
    }

    async fn list_metadata(
        &self,
        metadata_type: &str,
    ) -> Result<PlatformResponse<Vec<MetadataListItem>>, PlatformError> {
        let envelope = metadata_soap::list_envelope(&self.access_token, metadata_type, self.api_version);
        let response = self.soap_call("listMetadata", envelope).await?;
        let items = metadata_soap::parse_list_result(&response.body).map_err(PlatformError::Decode)?;
        Ok(PlatformResponse::new(items, response.usage))
    }

    async fn read_metadata(
        &self,
        metadata_type: &str,
        full_names: &[String],
    ) -> Result<PlatformResponse<Vec<Value>>, PlatformError> {
        let envelope = metadata_soap::read_envelope(&self.access_token, metadata_type, full_names);
        let response = self.soap_call("readMetadata", envelope).await?;
        let records = metadata_soap::parse_read_result(&response.body).map_err(PlatformError::Decode)?;
        Ok(PlatformResponse::new(records, response.usage))
    }
}

fn transport(err: reqwest::Error) -> PlatformError {
    PlatformError::Transport(err.to_string())
}

async fn decode_json<T: DeserializeOwned>(
    response: Response,
) -> Result<PlatformResponse<T>, PlatformError> {
    let usage = usage_from_headers(response.headers());
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.map_err(transport)?;
        return Err(api_error(status.as_u16(), &text));
    }
    let body = response
        .json::<T>()
        .await
        .map_err(|e| PlatformError::Decode(e.to_string()))?;
    Ok(PlatformResponse::new(body, usage))
}

fn api_error(status: u16, text: &str) -> PlatformError {
    match serde_json::from_str::<Vec<PlatformFault>>(text) {
        Ok(faults) if !faults.is_empty() => PlatformError::Api {
            status,
            error_code: faults[0].error_code.clone(),
            message: faults[0].message.clone(),
        },
        _ => PlatformError::Api {
            status,
            error_code: format!("HTTP_{}", status),
            message: text.to_string(),
        },
    }
}

fn usage_from_headers(headers: &HeaderMap) -> Option<ApiUsage> {
    headers
        .get(LIMIT_INFO_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_limit_info)
}

/// Parses `api-usage=18/5000` (possibly among other comma-separated entries).
pub fn parse_limit_info(header: &str) -> Option<ApiUsage> {
    header.split(',').find_map(|entry| {
        let (name, value) = entry.trim().split_once('=')?;
        if name.trim() != "api-usage" {
            return None;
        }
        let (used, max) = value.trim().split_once('/')?;
        Some(ApiUsage {
            used: used.trim().parse().ok()?,
            max: max.trim().parse().ok()?,
        })
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_limit_info() {
        assert_eq!(
            parse_limit_info("api-usage=18/5000"),
            Some(ApiUsage { used: 18, max: 5000 })
        );
        assert_eq!(
            parse_limit_info("per-app-api-usage=1/10(appName=x), api-usage=950/1000"),
            Some(ApiUsage { used: 950, max: 1000 })
        );
        assert_eq!(parse_limit_info("api-usage=abc"), None);
        assert_eq!(parse_limit_info(""), None);
    }

    #[test]
    fn test_api_error_uses_first_fault() {
        let err = api_error(400, r#"[{"errorCode":"MALFORMED_QUERY","message":"unexpected token"}]"#);
        assert_eq!(err.error_code(), Some("MALFORMED_QUERY"));

        let err = api_error(503, "Service Unavailable");
        assert_eq!(err.error_code(), Some("HTTP_503"));
    }

    #[test]
    fn test_endpoint_bases() -> anyhow::Result<()> {
        let client = RestPlatformClient::new("https://acme.my.salesforce.com/", "tok", 60.0)?;
        assert_eq!(
            client.rest_base(true),
            "https://acme.my.salesforce.com/services/data/v60.0/tooling"
        );
        assert_eq!(
            client.soap_url(),
            "https://acme.my.salesforce.com/services/Soap/m/60.0"
        );
        Ok(())
    }
}
