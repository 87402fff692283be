// Scripted in-memory platform and pipeline wiring shared by the integration
// tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use orgscan_core::application::{
    ApiAccess, DataCache, DataFactory, DatasetOrchestrator, QuotaWatchdog, RecipeManager,
    builtin_datasets,
};
use orgscan_core::domain::quota::ApiUsage;
use orgscan_core::domain::scoring::ScoringEngine;
use orgscan_core::infrastructure::config::LimitsConfig;
use orgscan_core::ports::platform::{
    CompositeSubRequest, CompositeSubResponse, MetadataListItem, PlatformClient, PlatformError,
    PlatformResponse, QueryPage, Row, SObjectDescription,
};
use orgscan_core::ports::storage::KeyValueStorage;

type QueryScript = Box<dyn Fn(&str) -> Vec<Value> + Send + Sync>;
type SubRequestScript = Box<dyn Fn(&CompositeSubRequest) -> (u16, Value) + Send + Sync>;

/// Answers queries and composite sub-requests from closures and records
/// every call it receives.
pub struct ScriptedPlatform {
    queries: QueryScript,
    sub_requests: SubRequestScript,
    metadata: Vec<Value>,
    usage: ApiUsage,
    pub calls: AtomicUsize,
    pub log: Mutex<Vec<String>>,
}

impl ScriptedPlatform {
    pub fn new() -> Self {
        Self {
            queries: Box::new(|_| vec![]),
            sub_requests: Box::new(|_| (404, json!([{ "errorCode": "NOT_FOUND", "message": "" }]))),
            metadata: vec![],
            usage: ApiUsage { used: 100, max: 15000 },
            calls: AtomicUsize::new(0),
            log: Mutex::new(vec![]),
        }
    }

    pub fn on_query(mut self, f: impl Fn(&str) -> Vec<Value> + Send + Sync + 'static) -> Self {
        self.queries = Box::new(f);
        self
    }

    pub fn on_sub_request(
        mut self,
        f: impl Fn(&CompositeSubRequest) -> (u16, Value) + Send + Sync + 'static,
    ) -> Self {
        self.sub_requests = Box::new(f);
        self
    }

    pub fn with_metadata(mut self, items: Vec<Value>) -> Self {
        self.metadata = items;
        self
    }

    pub fn with_usage(mut self, used: u64, max: u64) -> Self {
        self.usage = ApiUsage { used, max };
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls whose log line starts with `kind` ("query", "composite", ...).
    pub fn calls_of(&self, kind: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|line| line.starts_with(kind))
            .count()
    }

    fn record<T>(&self, line: String, body: T) -> Result<PlatformResponse<T>, PlatformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(line);
        Ok(PlatformResponse::new(body, Some(self.usage)))
    }
}

pub fn rows(values: Vec<Value>) -> Vec<Row> {
    values
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

#[async_trait]
impl PlatformClient for ScriptedPlatform {
    async fn query(&self, soql: &str, tooling: bool) -> Result<PlatformResponse<QueryPage>, PlatformError> {
        let records = rows((self.queries)(soql));
        let page = QueryPage {
            total_size: records.len() as u64,
            done: true,
            next_records_url: None,
            records,
        };
        self.record(format!("query tooling={} {}", tooling, soql), page)
    }

    async fn query_more(&self, url: &str) -> Result<PlatformResponse<QueryPage>, PlatformError> {
        self.record(
            format!("query_more {}", url),
            QueryPage {
                done: true,
                ..QueryPage::default()
            },
        )
    }

    async fn composite(
        &self,
        requests: &[CompositeSubRequest],
        tooling: bool,
    ) -> Result<PlatformResponse<Vec<CompositeSubResponse>>, PlatformError> {
        let responses = requests
            .iter()
            .map(|r| {
                let (status, body) = (self.sub_requests)(r);
                CompositeSubResponse {
                    reference_id: r.reference_id.clone(),
                    http_status_code: status,
                    body,
                }
            })
            .collect();
        self.record(format!("composite tooling={} n={}", tooling, requests.len()), responses)
    }

    async fn describe_global(&self) -> Result<PlatformResponse<Vec<SObjectDescription>>, PlatformError> {
        self.record("describe_global".to_string(), vec![])
    }

    async fn record_count(&self, object: &str) -> Result<PlatformResponse<Option<u64>>, PlatformError> {
        self.record(format!("record_count {}", object), Some(0))
    }

    async fn list_metadata(
        &self,
        metadata_type: &str,
    ) -> Result<PlatformResponse<Vec<MetadataListItem>>, PlatformError> {
        let items = self
            .metadata
            .iter()
            .filter_map(|m| m.get("fullName").and_then(Value::as_str))
            .map(|name| MetadataListItem {
                full_name: name.to_string(),
                id: None,
                namespace_prefix: None,
            })
            .collect();
        self.record(format!("list_metadata {}", metadata_type), items)
    }

    async fn read_metadata(
        &self,
        metadata_type: &str,
        full_names: &[String],
    ) -> Result<PlatformResponse<Vec<Value>>, PlatformError> {
        let items = self
            .metadata
            .iter()
            .filter(|m| {
                m.get("fullName")
                    .and_then(Value::as_str)
                    .is_some_and(|n| full_names.iter().any(|f| f == n))
            })
            .cloned()
            .collect();
        self.record(format!("read_metadata {} n={}", metadata_type, full_names.len()), items)
    }
}

pub struct Pipeline {
    pub platform: Arc<ScriptedPlatform>,
    pub watchdog: Arc<QuotaWatchdog>,
    pub orchestrator: Arc<DatasetOrchestrator>,
    pub recipes: RecipeManager,
}

impl Pipeline {
    pub fn new(platform: ScriptedPlatform, storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::with_watchdog(platform, storage, QuotaWatchdog::default())
    }

    pub fn with_watchdog(
        platform: ScriptedPlatform,
        storage: Arc<dyn KeyValueStorage>,
        watchdog: QuotaWatchdog,
    ) -> Self {
        let platform = Arc::new(platform);
        let watchdog = Arc::new(watchdog);
        let api = Arc::new(ApiAccess::new(
            platform.clone(),
            watchdog.clone(),
            LimitsConfig::default(),
            60.0,
        ));
        let factory = Arc::new(DataFactory::new(ScoringEngine::default()).unwrap());
        let cache = Arc::new(DataCache::new(storage));
        let orchestrator = Arc::new(
            DatasetOrchestrator::new(api, factory, cache).with_datasets(builtin_datasets()),
        );
        let recipes = RecipeManager::new(orchestrator.clone());
        Self {
            platform,
            watchdog,
            orchestrator,
            recipes,
        }
    }
}
