// orgscan-core/src/application/ports/dataset.rs

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::application::api::ApiAccess;
use crate::application::factory::DataFactory;
use crate::domain::dataset::DatasetValue;
use crate::error::OrgScanError;

/// What an extraction unit receives from the orchestrator.
#[derive(Clone)]
pub struct DatasetContext {
    pub api: Arc<ApiAccess>,
    pub factory: Arc<DataFactory>,
    pub parameters: BTreeMap<String, String>,
}

impl DatasetContext {
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }
}

/// An extraction unit: a fixed set of platform calls mapped to records.
#[async_trait]
pub trait Dataset: Send + Sync {
    fn alias(&self) -> &'static str;

    async fn run(&self, ctx: &DatasetContext) -> Result<DatasetValue, OrgScanError>;
}
