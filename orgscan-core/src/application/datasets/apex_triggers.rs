// orgscan-core/src/application/datasets/apex_triggers.rs

use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;

use super::{
    EDITABLE_ONLY, alias, count, number, properties, record_url, short_id, text, text_or_empty,
    timestamp,
};
use crate::application::api::SoqlQuery;
use crate::application::ports::{Dataset, DatasetContext};
use crate::domain::dataset::DatasetValue;
use crate::domain::entity::EntityType;
use crate::error::OrgScanError;

pub struct ApexTriggersDataset;

#[async_trait]
impl Dataset for ApexTriggersDataset {
    fn alias(&self) -> &'static str {
        alias::APEX_TRIGGERS
    }

    async fn run(&self, ctx: &DatasetContext) -> Result<DatasetValue, OrgScanError> {
        let query = SoqlQuery::new(format!(
            "SELECT Id, Name, ApiVersion, Status, NamespacePrefix, Body, LengthWithoutComments, \
             EntityDefinition.QualifiedApiName, CreatedDate, LastModifiedDate \
             FROM ApexTrigger WHERE {}",
            EDITABLE_ONLY
        ))
        .tooling()
        .ordinal("Id");
        let rows = ctx.api.soql_query(&[query]).await?.into_iter().flatten().collect::<Vec<_>>();

        let ids: Vec<String> = rows.iter().filter_map(|r| text(r, "Id")).collect();
        let graph = ctx.api.dependencies_for(&ids).await?;

        let scanner = ctx.factory.scanner();
        let mut records = BTreeMap::new();
        for row in &rows {
            let id = short_id(row, "Id");
            let body = scanner.strip_comments(&text_or_empty(row, "Body"));
            let props = properties(json!({
                "id": id,
                "url": record_url(&id),
                "name": text_or_empty(row, "Name"),
                "apiVersion": number(row, "ApiVersion"),
                "package": text_or_empty(row, "NamespacePrefix"),
                "objectName": text_or_empty(row, "EntityDefinition.QualifiedApiName"),
                "isActive": text(row, "Status").as_deref() == Some("Active"),
                "length": count(row, "LengthWithoutComments"),
                "hasSOQL": scanner.has_soql(&body),
                "hasDML": scanner.has_dml(&body),
                "hardCodedUrls": scanner.hard_coded_urls(&body),
                "hardCodedIds": scanner.hard_coded_ids(&body),
                "createdDate": timestamp(row, "CreatedDate"),
                "lastModifiedDate": timestamp(row, "LastModifiedDate"),
            }));
            let entity = ctx
                .factory
                .create_with_score(EntityType::ApexTrigger, props, Some(&graph))?;
            records.insert(id, entity);
        }
        Ok(DatasetValue::Map(records))
    }
}
