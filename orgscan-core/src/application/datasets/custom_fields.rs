// orgscan-core/src/application/datasets/custom_fields.rs

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::{EDITABLE_ONLY, alias, properties, record_url, short_id, text, text_or_empty, timestamp};
use crate::application::api::{CompositeRead, SoqlQuery, soql_literal};
use crate::application::ports::{Dataset, DatasetContext};
use crate::domain::dataset::DatasetValue;
use crate::domain::entity::EntityType;
use crate::domain::ids::id15_owned;
use crate::error::OrgScanError;

/// Custom fields, optionally restricted to one object (`object` parameter).
///
/// One tooling query for the list, one dependency lookup for all ids and one
/// composite read for the field metadata (label, type, formula...). Result is
/// keyed by 15-character id.
pub struct CustomFieldsDataset;

#[async_trait]
impl Dataset for CustomFieldsDataset {
    fn alias(&self) -> &'static str {
        alias::CUSTOM_FIELDS
    }

    async fn run(&self, ctx: &DatasetContext) -> Result<DatasetValue, OrgScanError> {
        let mut soql = format!(
            "SELECT Id, EntityDefinitionId, EntityDefinition.QualifiedApiName, DeveloperName, \
             NamespacePrefix, Description, CreatedDate, LastModifiedDate \
             FROM CustomField WHERE {}",
            EDITABLE_ONLY
        );
        if let Some(object) = ctx.parameter("object") {
            soql.push_str(&format!(
                " AND EntityDefinition.QualifiedApiName = {}",
                soql_literal(object)
            ));
        }

        let rows = ctx
            .api
            .soql_query(&[SoqlQuery::new(soql).tooling()])
            .await?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
        let ids: Vec<String> = rows.iter().filter_map(|r| text(r, "Id")).collect();
        debug!(fields = ids.len(), "Custom fields listed");

        let services = ctx.api.services_path(true);
        let read = CompositeRead::by_ids("CustomField metadata", &ids, |id| {
            format!("{}/sobjects/CustomField/{}", services, id)
        })
        .tooling()
        .by_passing(&["NOT_FOUND", "ENTITY_IS_DELETED"]);

        let (graph, details) = futures::try_join!(
            ctx.api.dependencies_for(&ids),
            ctx.api.composite_read(&read)
        )?;
        let metadata: HashMap<String, Value> = details
            .into_iter()
            .map(|(id, body)| (id15_owned(&id), body))
            .collect();

        let scanner = ctx.factory.scanner();
        let mut fields = BTreeMap::new();
        for row in &rows {
            let id = short_id(row, "Id");
            let meta = metadata
                .get(&id)
                .and_then(|body| body.get("Metadata"))
                .cloned()
                .unwrap_or(Value::Null);
            let formula = meta.get("formula").and_then(Value::as_str);
            let namespace = text_or_empty(row, "NamespacePrefix");
            let developer_name = text_or_empty(row, "DeveloperName");
            let name = if namespace.is_empty() {
                format!("{}__c", developer_name)
            } else {
                format!("{}__{}__c", namespace, developer_name)
            };

            let props = properties(json!({
                "id": id,
                "url": record_url(&id),
                "name": name,
                "label": meta.get("label").and_then(Value::as_str).unwrap_or_default(),
                "package": namespace,
                "description": text(row, "Description"),
                "objectId": text_or_empty(row, "EntityDefinitionId"),
                "objectName": text_or_empty(row, "EntityDefinition.QualifiedApiName"),
                "type": meta.get("type").and_then(Value::as_str).unwrap_or_default(),
                "tooltip": meta.get("inlineHelpText").and_then(Value::as_str),
                "length": meta.get("length").and_then(Value::as_u64),
                "formula": formula,
                "isRestrictedPicklist": meta
                    .pointer("/valueSet/restricted")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                "hardCodedUrls": formula.map(|f| scanner.hard_coded_urls(f)).unwrap_or_default(),
                "hardCodedIds": formula.map(|f| scanner.hard_coded_ids(f)).unwrap_or_default(),
                "createdDate": timestamp(row, "CreatedDate"),
                "lastModifiedDate": timestamp(row, "LastModifiedDate"),
            }));
            let entity = ctx
                .factory
                .create_with_score(EntityType::CustomField, props, Some(&graph))?;
            fields.insert(id, entity);
        }

        Ok(DatasetValue::Map(fields))
    }
}
