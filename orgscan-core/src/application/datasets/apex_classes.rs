// orgscan-core/src/application/datasets/apex_classes.rs

use async_trait::async_trait;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::{
    EDITABLE_ONLY, alias, count, number, properties, record_url, short_id, text, text_or_empty,
    timestamp,
};
use crate::application::api::SoqlQuery;
use crate::application::ports::{Dataset, DatasetContext};
use crate::domain::dataset::DatasetValue;
use crate::domain::entity::EntityType;
use crate::error::OrgScanError;

pub struct ApexClassesDataset;

#[async_trait]
impl Dataset for ApexClassesDataset {
    fn alias(&self) -> &'static str {
        alias::APEX_CLASSES
    }

    async fn run(&self, ctx: &DatasetContext) -> Result<DatasetValue, OrgScanError> {
        // Bodies are large, so the class list pages by id instead of cursor.
        let classes = SoqlQuery::new(format!(
            "SELECT Id, Name, ApiVersion, NamespacePrefix, Body, LengthWithoutComments, \
             CreatedDate, LastModifiedDate FROM ApexClass WHERE {}",
            EDITABLE_ONLY
        ))
        .tooling()
        .ordinal("Id");
        // Orgs without coverage data reject the object outright.
        let coverage = SoqlQuery::new(
            "SELECT ApexClassOrTriggerId, NumLinesCovered, NumLinesUncovered \
             FROM ApexCodeCoverageAggregate",
        )
        .tooling()
        .by_passing(&["INVALID_TYPE"]);

        let mut results = ctx.api.soql_query(&[classes, coverage]).await?.into_iter();
        let class_rows = results.next().unwrap_or_default();
        let coverage_rows = results.next().unwrap_or_default();

        let coverage_by_id: HashMap<String, f64> = coverage_rows
            .iter()
            .filter_map(|row| {
                let covered = number(row, "NumLinesCovered")?;
                let uncovered = number(row, "NumLinesUncovered").unwrap_or(0.0);
                let total = covered + uncovered;
                (total > 0.0).then(|| (short_id(row, "ApexClassOrTriggerId"), covered / total))
            })
            .collect();

        let ids: Vec<String> = class_rows.iter().filter_map(|r| text(r, "Id")).collect();
        debug!(classes = ids.len(), covered = coverage_by_id.len(), "Apex classes listed");
        let graph = ctx.api.dependencies_for(&ids).await?;

        let scanner = ctx.factory.scanner();
        let mut records = BTreeMap::new();
        for row in &class_rows {
            let id = short_id(row, "Id");
            let facts = scanner.scan_apex(&text_or_empty(row, "Body"));
            let props = properties(json!({
                "id": id,
                "url": record_url(&id),
                "name": text_or_empty(row, "Name"),
                "apiVersion": number(row, "ApiVersion"),
                "package": text_or_empty(row, "NamespacePrefix"),
                "isTest": facts.is_test,
                "isTestSeeAllData": facts.is_test_see_all_data,
                "isAbstract": facts.is_abstract,
                "isInterface": facts.is_interface,
                "isEnum": facts.is_enum,
                "specifiedSharing": facts.specified_sharing,
                "nbSystemAsserts": facts.nb_system_asserts,
                "coverage": coverage_by_id.get(&id),
                "length": count(row, "LengthWithoutComments"),
                "hardCodedUrls": facts.hard_coded_urls,
                "hardCodedIds": facts.hard_coded_ids,
                "createdDate": timestamp(row, "CreatedDate"),
                "lastModifiedDate": timestamp(row, "LastModifiedDate"),
            }));
            let entity = ctx
                .factory
                .create_with_score(EntityType::ApexClass, props, Some(&graph))?;
            records.insert(id, entity);
        }
        Ok(DatasetValue::Map(records))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::application::api::testing::FakePlatform;
    use crate::application::datasets::testing::{context, page};
    use crate::domain::entity::Entity;
    use anyhow::Result;

    #[tokio::test]
    async fn test_classes_with_coverage() -> Result<()> {
        let platform = FakePlatform::new().on_query(|soql, tooling| {
            assert!(tooling);
            if soql.contains("FROM ApexCodeCoverageAggregate") {
                return Ok(page(vec![json!({
                    "ApexClassOrTriggerId": "01p5e000000AbCdAAA",
                    "NumLinesCovered": 3,
                    "NumLinesUncovered": 1
                })]));
            }
            assert!(soql.contains("ORDER BY Id LIMIT 200"), "{}", soql);
            Ok(page(vec![json!({
                "Id": "01p5e000000AbCdAAA",
                "Name": "AccountService",
                "ApiVersion": 59.0,
                "NamespacePrefix": null,
                "Body": "public with sharing abstract class AccountService { }",
                "LengthWithoutComments": 52,
                "CreatedDate": "2024-01-31T09:15:00.000+0000",
                "LastModifiedDate": "2024-01-31T09:15:00.000+0000"
            })]))
        });
        let ctx = context(platform);

        let value = ApexClassesDataset.run(&ctx).await?;
        match value.get("01p5e000000AbCd") {
            Some(Entity::ApexClass(class)) => {
                assert_eq!(class.coverage, Some(0.75));
                assert!(class.is_abstract);
                assert_eq!(class.specified_sharing.as_deref(), Some("with sharing"));
                assert_eq!(class.api_version, Some(59.0));
                assert_eq!(class.length, 52);
            }
            other => panic!("Expected an apex class, got {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_org_without_coverage_data() -> Result<()> {
        let platform = FakePlatform::new().on_query(|soql, _| {
            if soql.contains("ApexCodeCoverageAggregate") {
                return Err(crate::ports::platform::PlatformError::Api {
                    status: 400,
                    error_code: "INVALID_TYPE".into(),
                    message: "not supported".into(),
                });
            }
            Ok(page(vec![json!({ "Id": "01p5e000000AbCdAAA", "Name": "Util", "Body": "" })]))
        });
        let value = ApexClassesDataset.run(&context(platform)).await?;
        match value.get("01p5e000000AbCd") {
            Some(Entity::ApexClass(class)) => assert_eq!(class.coverage, None),
            other => panic!("Expected an apex class, got {:?}", other),
        }
        Ok(())
    }
}
