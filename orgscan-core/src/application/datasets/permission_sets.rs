// orgscan-core/src/application/datasets/permission_sets.rs

use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;

use super::profiles::{PERMISSION_COLUMNS, important_permissions, member_counts};
use super::{alias, flag, properties, record_url, short_id, text, text_or_empty};
use crate::application::api::SoqlQuery;
use crate::application::ports::{Dataset, DatasetContext};
use crate::domain::dataset::DatasetValue;
use crate::domain::entity::EntityType;
use crate::error::OrgScanError;

/// Permission sets and permission set groups not owned by a profile.
pub struct PermissionSetsDataset;

#[async_trait]
impl Dataset for PermissionSetsDataset {
    fn alias(&self) -> &'static str {
        alias::PERMISSION_SETS
    }

    async fn run(&self, ctx: &DatasetContext) -> Result<DatasetValue, OrgScanError> {
        let sets = SoqlQuery::new(format!(
            "SELECT Id, Name, Description, IsCustom, License.Name, NamespacePrefix, Type, {} \
             FROM PermissionSet WHERE IsOwnedByProfile = FALSE",
            PERMISSION_COLUMNS
        ));
        let members = SoqlQuery::new(
            "SELECT PermissionSetId, COUNT(Id) total FROM PermissionSetAssignment \
             WHERE Assignee.IsActive = TRUE GROUP BY PermissionSetId",
        )
        .ordinal_aggregate("PermissionSetId", "PermissionSetId");

        let mut results = ctx.api.soql_query(&[sets, members]).await?.into_iter();
        let set_rows = results.next().unwrap_or_default();
        let member_rows = results.next().unwrap_or_default();
        let counts = member_counts(&member_rows, "PermissionSetId");

        let mut records = BTreeMap::new();
        for row in &set_rows {
            let id = short_id(row, "Id");
            let props = properties(json!({
                "id": id,
                "url": record_url(&id),
                "name": text_or_empty(row, "Name"),
                "description": text(row, "Description"),
                "license": text_or_empty(row, "License.Name"),
                "isCustom": flag(row, "IsCustom"),
                "isGroup": text(row, "Type").as_deref() == Some("Group"),
                "package": text_or_empty(row, "NamespacePrefix"),
                "memberCount": counts.get(&id).copied().unwrap_or(0),
                "importantPermissions": important_permissions(row),
            }));
            let entity = ctx
                .factory
                .create_with_score(EntityType::PermissionSet, props, None)?;
            records.insert(id, entity);
        }
        Ok(DatasetValue::Map(records))
    }
}
