// orgscan-core/src/application/datasets/profiles.rs

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};

use super::{alias, count, flag, properties, record_url, short_id, text, text_or_empty};
use crate::application::api::SoqlQuery;
use crate::application::ports::{Dataset, DatasetContext};
use crate::domain::dataset::DatasetValue;
use crate::domain::entity::EntityType;
use crate::error::OrgScanError;
use crate::ports::platform::Row;

/// Permission columns shared by profile and permission set queries.
pub(crate) const PERMISSION_COLUMNS: &str = "PermissionsApiEnabled, PermissionsViewSetup, \
     PermissionsModifyAllData, PermissionsViewAllData, PermissionsManageUsers, \
     PermissionsCustomizeApplication";

pub(crate) fn important_permissions(row: &Row) -> Value {
    json!({
        "apiEnabled": flag(row, "PermissionsApiEnabled"),
        "viewSetup": flag(row, "PermissionsViewSetup"),
        "modifyAllData": flag(row, "PermissionsModifyAllData"),
        "viewAllData": flag(row, "PermissionsViewAllData"),
        "manageUsers": flag(row, "PermissionsManageUsers"),
        "customizeApplication": flag(row, "PermissionsCustomizeApplication"),
    })
}

/// `(group id, total)` pairs of a `GROUP BY` member count query.
pub(crate) fn member_counts(rows: &[Row], group_column: &str) -> HashMap<String, u64> {
    rows.iter()
        .map(|row| (short_id(row, group_column), count(row, "total")))
        .collect()
}

/// Profiles, read through the permission set each profile owns. Keyed by the
/// profile id.
pub struct ProfilesDataset;

#[async_trait]
impl Dataset for ProfilesDataset {
    fn alias(&self) -> &'static str {
        alias::PROFILES
    }

    async fn run(&self, ctx: &DatasetContext) -> Result<DatasetValue, OrgScanError> {
        let profiles = SoqlQuery::new(format!(
            "SELECT ProfileId, Profile.Name, Profile.Description, IsCustom, License.Name, \
             NamespacePrefix, {} FROM PermissionSet WHERE IsOwnedByProfile = TRUE",
            PERMISSION_COLUMNS
        ));
        // Group queries cannot use the cursor.
        let members = SoqlQuery::new(
            "SELECT ProfileId, COUNT(Id) total FROM User WHERE IsActive = true GROUP BY ProfileId",
        )
        .ordinal_aggregate("ProfileId", "ProfileId");

        let mut results = ctx.api.soql_query(&[profiles, members]).await?.into_iter();
        let profile_rows = results.next().unwrap_or_default();
        let member_rows = results.next().unwrap_or_default();
        let counts = member_counts(&member_rows, "ProfileId");

        let mut records = BTreeMap::new();
        for row in &profile_rows {
            let id = short_id(row, "ProfileId");
            let props = properties(json!({
                "id": id,
                "url": record_url(&id),
                "name": text_or_empty(row, "Profile.Name"),
                "description": text(row, "Profile.Description"),
                "license": text_or_empty(row, "License.Name"),
                "isCustom": flag(row, "IsCustom"),
                "package": text_or_empty(row, "NamespacePrefix"),
                "memberCount": counts.get(&id).copied().unwrap_or(0),
                "importantPermissions": important_permissions(row),
            }));
            let entity = ctx.factory.create_with_score(EntityType::Profile, props, None)?;
            records.insert(id, entity);
        }
        Ok(DatasetValue::Map(records))
    }
}
