// orgscan-core/src/application/datasets/users.rs

use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;

use super::{alias, count, flag, properties, record_url, short_id, text_or_empty, timestamp};
use crate::application::api::SoqlQuery;
use crate::application::ports::{Dataset, DatasetContext};
use crate::domain::dataset::DatasetValue;
use crate::domain::entity::EntityType;
use crate::error::OrgScanError;

/// Active, licensed users. The profile is left as an id; the users recipe
/// joins it.
pub struct UsersDataset;

#[async_trait]
impl Dataset for UsersDataset {
    fn alias(&self) -> &'static str {
        alias::USERS
    }

    async fn run(&self, ctx: &DatasetContext) -> Result<DatasetValue, OrgScanError> {
        let query = SoqlQuery::new(
            "SELECT Id, Name, IsActive, LastLoginDate, NumberOfFailedLogins, \
             UserPreferencesLightningExperiencePreferred, ProfileId \
             FROM User WHERE IsActive = true AND Profile.Id != null",
        );
        let rows = ctx.api.soql_query(&[query]).await?.into_iter().flatten();

        let mut records = BTreeMap::new();
        for row in rows {
            let id = short_id(&row, "Id");
            let props = properties(json!({
                "id": id,
                "url": record_url(&id),
                "name": text_or_empty(&row, "Name"),
                "isActive": flag(&row, "IsActive"),
                "lastLogin": timestamp(&row, "LastLoginDate"),
                "numberFailedLogins": count(&row, "NumberOfFailedLogins"),
                "onLightningExperience": flag(&row, "UserPreferencesLightningExperiencePreferred"),
                "profileId": short_id(&row, "ProfileId"),
            }));
            let entity = ctx.factory.create_with_score(EntityType::User, props, None)?;
            records.insert(id, entity);
        }
        Ok(DatasetValue::Map(records))
    }
}
