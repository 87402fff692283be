// orgscan-core/src/application/recipes/users.rs

use std::collections::BTreeMap;

use super::sorted;
use crate::application::datasets::alias;
use crate::application::ports::recipe::{DatasetResults, Recipe, required};
use crate::domain::dataset::DatasetIdentity;
use crate::domain::entity::Entity;
use crate::error::OrgScanError;

/// Users with their profile joined in as `profileRef`.
pub struct UsersRecipe;

impl Recipe for UsersRecipe {
    fn alias(&self) -> &'static str {
        alias::USERS
    }

    fn extract(&self, _parameters: &BTreeMap<String, String>) -> Vec<DatasetIdentity> {
        vec![
            DatasetIdentity::new(alias::USERS),
            DatasetIdentity::new(alias::PROFILES),
        ]
    }

    fn transform(
        &self,
        data: &DatasetResults,
        _parameters: &BTreeMap<String, String>,
    ) -> Result<Vec<Entity>, OrgScanError> {
        let profiles = required(data, alias::PROFILES)?;
        let records = required(data, alias::USERS)?
            .entities()
            .map(|entity| {
                let mut entity = entity.clone();
                if let Entity::User(user) = &mut entity {
                    user.profile_ref = match profiles.get(&user.profile_id) {
                        Some(Entity::Profile(profile)) => Some(Box::new(profile.clone())),
                        _ => None,
                    };
                }
                entity
            })
            .collect();
        Ok(sorted(records))
    }
}
