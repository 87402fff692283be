// orgscan-core/src/application/recipes/custom_fields.rs

use std::collections::BTreeMap;

use super::sorted;
use crate::application::datasets::alias;
use crate::application::ports::recipe::{DatasetResults, Recipe, required};
use crate::domain::dataset::DatasetIdentity;
use crate::domain::entity::Entity;
use crate::error::OrgScanError;

/// Custom fields of the org or of one object (`object`), optionally limited
/// to one package (`namespace`; an empty value means "no package").
pub struct CustomFieldsRecipe;

impl Recipe for CustomFieldsRecipe {
    fn alias(&self) -> &'static str {
        alias::CUSTOM_FIELDS
    }

    fn extract(&self, parameters: &BTreeMap<String, String>) -> Vec<DatasetIdentity> {
        let identity = DatasetIdentity::new(alias::CUSTOM_FIELDS);
        match parameters.get("object") {
            Some(object) => vec![identity.with_parameter("object", object.clone())],
            None => vec![identity],
        }
    }

    fn transform(
        &self,
        data: &DatasetResults,
        parameters: &BTreeMap<String, String>,
    ) -> Result<Vec<Entity>, OrgScanError> {
        let namespace = parameters.get("namespace").map(String::as_str);
        let records = required(data, alias::CUSTOM_FIELDS)?
            .entities()
            .filter(|entity| match (entity, namespace) {
                (Entity::CustomField(field), Some(ns)) => field.package == ns,
                _ => true,
            })
            .cloned()
            .collect();
        Ok(sorted(records))
    }
}
