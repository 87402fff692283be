// orgscan-core/src/application/datasets/profile_password_policies.rs

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::debug;

use super::{alias, properties};
use crate::application::ports::{Dataset, DatasetContext};
use crate::domain::dataset::DatasetValue;
use crate::domain::entity::EntityType;
use crate::error::OrgScanError;

const METADATA_TYPE: &str = "ProfilePasswordPolicy";

/// Password policies only exist in the metadata API: list the members, then
/// read them in groups.
pub struct ProfilePasswordPoliciesDataset;

fn unsigned(policy: &Value, key: &str) -> u64 {
    match policy.get(key) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

fn boolean(policy: &Value, key: &str) -> bool {
    match policy.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true",
        _ => false,
    }
}

#[async_trait]
impl Dataset for ProfilePasswordPoliciesDataset {
    fn alias(&self) -> &'static str {
        alias::PROFILE_PASSWORD_POLICIES
    }

    async fn run(&self, ctx: &DatasetContext) -> Result<DatasetValue, OrgScanError> {
        let members: Vec<String> = ctx
            .api
            .list_metadata(METADATA_TYPE)
            .await?
            .into_iter()
            .map(|item| item.full_name)
            .collect();
        debug!(policies = members.len(), "Password policies listed");
        let policies = ctx.api.read_metadata(METADATA_TYPE, &members).await?;

        let mut records = BTreeMap::new();
        for policy in &policies {
            // Policies name the profile they apply to; fall back to the member name.
            let Some(name) = policy
                .get("profile")
                .or_else(|| policy.get("fullName"))
                .and_then(Value::as_str)
                .map(str::to_string)
            else {
                continue;
            };
            let max_attempts = unsigned(policy, "maxLoginAttempts");
            let props = properties(json!({
                "name": name,
                "lockoutInterval": unsigned(policy, "lockoutInterval"),
                "maxLoginAttempts": (max_attempts > 0).then_some(max_attempts),
                "minimumPasswordLength": unsigned(policy, "minimumPasswordLength"),
                "minimumPasswordLifetime": boolean(policy, "minimumPasswordLifetime"),
                "obscure": boolean(policy, "obscure"),
                "passwordComplexity": unsigned(policy, "passwordComplexity"),
                "passwordExpiration": unsigned(policy, "passwordExpiration"),
                "passwordHistory": unsigned(policy, "passwordHistory"),
                "passwordQuestion": unsigned(policy, "passwordQuestion"),
            }));
            let entity = ctx
                .factory
                .create_with_score(EntityType::ProfilePasswordPolicy, props, None)?;
            records.insert(name, entity);
        }
        Ok(DatasetValue::Map(records))
    }
}
