mod common;

use anyhow::Result;
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;

use common::{Pipeline, ScriptedPlatform};
use orgscan_core::OrgScanError;
use orgscan_core::application::QuotaWatchdog;
use orgscan_core::domain::dataset::DatasetIdentity;
use orgscan_core::domain::entity::Entity;
use orgscan_core::domain::quota::QuotaSnapshot;
use orgscan_core::infrastructure::MemoryStorage;
use orgscan_core::ports::storage::KeyValueStorage;

const REGION_ID: &str = "00N5e00000AbCdEFGH";
const LINK_ID: &str = "00N5e00000XyZwVUTS";

/// Two Account fields: `Region__c` is documented and used by a class,
/// `Link__c` is undocumented, unused and hard-codes the instance URL.
fn account_fields_platform() -> ScriptedPlatform {
    ScriptedPlatform::new()
        .on_query(|soql| {
            if !soql.contains("FROM CustomField") {
                return vec![];
            }
            vec![
                json!({
                    "Id": REGION_ID,
                    "EntityDefinitionId": "01I5e000000AcCoUNT",
                    "EntityDefinition": { "QualifiedApiName": "Account" },
                    "DeveloperName": "Region",
                    "NamespacePrefix": null,
                    "Description": "Sales region",
                    "CreatedDate": "2024-01-31T09:15:00.000+0000",
                    "LastModifiedDate": "2024-03-01T10:00:00.000+0000"
                }),
                json!({
                    "Id": LINK_ID,
                    "EntityDefinitionId": "01I5e000000AcCoUNT",
                    "EntityDefinition": { "QualifiedApiName": "Account" },
                    "DeveloperName": "Link",
                    "NamespacePrefix": null,
                    "Description": null,
                    "CreatedDate": "2024-02-01T09:15:00.000+0000",
                    "LastModifiedDate": null
                }),
            ]
        })
        .on_sub_request(|request| {
            if request.url.contains("/query?q=") {
                let page = json!({
                    "totalSize": 1,
                    "done": true,
                    "records": [{
                        "MetadataComponentId": "01p5e000000ClAsAAA",
                        "MetadataComponentName": "AccountService",
                        "MetadataComponentType": "ApexClass",
                        "RefMetadataComponentId": REGION_ID,
                        "RefMetadataComponentName": "Account.Region__c",
                        "RefMetadataComponentType": "CustomField"
                    }]
                });
                return (200, page);
            }
            let metadata = if request.reference_id == REGION_ID {
                json!({ "label": "Region", "type": "Picklist", "valueSet": { "restricted": true } })
            } else {
                json!({
                    "label": "Link",
                    "type": "Text",
                    "formula": "HYPERLINK('https://acme.my.salesforce.com/' & Id, 'Open')"
                })
            };
            (200, json!({ "Metadata": metadata }))
        })
}

fn account_request() -> Vec<DatasetIdentity> {
    vec![DatasetIdentity::new("custom-fields").with_parameter("object", "Account")]
}

#[tokio::test]
async fn test_custom_fields_end_to_end_with_cache() -> Result<()> {
    let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
    let pipeline = Pipeline::new(account_fields_platform(), storage.clone());

    let first = pipeline.orchestrator.run(&account_request()).await?;
    let fields = &first["custom-fields"];

    // One list query, one dependency batch, one metadata read batch.
    assert_eq!(pipeline.platform.calls_of("query"), 1);
    assert_eq!(pipeline.platform.calls_of("composite"), 2);
    assert_eq!(pipeline.platform.call_count(), 3);
    let log = pipeline.platform.log.lock().unwrap().join("\n");
    assert!(log.contains("EntityDefinition.QualifiedApiName = 'Account'"));

    assert_eq!(fields.len(), 2);
    let region = fields.get("00N5e00000AbCdE").expect("region keyed by 15-char id");
    let link = fields.get("00N5e00000XyZwV").expect("link keyed by 15-char id");

    match (region, link) {
        (Entity::CustomField(region), Entity::CustomField(link)) => {
            assert_eq!(region.name, "Region__c");
            assert_eq!(region.label, "Region");
            assert!(region.is_restricted_picklist);
            assert_eq!(region.score, 0);
            let deps = region.dependencies.as_ref().expect("fragment attached");
            assert_eq!(deps.referenced.len(), 1);
            assert_eq!(deps.referenced_by_type.get("ApexClass"), Some(&1));

            assert_eq!(link.hard_coded_urls, vec!["acme.my.salesforce.com".to_string()]);
            assert_eq!(link.bad_reason_ids, vec![0, 1, 7]);
            assert_eq!(link.score, 3);
        }
        other => panic!("Expected custom fields, got {:?}", other),
    }

    // Populated cache: no platform call and the same records.
    let second = pipeline.orchestrator.run(&account_request()).await?;
    assert_eq!(pipeline.platform.call_count(), 3);
    assert_eq!(
        serde_json::to_string(&*first["custom-fields"])?,
        serde_json::to_string(&*second["custom-fields"])?
    );

    // A fresh pipeline over the same storage reads the cache too.
    let restarted = Pipeline::new(account_fields_platform(), storage);
    let third = restarted.orchestrator.run(&account_request()).await?;
    assert_eq!(restarted.platform.call_count(), 0);
    assert_eq!(
        serde_json::to_string(&*first["custom-fields"])?,
        serde_json::to_string(&*third["custom-fields"])?
    );
    Ok(())
}

#[tokio::test]
async fn test_red_quota_blocks_before_any_call() -> Result<()> {
    let snapshot = QuotaSnapshot {
        used_ratio: 0.95,
        measured_at: Some(Utc::now() - Duration::seconds(10)),
        ..QuotaSnapshot::default()
    };
    let watchdog = QuotaWatchdog::with_snapshot(snapshot, Duration::seconds(60));

    let pipeline = Pipeline::with_watchdog(
        account_fields_platform(),
        Arc::new(MemoryStorage::new()),
        watchdog,
    );

    let err = pipeline.orchestrator.run(&account_request()).await.unwrap_err();
    assert!(err.is_quota_exceeded(), "unexpected error: {}", err);
    assert!(matches!(err, OrgScanError::Dataset { ref alias, .. } if alias == "custom-fields"));
    assert_eq!(pipeline.platform.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_call_pushing_usage_into_red_is_the_last_one() -> Result<()> {
    // Every response reports 95% usage: the list query is let through, the
    // calls after it are refused.
    let platform = account_fields_platform().with_usage(14250, 15000);
    let pipeline = Pipeline::new(platform, Arc::new(MemoryStorage::new()));

    let err = pipeline.orchestrator.run(&account_request()).await.unwrap_err();
    assert!(err.is_quota_exceeded());
    assert_eq!(pipeline.platform.call_count(), 1);
    assert!((pipeline.watchdog.snapshot().used_ratio - 0.95).abs() < 1e-9);

    // Nothing half-built was cached.
    assert!(pipeline.orchestrator.cache().details().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_concurrent_recipe_runs_extract_once() -> Result<()> {
    let pipeline = Pipeline::new(account_fields_platform(), Arc::new(MemoryStorage::new()));
    let params = BTreeMap::from([("object".to_string(), "Account".to_string())]);

    let runs = (0..5).map(|_| pipeline.recipes.run("custom-fields", &params));
    let results = futures::future::try_join_all(runs).await?;

    assert_eq!(pipeline.platform.call_count(), 3);
    for records in &results {
        assert_eq!(records, &results[0]);
    }
    let names: Vec<&str> = results[0].iter().map(Entity::name).collect();
    assert_eq!(names, vec!["Link__c", "Region__c"]);
    Ok(())
}

#[tokio::test]
async fn test_users_recipe_joins_profiles() -> Result<()> {
    let platform = ScriptedPlatform::new().on_query(|soql| {
        if soql.contains("FROM User WHERE IsActive = true AND") {
            vec![json!({
                "Id": "0055e000001AbCdAAA",
                "Name": "Ada",
                "IsActive": true,
                "LastLoginDate": null,
                "NumberOfFailedLogins": 0,
                "UserPreferencesLightningExperiencePreferred": true,
                "ProfileId": "00e5e000000AdMiAAA"
            })]
        } else if soql.contains("FROM PermissionSet WHERE IsOwnedByProfile = TRUE") {
            vec![json!({
                "ProfileId": "00e5e000000AdMiAAA",
                "Profile": { "Name": "System Administrator", "Description": null },
                "IsCustom": false,
                "License": { "Name": "Salesforce" },
                "NamespacePrefix": null,
                "PermissionsModifyAllData": true,
                "PermissionsViewAllData": true
            })]
        } else if soql.contains("GROUP BY ProfileId") {
            vec![json!({ "ProfileId": "00e5e000000AdMiAAA", "total": 1 })]
        } else {
            Vec::<Value>::new()
        }
    });
    let pipeline = Pipeline::new(platform, Arc::new(MemoryStorage::new()));

    let records = pipeline.recipes.run("users", &BTreeMap::new()).await?;
    assert_eq!(records.len(), 1);
    match &records[0] {
        Entity::User(user) => {
            assert_eq!(user.profile_id, "00e5e000000AdMi");
            let profile = user.profile_ref.as_ref().expect("profile joined");
            assert_eq!(profile.name, "System Administrator");
            assert_eq!(profile.member_count, 1);
            assert!(profile.important_permissions.grants_full_data_access());
            // Never logged in.
            assert!(user.bad_fields.contains(&"lastLogin".to_string()));
        }
        other => panic!("Expected a user, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_password_policies_from_metadata_api() -> Result<()> {
    let platform = ScriptedPlatform::new().with_metadata(vec![
        json!({
            "fullName": "AdminPolicy",
            "profile": "Admin",
            "lockoutInterval": 15,
            "maxLoginAttempts": 0,
            "minimumPasswordLength": 12,
            "minimumPasswordLifetime": true,
            "obscure": true,
            "passwordComplexity": 3,
            "passwordExpiration": 90,
            "passwordHistory": 5,
            "passwordQuestion": 1
        }),
        json!({ "fullName": "StandardPolicy", "minimumPasswordLength": "8" }),
    ]);
    let pipeline = Pipeline::new(platform, Arc::new(MemoryStorage::new()));

    let records = pipeline
        .recipes
        .run("profile-password-policies", &BTreeMap::new())
        .await?;
    assert_eq!(pipeline.platform.calls_of("list_metadata"), 1);
    assert_eq!(pipeline.platform.calls_of("read_metadata"), 1);

    let names: Vec<&str> = records.iter().map(Entity::name).collect();
    assert_eq!(names, vec!["Admin", "StandardPolicy"]);
    match &records[0] {
        Entity::ProfilePasswordPolicy(policy) => {
            assert_eq!(policy.max_login_attempts, None);
            assert_eq!(policy.minimum_password_length, 12);
            assert!(policy.obscure);
        }
        other => panic!("Expected a password policy, got {:?}", other),
    }
    match &records[1] {
        Entity::ProfilePasswordPolicy(policy) => assert_eq!(policy.minimum_password_length, 8),
        other => panic!("Expected a password policy, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_clean_through_recipe_manager() -> Result<()> {
    let pipeline = Pipeline::new(account_fields_platform(), Arc::new(MemoryStorage::new()));
    let params = BTreeMap::from([("object".to_string(), "Account".to_string())]);

    pipeline.recipes.run("custom-fields", &params).await?;
    assert!(pipeline.orchestrator.cache().has("custom-fields?object=Account"));

    pipeline.recipes.clean("custom-fields", &params)?;
    assert!(!pipeline.orchestrator.cache().has("custom-fields?object=Account"));

    pipeline.recipes.run("custom-fields", &params).await?;
    assert_eq!(pipeline.platform.call_count(), 6);

    assert!(matches!(
        pipeline.recipes.clean("flows", &params),
        Err(OrgScanError::UnknownRecipe(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_pipeline_without_cache() -> Result<()> {
    let storage: Arc<dyn KeyValueStorage> = Arc::new(orgscan_core::infrastructure::NullStorage);

    let first = Pipeline::new(account_fields_platform(), storage.clone());
    let a = first.orchestrator.run(&account_request()).await?;
    assert!(first.orchestrator.cache().details().is_empty());

    let second = Pipeline::new(account_fields_platform(), storage);
    let b = second.orchestrator.run(&account_request()).await?;
    assert_eq!(second.platform.call_count(), 3);
    assert_eq!(a["custom-fields"], b["custom-fields"]);
    Ok(())
}

#[tokio::test]
async fn test_file_cache_survives_restart() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let storage = || -> Arc<dyn KeyValueStorage> {
        Arc::new(orgscan_core::infrastructure::FileStorage::new(dir.path().join("cache")))
    };

    let first = Pipeline::new(account_fields_platform(), storage());
    first.orchestrator.run(&account_request()).await?;

    let second = Pipeline::new(account_fields_platform(), storage());
    let details = second.orchestrator.cache().details();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0].name, "custom-fields?object=Account");
    assert!(details[0].is_map);
    assert_eq!(details[0].length, 2);

    second.orchestrator.run(&account_request()).await?;
    assert_eq!(second.platform.call_count(), 0);
    Ok(())
}
