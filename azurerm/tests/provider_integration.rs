use azurerm::api::{Client, PollerConfig, RetryConfig, StaticTokenCredential};
use azurerm::context::Context;
use azurerm::locks::InMemoryLockManager;
use azurerm::provider_data::AzureRmProviderData;
use azurerm::resource::{
    CreateResourceRequest, DeleteResourceRequest, ReadResourceRequest, UpdateResourceRequest,
};
use azurerm::types::{has_errors, AttributePath, DynamicValue};
use azurerm::{AzureRmProvider, PlanResourceChangeRequest};
use mockito::{Matcher, Server};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";
const LAB_PATH: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.LabServices/labs/lab1";
const CACHE_PATH: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.StorageCache/caches/cache1";
const JOB_PATH: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.DataBox/jobs/job1";
const ACCOUNT_1: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.Storage/storageAccounts/acc1";
const ACCOUNT_2: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.Storage/storageAccounts/acc2";

fn provider(server_url: &str) -> AzureRmProvider {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();

    let client = Client::with_config(
        server_url,
        Arc::new(StaticTokenCredential::new("test-token")),
        RetryConfig {
            max_retries: 1,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            timeout_seconds: 5,
        },
        PollerConfig {
            default_interval: Duration::from_millis(10),
        },
    )
    .unwrap();

    AzureRmProvider::with_provider_data(AzureRmProviderData::new(
        client,
        Arc::new(InMemoryLockManager::new()),
        SUBSCRIPTION,
    ))
}

fn lab_config() -> serde_json::Value {
    json!({
        "name": "lab1",
        "resource_group_name": "rg1",
        "location": "West Europe",
        "title": "Test Title",
        "security": [{"open_access_enabled": false}],
        "virtual_machine": [{
            "admin_user": [{"username": "testadmin", "password": "Password1234!"}],
            "image_reference": [{
                "offer": "0001-com-ubuntu-server-focal",
                "publisher": "canonical",
                "sku": "20_04-lts",
                "version": "latest"
            }],
            "sku": [{"name": "Classic_Fsv2_2_4GB_128_S_SSD", "capacity": 1}]
        }]
    })
}

fn lab_body() -> String {
    json!({
        "id": LAB_PATH,
        "name": "lab1",
        "location": "westeurope",
        "properties": {
            "provisioningState": "Succeeded",
            "title": "Test Title",
            "autoShutdownProfile": {
                "shutdownOnDisconnect": "Disabled",
                "shutdownWhenNotConnected": "Disabled",
                "shutdownOnIdle": "None"
            },
            "connectionProfile": {"clientRdpAccess": "None", "clientSshAccess": "None"},
            "securityProfile": {"openAccess": "Disabled", "registrationCode": "code1"},
            "virtualMachineProfile": {
                "adminUser": {"username": "testadmin"},
                "createOption": "Image",
                "imageReference": {
                    "offer": "0001-com-ubuntu-server-focal",
                    "publisher": "canonical",
                    "sku": "20_04-lts",
                    "version": "latest"
                },
                "sku": {"name": "Classic_Fsv2_2_4GB_128_S_SSD", "capacity": 1},
                "usageQuota": "PT0S",
                "useSharedPassword": "Disabled",
                "additionalCapabilities": {"installGpuDrivers": "Disabled"}
            }
        }
    })
    .to_string()
}

#[tokio::test]
async fn lab_lifecycle_with_mock_server() {
    let mut server = Server::new_async().await;
    let provider = provider(&server.url());

    let plan = provider
        .plan_resource_change(
            Context::new(),
            PlanResourceChangeRequest {
                type_name: "azurerm_lab_service_lab".to_string(),
                prior_state: DynamicValue::null(),
                config: DynamicValue::from_json(lab_config()),
            },
        )
        .await;
    assert!(!has_errors(&plan.diagnostics), "{:?}", plan.diagnostics);
    assert_eq!(
        plan.planned_state
            .get_string(&AttributePath::parse("virtual_machine.0.usage_quota"))
            .unwrap(),
        "PT0S"
    );

    let missing = server
        .mock("GET", LAB_PATH)
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"error":{"code":"ResourceNotFound","message":"not found"}}"#)
        .expect(1)
        .create_async()
        .await;
    let put = server
        .mock("PUT", LAB_PATH)
        .match_query(Matcher::UrlEncoded("api-version".into(), "2022-08-01".into()))
        .match_header("authorization", "Bearer test-token")
        .match_body(Matcher::PartialJson(json!({
            "location": "westeurope",
            "properties": {
                "title": "Test Title",
                "securityProfile": {"openAccess": "Disabled"},
                "virtualMachineProfile": {
                    "adminUser": {"username": "testadmin", "password": "Password1234!"},
                    "sku": {"capacity": 1}
                }
            }
        })))
        .with_body(lab_body())
        .expect(1)
        .create_async()
        .await;
    let _found = server
        .mock("GET", LAB_PATH)
        .match_query(Matcher::Any)
        .with_body(lab_body())
        .create_async()
        .await;

    let resource = provider.create_resource("azurerm_lab_service_lab").await.unwrap();
    let created = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "azurerm_lab_service_lab".to_string(),
                planned_state: plan.planned_state.clone(),
                config: DynamicValue::from_json(lab_config()),
            },
        )
        .await;
    assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
    missing.assert_async().await;
    put.assert_async().await;

    let state = created.new_state;
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), LAB_PATH);
    assert_eq!(
        state
            .get_string(&AttributePath::parse("virtual_machine.0.admin_user.0.password"))
            .unwrap(),
        "Password1234!"
    );
    assert_eq!(
        state
            .get_string(&AttributePath::parse("security.0.registration_code"))
            .unwrap(),
        "code1"
    );

    let read = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "azurerm_lab_service_lab".to_string(),
                current_state: state.clone(),
            },
        )
        .await;
    assert!(read.diagnostics.is_empty());
    assert_eq!(read.new_state.as_ref(), Some(&state));

    let delete = server
        .mock("DELETE", LAB_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let deleted = resource
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "azurerm_lab_service_lab".to_string(),
                prior_state: state,
            },
        )
        .await;
    assert!(deleted.diagnostics.is_empty(), "{:?}", deleted.diagnostics);
    delete.assert_async().await;
}

#[tokio::test]
async fn lab_plan_replaces_when_network_is_added() {
    let provider = AzureRmProvider::new();

    let mut prior = lab_config();
    prior["location"] = json!("westeurope");

    let mut config = prior.clone();
    config["network"] = json!([{
        "subnet_id": "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.Network/virtualNetworks/vnet1/subnets/subnet1"
    }]);

    let prior_plan = provider
        .plan_resource_change(
            Context::new(),
            PlanResourceChangeRequest {
                type_name: "azurerm_lab_service_lab".to_string(),
                prior_state: DynamicValue::null(),
                config: DynamicValue::from_json(prior),
            },
        )
        .await;

    let plan = provider
        .plan_resource_change(
            Context::new(),
            PlanResourceChangeRequest {
                type_name: "azurerm_lab_service_lab".to_string(),
                prior_state: prior_plan.planned_state,
                config: DynamicValue::from_json(config),
            },
        )
        .await;

    assert!(!has_errors(&plan.diagnostics), "{:?}", plan.diagnostics);
    assert_eq!(plan.requires_replace, vec![AttributePath::new("network")]);
}

fn cache_body(policies: serde_json::Value) -> String {
    json!({
        "id": CACHE_PATH,
        "name": "cache1",
        "location": "westeurope",
        "properties": {
            "provisioningState": "Succeeded",
            "securitySettings": {"accessPolicies": policies}
        }
    })
    .to_string()
}

#[tokio::test]
async fn access_policy_is_added_to_the_cache() {
    let mut server = Server::new_async().await;
    let provider = provider(&server.url());

    let default_policy = json!({"name": "default", "accessRules": [{"scope": "default", "access": "rw"}]});
    let readonly_policy = json!({
        "name": "readonly",
        "accessRules": [{"scope": "default", "access": "ro", "anonymousUID": "0", "anonymousGID": "0"}]
    });

    let before = server
        .mock("GET", CACHE_PATH)
        .match_query(Matcher::Any)
        .with_body(cache_body(json!([default_policy.clone()])))
        .expect(1)
        .create_async()
        .await;
    let put = server
        .mock("PUT", CACHE_PATH)
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJson(json!({
            "properties": {
                "securitySettings": {
                    "accessPolicies": [
                        {"name": "default"},
                        {"name": "readonly", "accessRules": [{"scope": "default", "access": "ro"}]}
                    ]
                }
            }
        })))
        .with_body(cache_body(json!([default_policy.clone(), readonly_policy.clone()])))
        .expect(1)
        .create_async()
        .await;
    let _after = server
        .mock("GET", CACHE_PATH)
        .match_query(Matcher::Any)
        .with_body(cache_body(json!([default_policy, readonly_policy])))
        .create_async()
        .await;

    let config = json!({
        "name": "readonly",
        "hpc_cache_id": CACHE_PATH,
        "access_rule": [{"scope": "default", "access": "ro"}]
    });

    let resource = provider
        .create_resource("azurerm_hpc_cache_access_policy")
        .await
        .unwrap();
    let created = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "azurerm_hpc_cache_access_policy".to_string(),
                planned_state: DynamicValue::from_json(config.clone()),
                config: DynamicValue::from_json(config),
            },
        )
        .await;

    assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
    before.assert_async().await;
    put.assert_async().await;
    assert_eq!(
        created.new_state.get_string(&AttributePath::new("id")).unwrap(),
        format!("{}/cacheAccessPolicies/readonly", CACHE_PATH)
    );
    assert_eq!(
        created
            .new_state
            .get_string(&AttributePath::parse("access_rule.0.access"))
            .unwrap(),
        "ro"
    );
}

#[tokio::test]
async fn data_box_job_delete_removes_destination_locks() {
    let mut server = Server::new_async().await;
    let provider = provider(&server.url());

    let cancel = server
        .mock("POST", format!("{}/cancel", JOB_PATH).as_str())
        .match_query(Matcher::Any)
        .with_status(204)
        .expect(1)
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", JOB_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let first_lock = server
        .mock(
            "DELETE",
            format!(
                "{}/providers/Microsoft.Authorization/locks/DATABOX_SERVICE",
                ACCOUNT_1
            )
            .as_str(),
        )
        .match_query(Matcher::Any)
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let second_lock = server
        .mock(
            "DELETE",
            format!(
                "{}/providers/Microsoft.Authorization/locks/DATABOX_SERVICE",
                ACCOUNT_2
            )
            .as_str(),
        )
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"error":{"code":"LockNotFound","message":"gone"}}"#)
        .expect(1)
        .create_async()
        .await;

    let state = json!({
        "id": JOB_PATH,
        "name": "job1",
        "resource_group_name": "rg1",
        "location": "westus",
        "sku_name": "DataBox",
        "destination_storage_account": [
            {"storage_account_id": ACCOUNT_1},
            {"storage_account_id": ACCOUNT_2}
        ]
    });

    let resource = provider.create_resource("azurerm_data_box_job").await.unwrap();
    let deleted = resource
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "azurerm_data_box_job".to_string(),
                prior_state: DynamicValue::from_json(state),
            },
        )
        .await;

    assert!(deleted.diagnostics.is_empty(), "{:?}", deleted.diagnostics);
    cancel.assert_async().await;
    delete.assert_async().await;
    first_lock.assert_async().await;
    second_lock.assert_async().await;
}

#[tokio::test]
async fn lab_update_sends_remote_values_for_unchanged_blocks() {
    let mut server = Server::new_async().await;
    let provider = provider(&server.url());

    let _get = server
        .mock("GET", LAB_PATH)
        .match_query(Matcher::Any)
        .with_body(lab_body())
        .create_async()
        .await;
    let put = server
        .mock("PUT", LAB_PATH)
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJson(json!({
            "properties": {"connectionProfile": {"clientRdpAccess": "None"}}
        })))
        .with_body(lab_body())
        .expect(1)
        .create_async()
        .await;

    let mut state = lab_config();
    state["id"] = json!(LAB_PATH);
    let mut planned = state.clone();
    planned["tags"] = json!({"env": "test"});

    let resource = provider.create_resource("azurerm_lab_service_lab").await.unwrap();
    let updated = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: "azurerm_lab_service_lab".to_string(),
                prior_state: DynamicValue::from_json(state),
                planned_state: DynamicValue::from_json(planned.clone()),
                config: DynamicValue::from_json(planned),
            },
        )
        .await;

    assert!(updated.diagnostics.is_empty(), "{:?}", updated.diagnostics);
    put.assert_async().await;
}
