//! HPC cache access policy resource implementation

use armid::{CacheAccessPolicyId, CacheId, ResourceId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::{
    access_rule_block, delete_access_policy_by_name, expand_access_rules, flatten_access_rules,
    get_access_policy_by_name, insert_or_update_access_policy, set_access_policies,
    AccessRuleModel,
};
use crate::api::storage_cache::{Cache, NfsAccessPolicy};
use crate::context::Context;
use crate::error::{ApiResultExt, ProviderError, Result};
use crate::provider_data::AzureRmProviderData;
use crate::resource::{
    provider_data_from, ConfigureResourceRequest, ConfigureResourceResponse,
    CreateResourceRequest, CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource,
    ReadResourceRequest, ReadResourceResponse, Resource, ResourceSchemaRequest,
    ResourceSchemaResponse, ResourceTimeouts, ResourceWithConfigure, ResourceWithImportState,
    ResourceWithModifyPlan, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use crate::resources::{encode_state, error_diagnostic, invalid_import_id, not_configured};
use crate::schema::{id_attribute, AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use crate::validate::storage_cache as validate;
use crate::validator::FuncValidator;

const RESOURCE_TYPE: &str = "azurerm_hpc_cache_access_policy";

const TIMEOUTS: ResourceTimeouts = ResourceTimeouts::uniform_minutes(30);

const IMPORT_EXAMPLE: &str =
    "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/group1/providers/Microsoft.StorageCache/caches/cache1/cacheAccessPolicies/policy1";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HpcCacheAccessPolicyModel {
    pub id: Option<String>,
    pub name: String,
    pub hpc_cache_id: String,
    pub access_rule: Vec<AccessRuleModel>,
}

impl HpcCacheAccessPolicyModel {
    fn policy_id(&self) -> Result<CacheAccessPolicyId> {
        let id = self
            .id
            .as_deref()
            .ok_or_else(|| ProviderError::Custom("state has no `id`".to_string()))?;
        Ok(CacheAccessPolicyId::parse(id)?)
    }

    fn expand(&self) -> NfsAccessPolicy {
        NfsAccessPolicy {
            name: self.name.clone(),
            access_rules: expand_access_rules(&self.access_rule),
        }
    }

    fn flatten(id: &CacheAccessPolicyId, policy: &NfsAccessPolicy) -> Result<Self> {
        Ok(Self {
            id: Some(id.id()),
            name: id.access_policy_name.clone(),
            hpc_cache_id: id.cache_id().id(),
            access_rule: flatten_access_rules(&policy.access_rules)?,
        })
    }
}

fn schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a named NFS access policy of an HPC cache")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .force_new()
                    .validator(Box::new(FuncValidator::new(
                        validate::cache_access_policy_name,
                        "access policy name",
                    )))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("hpc_cache_id", AttributeType::String)
                    .required()
                    .force_new()
                    .validator(Box::new(FuncValidator::new(
                        armid::id::validate_resource_id::<CacheId>,
                        "HPC cache ID",
                    )))
                    .build(),
            )
            .block(access_rule_block())
            .build()
    })
}

#[derive(Default)]
pub struct HpcCacheAccessPolicyResource {
    provider_data: Option<AzureRmProviderData>,
}

impl HpcCacheAccessPolicyResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the cache back with `policies` and wait for it to settle
    async fn put_policies(
        ctx: &Context,
        data: &AzureRmProviderData,
        cache_id: &CacheId,
        mut cache: Cache,
        policies: Vec<NfsAccessPolicy>,
    ) -> Result<()> {
        set_access_policies(&mut cache, policies);
        data.client
            .storage_cache()
            .create_or_update_then_poll(ctx, cache_id, &cache)
            .await
            .context(|| format!("updating access policies of {}", cache_id))
    }

    async fn upsert(
        ctx: &Context,
        data: &AzureRmProviderData,
        id: &CacheAccessPolicyId,
        model: &HpcCacheAccessPolicyModel,
        is_new: bool,
    ) -> Result<HpcCacheAccessPolicyModel> {
        let cache_id = id.cache_id();
        let _lock = data.locks.lock(&cache_id.id()).await;

        let cache = data
            .client
            .storage_cache()
            .get(&cache_id)
            .await
            .context(|| format!("retrieving {}", cache_id))?;

        if is_new
            && get_access_policy_by_name(cache.access_policies(), &id.access_policy_name).is_some()
        {
            return Err(ProviderError::requires_import(RESOURCE_TYPE, id.id()));
        }

        let policies =
            insert_or_update_access_policy(cache.access_policies().to_vec(), model.expand())?;
        Self::put_policies(ctx, data, &cache_id, cache, policies).await?;

        Self::read_policy(data, id)
            .await?
            .ok_or_else(|| {
                ProviderError::Custom(format!("{} was not found after it was written", id))
            })
    }

    /// `None` when either the cache or the policy no longer exists
    async fn read_policy(
        data: &AzureRmProviderData,
        id: &CacheAccessPolicyId,
    ) -> Result<Option<HpcCacheAccessPolicyModel>> {
        let cache_id = id.cache_id();
        let cache = match data.client.storage_cache().get(&cache_id).await {
            Ok(cache) => cache,
            Err(e) if e.is_not_found() => {
                tracing::info!("{} was not found - removing {} from state", cache_id, id);
                return Ok(None);
            }
            Err(source) => {
                return Err(ProviderError::Api {
                    context: format!("retrieving {}", cache_id),
                    source,
                })
            }
        };

        match get_access_policy_by_name(cache.access_policies(), &id.access_policy_name) {
            Some(policy) => HpcCacheAccessPolicyModel::flatten(id, policy).map(Some),
            None => {
                tracing::info!("{} was not found - removing from state", id);
                Ok(None)
            }
        }
    }

    async fn remove(
        ctx: &Context,
        data: &AzureRmProviderData,
        id: &CacheAccessPolicyId,
    ) -> Result<()> {
        let cache_id = id.cache_id();
        let _lock = data.locks.lock(&cache_id.id()).await;

        let cache = match data.client.storage_cache().get(&cache_id).await {
            Ok(cache) => cache,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(source) => {
                return Err(ProviderError::Api {
                    context: format!("retrieving {}", cache_id),
                    source,
                })
            }
        };

        if get_access_policy_by_name(cache.access_policies(), &id.access_policy_name).is_none() {
            return Ok(());
        }

        let policies =
            delete_access_policy_by_name(cache.access_policies().to_vec(), &id.access_policy_name);
        Self::put_policies(ctx, data, &cache_id, cache, policies).await
    }
}

#[async_trait]
impl Resource for HpcCacheAccessPolicyResource {
    fn type_name(&self) -> &str {
        RESOURCE_TYPE
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: schema().clone(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let Some(data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics,
            };
        };

        let ctx = ctx.with_timeout(TIMEOUTS.create);
        let result = async {
            let model: HpcCacheAccessPolicyModel = request.planned_state.decode()?;
            let cache_id = CacheId::parse(&model.hpc_cache_id)?;
            let id = CacheAccessPolicyId::new(&cache_id, &model.name);
            Self::upsert(&ctx, data, &id, &model, true).await
        }
        .await;

        match result
            .map_err(|e| error_diagnostic("Failed to create HPC cache access policy", &e))
            .and_then(|model| encode_state(&model))
        {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics,
            },
            Err(diag) => {
                diagnostics.push(diag);
                CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                }
            }
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = vec![];

        let Some(data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
            };
        };

        let result = async {
            let model: HpcCacheAccessPolicyModel = request.current_state.decode()?;
            Self::read_policy(data, &model.policy_id()?).await
        }
        .await;

        let result = result
            .map_err(|e| error_diagnostic("Failed to read HPC cache access policy", &e))
            .and_then(|model| model.as_ref().map(encode_state).transpose());

        match result {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics,
            },
            Err(diag) => {
                diagnostics.push(diag);
                ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                }
            }
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut diagnostics = vec![];

        let Some(data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        };

        let ctx = ctx.with_timeout(TIMEOUTS.update);
        let result = async {
            let prior: HpcCacheAccessPolicyModel = request.prior_state.decode()?;
            let planned: HpcCacheAccessPolicyModel = request.planned_state.decode()?;
            Self::upsert(&ctx, data, &prior.policy_id()?, &planned, false).await
        }
        .await;

        match result
            .map_err(|e| error_diagnostic("Failed to update HPC cache access policy", &e))
            .and_then(|model| encode_state(&model))
        {
            Ok(new_state) => UpdateResourceResponse {
                new_state,
                diagnostics,
            },
            Err(diag) => {
                diagnostics.push(diag);
                UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                }
            }
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let Some(data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return DeleteResourceResponse { diagnostics };
        };

        let ctx = ctx.with_timeout(TIMEOUTS.delete);
        let result = async {
            let model: HpcCacheAccessPolicyModel = request.prior_state.decode()?;
            Self::remove(&ctx, data, &model.policy_id()?).await
        }
        .await;

        if let Err(e) = result {
            diagnostics.push(error_diagnostic("Failed to delete HPC cache access policy", &e));
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for HpcCacheAccessPolicyResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        match provider_data_from(request) {
            Ok(data) => self.provider_data = Some(data),
            Err(diag) => diagnostics.push(diag),
        }

        ConfigureResourceResponse { diagnostics }
    }
}

impl ResourceWithModifyPlan for HpcCacheAccessPolicyResource {}

#[async_trait]
impl ResourceWithImportState for HpcCacheAccessPolicyResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let id = match CacheAccessPolicyId::parse_insensitively(&request.id) {
            Ok(id) => id,
            Err(e) => {
                return ImportResourceStateResponse {
                    imported_resources: vec![],
                    diagnostics: vec![invalid_import_id(&e, IMPORT_EXAMPLE)],
                }
            }
        };

        let model = HpcCacheAccessPolicyModel {
            id: Some(id.id()),
            name: id.access_policy_name.clone(),
            hpc_cache_id: id.cache_id().id(),
            access_rule: vec![],
        };

        match encode_state(&model) {
            Ok(state) => ImportResourceStateResponse {
                imported_resources: vec![ImportedResource {
                    type_name: RESOURCE_TYPE.to_string(),
                    state,
                }],
                diagnostics: vec![],
            },
            Err(diag) => ImportResourceStateResponse {
                imported_resources: vec![],
                diagnostics: vec![diag],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use crate::locks::InMemoryLockManager;
    use crate::types::{AttributePath, DynamicValue};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::sync::Arc;

    const CACHE_PATH: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.StorageCache/caches/cache1";

    fn configured(server_url: &str) -> HpcCacheAccessPolicyResource {
        HpcCacheAccessPolicyResource {
            provider_data: Some(AzureRmProviderData::new(
                create_test_client(server_url),
                Arc::new(InMemoryLockManager::new()),
                "00000000-0000-0000-0000-000000000000",
            )),
        }
    }

    fn state() -> DynamicValue {
        DynamicValue::from_model(&HpcCacheAccessPolicyModel {
            id: Some(format!("{}/cacheAccessPolicies/readonly", CACHE_PATH)),
            name: "readonly".to_string(),
            hpc_cache_id: CACHE_PATH.to_string(),
            access_rule: vec![AccessRuleModel {
                scope: "default".to_string(),
                access: "ro".to_string(),
                ..Default::default()
            }],
        })
        .unwrap()
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

    #[test]
    fn schema_rejects_default_name() {
        let name = schema().block.attribute("name").unwrap();
        assert!(name.force_new);
        let mut diagnostics = vec![];
        for validator in &name.validators {
            validator.validate(
                &crate::types::Dynamic::String("default".to_string()),
                &AttributePath::new("name"),
                &mut diagnostics,
            );
        }
        assert_eq!(diagnostics.len(), 1);
    }

    #[tokio::test]
    async fn read_drops_state_when_policy_is_gone() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", CACHE_PATH)
            .match_query(Matcher::Any)
            .with_body(cache_body(json!([
                {"name": "default", "accessRules": [{"scope": "default", "access": "rw"}]}
            ])))
            .create_async()
            .await;

        let response = configured(&server.url())
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    current_state: state(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(response.new_state.is_none());
    }

    #[tokio::test]
    async fn read_drops_state_when_cache_is_gone() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", CACHE_PATH)
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error":{"code":"NotFound","message":"gone"}}"#)
            .create_async()
            .await;

        let response = configured(&server.url())
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    current_state: state(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(response.new_state.is_none());
    }

    #[tokio::test]
    async fn create_refuses_existing_policy() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", CACHE_PATH)
            .match_query(Matcher::Any)
            .with_body(cache_body(json!([
                {"name": "readonly", "accessRules": [{"scope": "default", "access": "ro"}]}
            ])))
            .create_async()
            .await;
        let put = server
            .mock("PUT", CACHE_PATH)
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let response = configured(&server.url())
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    planned_state: state(),
                    config: DynamicValue::null(),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].detail.contains("needs to be imported"));
        put.assert_async().await;
    }

    #[tokio::test]
    async fn delete_writes_cache_without_the_policy() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", CACHE_PATH)
            .match_query(Matcher::Any)
            .with_body(cache_body(json!([
                {"name": "default", "accessRules": [{"scope": "default", "access": "rw"}]},
                {"name": "readonly", "accessRules": [{"scope": "default", "access": "ro"}]}
            ])))
            .create_async()
            .await;
        let put = server
            .mock("PUT", CACHE_PATH)
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(json!({
                "properties": {"securitySettings": {"accessPolicies": [{"name": "default"}]}}
            })))
            .with_body(cache_body(json!([
                {"name": "default", "accessRules": [{"scope": "default", "access": "rw"}]}
            ])))
            .expect(1)
            .create_async()
            .await;

        let response = configured(&server.url())
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    prior_state: state(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        put.assert_async().await;
    }

    fn policy_state(name: &str, access: &str) -> DynamicValue {
        DynamicValue::from_model(&HpcCacheAccessPolicyModel {
            id: None,
            name: name.to_string(),
            hpc_cache_id: CACHE_PATH.to_string(),
            access_rule: vec![AccessRuleModel {
                scope: "default".to_string(),
                access: access.to_string(),
                ..Default::default()
            }],
        })
        .unwrap()
    }

    #[tokio::test]
    async fn concurrent_creates_on_one_cache_keep_both_policies() {
        let mut server = Server::new_async().await;
        let stored = Arc::new(std::sync::Mutex::new(
            serde_json::from_str::<serde_json::Value>(&cache_body(json!([
                {"name": "default", "accessRules": [{"scope": "default", "access": "rw"}]}
            ])))
            .unwrap(),
        ));
        let puts = Arc::new(std::sync::Mutex::new(Vec::<serde_json::Value>::new()));

        let _get = {
            let stored = stored.clone();
            server
                .mock("GET", CACHE_PATH)
                .match_query(Matcher::Any)
                .with_body_from_request(move |_| stored.lock().unwrap().to_string().into_bytes())
                .create_async()
                .await
        };
        let _put = {
            let stored = stored.clone();
            let puts = puts.clone();
            server
                .mock("PUT", CACHE_PATH)
                .match_query(Matcher::Any)
                .with_body_from_request(move |request| {
                    let body: serde_json::Value =
                        serde_json::from_slice(request.body().unwrap()).unwrap();
                    let mut cache = stored.lock().unwrap();
                    cache["properties"]["securitySettings"] =
                        body["properties"]["securitySettings"].clone();
                    puts.lock().unwrap().push(body);
                    cache.to_string().into_bytes()
                })
                .create_async()
                .await
        };

        let resource = configured(&server.url());
        let create = |name: &'static str, access: &'static str| {
            resource.create(
                Context::new(),
                CreateResourceRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    planned_state: policy_state(name, access),
                    config: DynamicValue::null(),
                },
            )
        };
        let responses =
            futures::future::join_all([create("readonly", "ro"), create("writers", "rw")]).await;

        for response in &responses {
            assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        }

        let puts = puts.lock().unwrap();
        assert_eq!(puts.len(), 2);
        let mut names: Vec<String> = puts[1]["properties"]["securitySettings"]["accessPolicies"]
            .as_array()
            .unwrap()
            .iter()
            .map(|policy| policy["name"].as_str().unwrap().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["default", "readonly", "writers"]);
    }

    #[tokio::test]
    async fn import_derives_cache_id() {
        let response = HpcCacheAccessPolicyResource::new()
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    id: format!("{}/cacheAccessPolicies/readonly", CACHE_PATH),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let state = &response.imported_resources[0].state;
        assert_eq!(
            state.get_string(&AttributePath::new("hpc_cache_id")).unwrap(),
            CACHE_PATH
        );
    }
}
