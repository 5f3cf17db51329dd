//! Terraform provider resources for Azure Resource Manager
//!
//! [`AzureRmProvider`] owns the provider configuration and maps resource type
//! names to their constructors. Planning runs the schema-driven steps from
//! [`plan`] before handing over to each resource's own plan modification.

pub mod api;
pub mod context;
pub mod error;
pub mod locks;
pub mod location;
pub mod plan;
pub mod provider_data;
pub mod resource;
pub mod resources;
pub mod schema;
pub mod types;
pub mod validate;
pub mod validator;

use serde::Deserialize;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use api::{build_http_client, ClientSecretCredential, RetryConfig};
use context::Context;
use error::{ProviderError, Result};
use locks::{InMemoryLockManager, LockManager};
use provider_data::AzureRmProviderData;
use resource::{
    AzureResource, ConfigureResourceRequest, ImportResourceStateRequest,
    ImportResourceStateResponse, ModifyPlanRequest, ResourceSchemaRequest,
    ValidateResourceConfigRequest,
};
use schema::Schema;
use types::{has_errors, AttributePath, Diagnostic, DynamicValue};

pub const DEFAULT_RESOURCE_MANAGER_ENDPOINT: &str = "https://management.azure.com";
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Resource types this provider serves
pub const RESOURCE_TYPES: &[&str] = &[
    "azurerm_data_box_job",
    "azurerm_hpc_cache",
    "azurerm_hpc_cache_access_policy",
    "azurerm_lab_service_lab",
];

fn new_resource(type_name: &str) -> Option<Box<dyn AzureResource>> {
    match type_name {
        "azurerm_data_box_job" => Some(Box::new(resources::DataBoxJobResource::new())),
        "azurerm_hpc_cache" => Some(Box::new(resources::HpcCacheResource::new())),
        "azurerm_hpc_cache_access_policy" => {
            Some(Box::new(resources::HpcCacheAccessPolicyResource::new()))
        }
        "azurerm_lab_service_lab" => Some(Box::new(resources::LabServiceLabResource::new())),
        _ => None,
    }
}

fn unknown_resource(type_name: &str) -> Diagnostic {
    Diagnostic::error(
        "Unknown resource type",
        format!("{} is not a resource type of this provider", type_name),
    )
}

/// Provider block as written in configuration. Unset values fall back to the
/// `ARM_*` environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub subscription_id: Option<String>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub resource_manager_endpoint: Option<String>,
    pub authority_host: Option<String>,
}

/// Provider configuration with every value resolved
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub subscription_id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub resource_manager_endpoint: String,
    pub authority_host: String,
}

fn config_or_env(value: Option<String>, env_var: &str) -> Option<String> {
    value
        .filter(|v| !v.is_empty())
        .or_else(|| std::env::var(env_var).ok().filter(|v| !v.is_empty()))
}

impl ProviderConfig {
    /// Apply environment fallbacks and defaults, reporting every missing
    /// required value
    pub fn resolve(self) -> std::result::Result<ResolvedConfig, Vec<Diagnostic>> {
        let mut diagnostics = vec![];
        let mut required = |value: Option<String>, name: &str, env_var: &str| {
            config_or_env(value, env_var).unwrap_or_else(|| {
                diagnostics.push(Diagnostic::error(
                    format!(
                        "{} is required (set in provider config or {} env var)",
                        name, env_var
                    ),
                    "",
                ));
                String::new()
            })
        };

        let subscription_id =
            required(self.subscription_id, "subscription_id", "ARM_SUBSCRIPTION_ID");
        let tenant_id = required(self.tenant_id, "tenant_id", "ARM_TENANT_ID");
        let client_id = required(self.client_id, "client_id", "ARM_CLIENT_ID");
        let client_secret = required(self.client_secret, "client_secret", "ARM_CLIENT_SECRET");

        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }

        Ok(ResolvedConfig {
            subscription_id,
            tenant_id,
            client_id,
            client_secret,
            resource_manager_endpoint: config_or_env(
                self.resource_manager_endpoint,
                "ARM_RESOURCE_MANAGER_ENDPOINT",
            )
            .unwrap_or_else(|| DEFAULT_RESOURCE_MANAGER_ENDPOINT.to_string()),
            authority_host: config_or_env(self.authority_host, "ARM_AUTHORITY_HOST")
                .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string()),
        })
    }
}

pub struct PlanResourceChangeRequest {
    pub type_name: String,
    pub prior_state: DynamicValue,
    /// Null when the resource is being destroyed
    pub config: DynamicValue,
}

pub struct PlanResourceChangeResponse {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct AzureRmProvider {
    data: Option<AzureRmProviderData>,
    locks: Arc<dyn LockManager>,
}

impl Default for AzureRmProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AzureRmProvider {
    pub fn new() -> Self {
        Self::with_lock_manager(Arc::new(InMemoryLockManager::new()))
    }

    /// Use a lock manager shared with something outside this provider
    pub fn with_lock_manager(locks: Arc<dyn LockManager>) -> Self {
        Self { data: None, locks }
    }

    /// A provider that is already configured, e.g. with a client pointing at
    /// a test server
    pub fn with_provider_data(data: AzureRmProviderData) -> Self {
        Self {
            locks: data.locks.clone(),
            data: Some(data),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.data.is_some()
    }

    pub async fn configure(&mut self, _ctx: Context, config: &DynamicValue) -> Vec<Diagnostic> {
        let config: ProviderConfig = if config.is_null() {
            ProviderConfig::default()
        } else {
            match config.decode() {
                Ok(config) => config,
                Err(e) => {
                    return vec![Diagnostic::error("Invalid provider configuration", e.to_string())]
                }
            }
        };

        let resolved = match config.resolve() {
            Ok(resolved) => resolved,
            Err(diagnostics) => return diagnostics,
        };

        match self.build_provider_data(&resolved) {
            Ok(data) => {
                tracing::debug!(
                    subscription_id = %resolved.subscription_id,
                    endpoint = %resolved.resource_manager_endpoint,
                    "configured provider"
                );
                self.data = Some(data);
                vec![]
            }
            Err(e) => vec![Diagnostic::error("Failed to create API client", e.to_string())],
        }
    }

    fn build_provider_data(&self, config: &ResolvedConfig) -> Result<AzureRmProviderData> {
        let retry = RetryConfig::default();
        let token_http = build_http_client(Duration::from_secs(retry.timeout_seconds))
            .map_err(|e| ProviderError::InvalidConfiguration(e.to_string()))?;
        let credential = ClientSecretCredential::new(
            token_http,
            &config.authority_host,
            &config.tenant_id,
            &config.client_id,
            &config.client_secret,
            &config.resource_manager_endpoint,
        );
        let client = api::Client::new(&config.resource_manager_endpoint, Arc::new(credential))
            .map_err(|e| ProviderError::InvalidConfiguration(e.to_string()))?;

        Ok(AzureRmProviderData::new(
            client,
            self.locks.clone(),
            config.subscription_id.clone(),
        ))
    }

    /// A configured resource ready for CRUD operations
    pub async fn create_resource(&self, type_name: &str) -> Result<Box<dyn AzureResource>> {
        let data = self.data.as_ref().ok_or(ProviderError::ProviderNotConfigured)?;
        let mut resource = new_resource(type_name)
            .ok_or_else(|| ProviderError::Custom(format!("Unknown resource: {}", type_name)))?;

        let provider_data: Arc<dyn Any + Send + Sync> = Arc::new(data.clone());
        let response = resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(provider_data),
                },
            )
            .await;

        match response.diagnostics.into_iter().find(Diagnostic::is_error) {
            Some(diag) => Err(ProviderError::Custom(format!("{}: {}", diag.summary, diag.detail))),
            None => Ok(resource),
        }
    }

    pub async fn resource_schemas(&self) -> HashMap<String, Schema> {
        let mut schemas = HashMap::new();
        for type_name in RESOURCE_TYPES {
            if let Some(resource) = new_resource(type_name) {
                let response = resource.schema(Context::new(), ResourceSchemaRequest).await;
                schemas.insert(type_name.to_string(), response.schema);
            }
        }
        schemas
    }

    /// Schema validation followed by the resource's own cross-field checks
    pub async fn validate_resource_config(
        &self,
        ctx: Context,
        type_name: &str,
        config: &DynamicValue,
    ) -> Vec<Diagnostic> {
        let Some(resource) = new_resource(type_name) else {
            return vec![unknown_resource(type_name)];
        };

        let schema = resource.schema(ctx.clone(), ResourceSchemaRequest).await.schema;
        let config = plan::apply_defaults(&schema, config);
        let mut diagnostics = plan::validate_config(&schema, &config);
        if has_errors(&diagnostics) {
            return diagnostics;
        }

        let response = resource
            .validate(
                ctx,
                ValidateResourceConfigRequest {
                    type_name: type_name.to_string(),
                    config,
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);
        diagnostics
    }

    /// Work out the planned state and the paths that force a replacement
    pub async fn plan_resource_change(
        &self,
        ctx: Context,
        request: PlanResourceChangeRequest,
    ) -> PlanResourceChangeResponse {
        let Some(resource) = new_resource(&request.type_name) else {
            return PlanResourceChangeResponse {
                planned_state: request.config,
                requires_replace: vec![],
                diagnostics: vec![unknown_resource(&request.type_name)],
            };
        };

        if request.config.is_null() {
            return PlanResourceChangeResponse {
                planned_state: DynamicValue::null(),
                requires_replace: vec![],
                diagnostics: vec![],
            };
        }

        let mut diagnostics = self
            .validate_resource_config(ctx.clone(), &request.type_name, &request.config)
            .await;
        if has_errors(&diagnostics) {
            return PlanResourceChangeResponse {
                planned_state: request.config,
                requires_replace: vec![],
                diagnostics,
            };
        }

        let schema = resource.schema(ctx.clone(), ResourceSchemaRequest).await.schema;
        let mut planned = plan::apply_defaults(&schema, &request.config);
        plan::use_state_for_computed(&schema, &request.prior_state, &mut planned);

        let modified = resource
            .modify_plan(
                ctx,
                ModifyPlanRequest {
                    type_name: request.type_name.clone(),
                    config: request.config,
                    prior_state: request.prior_state.clone(),
                    proposed_new_state: planned,
                },
            )
            .await;
        diagnostics.extend(modified.diagnostics);

        let mut requires_replace =
            plan::requires_replace(&schema, &request.prior_state, &modified.planned_state);
        for path in modified.requires_replace {
            if !requires_replace.contains(&path) {
                requires_replace.push(path);
            }
        }

        PlanResourceChangeResponse {
            planned_state: modified.planned_state,
            requires_replace,
            diagnostics,
        }
    }

    pub async fn import_resource_state(
        &self,
        ctx: Context,
        type_name: &str,
        id: &str,
    ) -> ImportResourceStateResponse {
        let Some(resource) = new_resource(type_name) else {
            return ImportResourceStateResponse {
                imported_resources: vec![],
                diagnostics: vec![unknown_resource(type_name)],
            };
        };

        resource
            .import_state(
                ctx,
                ImportResourceStateRequest {
                    type_name: type_name.to_string(),
                    id: id.to_string(),
                },
            )
            .await
    }
}
