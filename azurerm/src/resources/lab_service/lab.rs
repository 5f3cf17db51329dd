//! Lab Services lab resource implementation
//!
//! The service never returns passwords, so state keeps the configured
//! values. Updates fetch the current lab and overlay only the blocks that
//! changed in the plan.

use armid::{LabId, LabPlanId, ResourceId, SubnetId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::api::lab_services::{
    AutoShutdownProfile, ConnectionProfile, Credentials, ImageReference, Lab, LabNetworkProfile,
    LabProperties, LabSku, RosterProfile, SecurityProfile, VirtualMachineAdditionalCapabilities,
    VirtualMachineProfile,
};
use crate::context::Context;
use crate::error::{ApiResultExt, ProviderError, Result};
use crate::location;
use crate::provider_data::AzureRmProviderData;
use crate::resource::{
    provider_data_from, ConfigureResourceRequest, ConfigureResourceResponse,
    CreateResourceRequest, CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource, ModifyPlanRequest,
    ModifyPlanResponse, ReadResourceRequest, ReadResourceResponse, Resource,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceTimeouts, ResourceWithConfigure,
    ResourceWithImportState, ResourceWithModifyPlan, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use crate::resources::{encode_state, error_diagnostic, invalid_import_id, not_configured};
use crate::schema::{
    id_attribute, location_attribute, resource_group_name_attribute, tags_attribute,
    AttributeBuilder, AttributeType, NestedBlockBuilder, NestingMode, Schema, SchemaBuilder,
};
use crate::types::{AttributePath, Dynamic, DynamicValue};
use crate::validate::lab_service as validate;
use crate::validator::{
    FuncValidator, NumberRangeValidator, StringInSliceValidator, StringNotEmptyValidator,
    UrlHttpValidator, UuidValidator,
};

const RESOURCE_TYPE: &str = "azurerm_lab_service_lab";

const TIMEOUTS: ResourceTimeouts = ResourceTimeouts::uniform_minutes(90);

const ENABLED: &str = "Enabled";
const DISABLED: &str = "Disabled";
const CONNECTION_NONE: &str = "None";
const SHUTDOWN_ON_IDLE_NONE: &str = "None";

const IMPORT_EXAMPLE: &str =
    "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/group1/providers/Microsoft.LabServices/labs/lab1";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabServiceLabModel {
    pub id: Option<String>,
    pub name: String,
    pub resource_group_name: String,
    pub location: String,
    pub title: String,
    pub description: Option<String>,
    pub lab_plan_id: Option<String>,
    pub security: Vec<SecurityModel>,
    pub virtual_machine: Vec<VirtualMachineModel>,
    pub auto_shutdown: Vec<AutoShutdownModel>,
    pub connection_setting: Vec<ConnectionSettingModel>,
    pub network: Vec<NetworkModel>,
    pub roster: Vec<RosterModel>,
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityModel {
    pub open_access_enabled: bool,
    pub registration_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualMachineModel {
    pub admin_user: Vec<CredentialModel>,
    pub image_reference: Vec<ImageReferenceModel>,
    pub sku: Vec<SkuModel>,
    pub usage_quota: String,
    pub additional_capability_gpu_drivers_installed: bool,
    pub create_option: String,
    pub non_admin_user: Vec<CredentialModel>,
    pub shared_password_enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialModel {
    pub username: String,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageReferenceModel {
    pub id: Option<String>,
    pub offer: Option<String>,
    pub publisher: Option<String>,
    pub sku: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkuModel {
    pub name: String,
    pub capacity: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoShutdownModel {
    pub disconnect_delay: Option<String>,
    pub idle_delay: Option<String>,
    pub no_connect_delay: Option<String>,
    pub shutdown_on_idle: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettingModel {
    pub client_rdp_access: Option<String>,
    pub client_ssh_access: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkModel {
    pub subnet_id: Option<String>,
    pub load_balancer_id: Option<String>,
    pub public_ip_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterModel {
    pub active_directory_group_id: Option<String>,
    pub lms_instance: Option<String>,
    pub lti_client_id: Option<String>,
    pub lti_context_id: Option<String>,
    pub lti_roster_endpoint: Option<String>,
}

fn enable_state(enabled: bool) -> Option<String> {
    Some(if enabled { ENABLED } else { DISABLED }.to_string())
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.is_empty())
}

/// Turning a shutdown rule on is implied by setting its delay
fn expand_auto_shutdown(input: &[AutoShutdownModel]) -> AutoShutdownProfile {
    let Some(config) = input.first() else {
        return AutoShutdownProfile {
            shutdown_on_disconnect: Some(DISABLED.to_string()),
            shutdown_when_not_connected: Some(DISABLED.to_string()),
            shutdown_on_idle: Some(SHUTDOWN_ON_IDLE_NONE.to_string()),
            ..Default::default()
        };
    };

    let disconnect_delay = non_empty(&config.disconnect_delay);
    let no_connect_delay = non_empty(&config.no_connect_delay);
    AutoShutdownProfile {
        shutdown_on_disconnect: enable_state(disconnect_delay.is_some()),
        disconnect_delay,
        shutdown_when_not_connected: enable_state(no_connect_delay.is_some()),
        no_connect_delay,
        idle_delay: non_empty(&config.idle_delay),
        shutdown_on_idle: Some(
            non_empty(&config.shutdown_on_idle)
                .unwrap_or_else(|| SHUTDOWN_ON_IDLE_NONE.to_string()),
        ),
    }
}

fn flatten_auto_shutdown(input: &AutoShutdownProfile) -> Vec<AutoShutdownModel> {
    let enabled = |v: &Option<String>| v.as_deref().is_some_and(|s| s != DISABLED);
    let idle_mode = input
        .shutdown_on_idle
        .clone()
        .filter(|mode| mode != SHUTDOWN_ON_IDLE_NONE);

    if !enabled(&input.shutdown_on_disconnect)
        && !enabled(&input.shutdown_when_not_connected)
        && idle_mode.is_none()
        && input.idle_delay.is_none()
    {
        return Vec::new();
    }

    vec![AutoShutdownModel {
        disconnect_delay: input.disconnect_delay.clone(),
        idle_delay: input.idle_delay.clone(),
        no_connect_delay: input.no_connect_delay.clone(),
        shutdown_on_idle: idle_mode,
    }]
}

/// Web access is not configurable and always off
fn expand_connection(input: &[ConnectionSettingModel]) -> ConnectionProfile {
    let access = |v: Option<&Option<String>>| {
        Some(
            v.and_then(non_empty)
                .unwrap_or_else(|| CONNECTION_NONE.to_string()),
        )
    };
    let config = input.first();
    ConnectionProfile {
        client_rdp_access: access(config.map(|c| &c.client_rdp_access)),
        client_ssh_access: access(config.map(|c| &c.client_ssh_access)),
        web_rdp_access: Some(CONNECTION_NONE.to_string()),
        web_ssh_access: Some(CONNECTION_NONE.to_string()),
    }
}

fn flatten_connection(input: &ConnectionProfile) -> Vec<ConnectionSettingModel> {
    let configured = |v: &Option<String>| v.clone().filter(|s| s != CONNECTION_NONE);
    let rdp = configured(&input.client_rdp_access);
    let ssh = configured(&input.client_ssh_access);
    if rdp.is_none() && ssh.is_none() {
        return Vec::new();
    }
    vec![ConnectionSettingModel {
        client_rdp_access: rdp,
        client_ssh_access: ssh,
    }]
}

fn expand_security(input: &[SecurityModel]) -> SecurityProfile {
    SecurityProfile {
        open_access: input.first().and_then(|s| enable_state(s.open_access_enabled)),
        registration_code: None,
    }
}

fn flatten_security(input: &SecurityProfile) -> Vec<SecurityModel> {
    vec![SecurityModel {
        open_access_enabled: input.open_access.as_deref() == Some(ENABLED),
        registration_code: input.registration_code.clone(),
    }]
}

/// Passwords are only sent on create; the service rejects them on update
fn expand_credential(input: &[CredentialModel], is_update: bool) -> Option<Credentials> {
    input.first().map(|c| Credentials {
        username: c.username.clone(),
        password: if is_update { None } else { non_empty(&c.password) },
    })
}

fn expand_virtual_machine(input: &[VirtualMachineModel], is_update: bool) -> VirtualMachineProfile {
    let Some(vm) = input.first() else {
        return VirtualMachineProfile::default();
    };

    let image = vm.image_reference.first().cloned().unwrap_or_default();
    VirtualMachineProfile {
        admin_user: expand_credential(&vm.admin_user, is_update).unwrap_or_default(),
        non_admin_user: expand_credential(&vm.non_admin_user, is_update),
        create_option: vm.create_option.clone(),
        image_reference: ImageReference {
            id: non_empty(&image.id),
            offer: non_empty(&image.offer),
            publisher: non_empty(&image.publisher),
            sku: non_empty(&image.sku),
            version: non_empty(&image.version),
        },
        sku: vm
            .sku
            .first()
            .map(|s| LabSku {
                name: s.name.clone(),
                capacity: Some(s.capacity),
            })
            .unwrap_or_default(),
        usage_quota: vm.usage_quota.clone(),
        use_shared_password: enable_state(vm.shared_password_enabled),
        additional_capabilities: Some(VirtualMachineAdditionalCapabilities {
            install_gpu_drivers: enable_state(vm.additional_capability_gpu_drivers_installed),
        }),
    }
}

fn flatten_virtual_machine(
    input: &VirtualMachineProfile,
    prior: Option<&VirtualMachineModel>,
) -> Vec<VirtualMachineModel> {
    let password = |users: Option<&Vec<CredentialModel>>| {
        users
            .and_then(|u| u.first())
            .and_then(|u| u.password.clone())
    };
    let admin_password = password(prior.map(|vm| &vm.admin_user));
    let non_admin_password = password(prior.map(|vm| &vm.non_admin_user));

    let image = &input.image_reference;
    vec![VirtualMachineModel {
        admin_user: vec![CredentialModel {
            username: input.admin_user.username.clone(),
            password: admin_password,
        }],
        non_admin_user: input
            .non_admin_user
            .iter()
            .map(|u| CredentialModel {
                username: u.username.clone(),
                password: non_admin_password.clone(),
            })
            .collect(),
        image_reference: vec![ImageReferenceModel {
            id: image.id.clone(),
            offer: image.offer.clone(),
            publisher: image.publisher.clone(),
            sku: image.sku.clone(),
            version: image.version.clone(),
        }],
        sku: vec![SkuModel {
            name: input.sku.name.clone(),
            capacity: input.sku.capacity.unwrap_or_default(),
        }],
        usage_quota: input.usage_quota.clone(),
        create_option: input.create_option.clone(),
        additional_capability_gpu_drivers_installed: input
            .additional_capabilities
            .as_ref()
            .and_then(|c| c.install_gpu_drivers.as_deref())
            == Some(ENABLED),
        shared_password_enabled: input.use_shared_password.as_deref() == Some(ENABLED),
    }]
}

/// Load balancer and public IP are assigned by the service and survive
/// updates of the subnet block
fn expand_network(
    input: &[NetworkModel],
    existing: Option<&LabNetworkProfile>,
) -> Option<LabNetworkProfile> {
    let network = input.first()?;
    let mut result = LabNetworkProfile::default();
    if let Some(subnet_id) = non_empty(&network.subnet_id) {
        result.subnet_id = Some(subnet_id);
        if let Some(existing) = existing {
            result.load_balancer_id = existing.load_balancer_id.clone();
            result.public_ip_id = existing.public_ip_id.clone();
        }
    }
    Some(result)
}

fn flatten_network(input: Option<&LabNetworkProfile>) -> Vec<NetworkModel> {
    input
        .map(|n| NetworkModel {
            subnet_id: n.subnet_id.clone(),
            load_balancer_id: n.load_balancer_id.clone(),
            public_ip_id: n.public_ip_id.clone(),
        })
        .into_iter()
        .collect()
}

fn expand_roster(input: &[RosterModel]) -> Option<RosterProfile> {
    input.first().map(|r| RosterProfile {
        active_directory_group_id: non_empty(&r.active_directory_group_id),
        lms_instance: non_empty(&r.lms_instance),
        lti_client_id: non_empty(&r.lti_client_id),
        lti_context_id: non_empty(&r.lti_context_id),
        lti_roster_endpoint: non_empty(&r.lti_roster_endpoint),
    })
}

fn flatten_roster(input: Option<&RosterProfile>) -> Vec<RosterModel> {
    input
        .map(|r| RosterModel {
            active_directory_group_id: r.active_directory_group_id.clone(),
            lms_instance: r.lms_instance.clone(),
            lti_client_id: r.lti_client_id.clone(),
            lti_context_id: r.lti_context_id.clone(),
            lti_roster_endpoint: r.lti_roster_endpoint.clone(),
        })
        .into_iter()
        .collect()
}

impl LabServiceLabModel {
    fn lab_id(&self) -> Result<LabId> {
        let id = self
            .id
            .as_deref()
            .ok_or_else(|| ProviderError::Custom("state has no `id`".to_string()))?;
        Ok(LabId::parse(id)?)
    }

    fn expand(&self) -> Lab {
        Lab {
            id: None,
            name: None,
            location: location::normalize(&self.location),
            tags: self.tags.clone(),
            properties: LabProperties {
                auto_shutdown_profile: expand_auto_shutdown(&self.auto_shutdown),
                connection_profile: expand_connection(&self.connection_setting),
                security_profile: expand_security(&self.security),
                virtual_machine_profile: expand_virtual_machine(&self.virtual_machine, false),
                title: Some(self.title.clone()),
                description: non_empty(&self.description),
                lab_plan_id: non_empty(&self.lab_plan_id),
                network_profile: expand_network(&self.network, None),
                roster_profile: expand_roster(&self.roster),
                provisioning_state: None,
            },
        }
    }

    /// Overlay the blocks that differ between the two plan snapshots
    fn apply_changes(&self, lab: &mut Lab, prior: &DynamicValue, planned: &DynamicValue) {
        let changed =
            |name: &str| DynamicValue::has_change(prior, planned, &AttributePath::new(name));
        let props = &mut lab.properties;

        if changed("auto_shutdown") {
            props.auto_shutdown_profile = expand_auto_shutdown(&self.auto_shutdown);
        }
        if changed("connection_setting") {
            props.connection_profile = expand_connection(&self.connection_setting);
        }
        if changed("security") {
            props.security_profile = expand_security(&self.security);
        }
        if changed("title") {
            props.title = Some(self.title.clone());
        }
        if changed("virtual_machine") {
            props.virtual_machine_profile = expand_virtual_machine(&self.virtual_machine, true);
        }
        if changed("network") {
            props.network_profile = expand_network(&self.network, props.network_profile.as_ref());
        }
        if changed("roster") {
            props.roster_profile = expand_roster(&self.roster);
        }
        if changed("description") {
            props.description = self.description.clone();
        }
        if changed("lab_plan_id") {
            props.lab_plan_id = non_empty(&self.lab_plan_id);
        }
        if changed("tags") {
            lab.tags = self.tags.clone();
        }
    }

    fn flatten(id: &LabId, lab: &Lab, prior: &LabServiceLabModel) -> Self {
        let props = &lab.properties;
        Self {
            id: Some(id.id()),
            name: id.lab_name.clone(),
            resource_group_name: id.resource_group_name.clone(),
            location: location::normalize(&lab.location),
            title: props.title.clone().unwrap_or_default(),
            description: props.description.clone(),
            lab_plan_id: props.lab_plan_id.clone(),
            security: flatten_security(&props.security_profile),
            virtual_machine: flatten_virtual_machine(
                &props.virtual_machine_profile,
                prior.virtual_machine.first(),
            ),
            auto_shutdown: flatten_auto_shutdown(&props.auto_shutdown_profile),
            connection_setting: flatten_connection(&props.connection_profile),
            network: flatten_network(props.network_profile.as_ref()),
            roster: flatten_roster(props.roster_profile.as_ref()),
            tags: lab.tags.clone(),
        }
    }
}

/// Paths that force a new lab: adding a non-admin user or a network, or
/// changing the non-admin credentials or the subnet of an existing one
fn replacement_paths(prior: &DynamicValue, planned: &DynamicValue) -> Vec<AttributePath> {
    let mut paths = Vec::new();
    if prior.is_null() || planned.is_null() {
        return paths;
    }

    let count = |value: &DynamicValue, path: &str| {
        value
            .get_list(&AttributePath::parse(path))
            .map(|items| items.len())
            .unwrap_or_default()
    };
    let mut check = |block: &str, fields: &[&str]| {
        match (count(prior, block), count(planned, block)) {
            (0, 1) => paths.push(AttributePath::parse(block)),
            (1, 1) => {
                for field in fields {
                    let path = AttributePath::parse(&format!("{}.0.{}", block, field));
                    if DynamicValue::has_change(prior, planned, &path) {
                        paths.push(path);
                    }
                }
            }
            _ => {}
        }
    };

    check("virtual_machine.0.non_admin_user", &["username", "password"]);
    check("network", &["subnet_id"]);
    paths
}

fn schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(build_schema)
}

fn build_schema() -> Schema {
    let string = || AttributeType::String;
    let func = |f: fn(&str, &str) -> Vec<String>, description: &'static str| {
        Box::new(FuncValidator::new(f, description))
    };
    let image_field = |name: &str| {
        AttributeBuilder::new(name, string())
            .optional()
            .force_new()
            .conflicts_with("virtual_machine.0.image_reference.0.id")
            .validator(Box::new(StringNotEmptyValidator))
            .build()
    };
    let credential = |name: &str, force_new: bool| {
        let username = AttributeBuilder::new("username", string())
            .required()
            .validator(func(validate::lab_username, "lab username"));
        let password = AttributeBuilder::new("password", string())
            .required()
            .sensitive()
            .validator(func(validate::lab_password, "lab password"));
        let (username, password) = if force_new {
            (username.force_new(), password.force_new())
        } else {
            (username, password)
        };
        NestedBlockBuilder::new(name, NestingMode::List)
            .max_items(1)
            .attribute(username.build())
            .attribute(password.build())
    };
    let duration = |name: &str| {
        AttributeBuilder::new(name, string())
            .optional()
            .validator(func(validate::iso8601_duration, "ISO 8601 duration"))
            .build()
    };

    let virtual_machine = NestedBlockBuilder::new("virtual_machine", NestingMode::List)
        .min_items(1)
        .max_items(1)
        .block(credential("admin_user", true).min_items(1).build())
        .block(credential("non_admin_user", false).build())
        .block(
            NestedBlockBuilder::new("image_reference", NestingMode::List)
                .min_items(1)
                .max_items(1)
                .attribute(
                    AttributeBuilder::new("id", string())
                        .optional()
                        .force_new()
                        .validator(func(validate::shared_image_id, "shared image ID"))
                        .conflicts_with("virtual_machine.0.image_reference.0.offer")
                        .conflicts_with("virtual_machine.0.image_reference.0.publisher")
                        .conflicts_with("virtual_machine.0.image_reference.0.sku")
                        .conflicts_with("virtual_machine.0.image_reference.0.version")
                        .build(),
                )
                .attribute(image_field("offer"))
                .attribute(image_field("publisher"))
                .attribute(image_field("sku"))
                .attribute(
                    AttributeBuilder::new("version", string())
                        .optional()
                        .force_new()
                        .conflicts_with("virtual_machine.0.image_reference.0.id")
                        .validator(func(validate::lab_image_version, "image version"))
                        .build(),
                )
                .build(),
        )
        .block(
            NestedBlockBuilder::new("sku", NestingMode::List)
                .min_items(1)
                .max_items(1)
                .attribute(
                    AttributeBuilder::new("name", string())
                        .required()
                        .force_new()
                        .validator(func(validate::lab_sku_name, "lab SKU name"))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("capacity", AttributeType::Number)
                        .required()
                        .validator(Box::new(NumberRangeValidator::between(0.0, 400.0)))
                        .build(),
                )
                .build(),
        )
        .attribute(
            AttributeBuilder::new("usage_quota", string())
                .optional()
                .default(Dynamic::String("PT0S".to_string()))
                .validator(func(validate::iso8601_duration, "ISO 8601 duration"))
                .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "additional_capability_gpu_drivers_installed",
                AttributeType::Bool,
            )
            .optional()
            .force_new()
            .default(Dynamic::Bool(false))
            .build(),
        )
        .attribute(
            AttributeBuilder::new("create_option", string())
                .optional()
                .force_new()
                .default(Dynamic::String("Image".to_string()))
                .validator(Box::new(StringInSliceValidator::new(&["Image", "TemplateVM"])))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("shared_password_enabled", AttributeType::Bool)
                .optional()
                .force_new()
                .default(Dynamic::Bool(false))
                .build(),
        )
        .build();

    let public_only = || Box::new(StringInSliceValidator::new(&["Public"]));

    SchemaBuilder::new()
        .version(0)
        .description("Manages a lab in Azure Lab Services")
        .attribute(id_attribute())
        .attribute(
            AttributeBuilder::new("name", string())
                .required()
                .force_new()
                .validator(func(validate::lab_name, "lab name"))
                .build(),
        )
        .attribute(resource_group_name_attribute())
        .attribute(location_attribute())
        .attribute(
            AttributeBuilder::new("title", string())
                .required()
                .validator(func(validate::lab_title, "lab title"))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("description", string())
                .optional()
                .validator(func(validate::lab_description, "lab description"))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("lab_plan_id", string())
                .optional()
                .validator(func(armid::id::validate_resource_id::<LabPlanId>, "lab plan ID"))
                .build(),
        )
        .attribute(tags_attribute())
        .block(
            NestedBlockBuilder::new("security", NestingMode::List)
                .min_items(1)
                .max_items(1)
                .attribute(
                    AttributeBuilder::new("open_access_enabled", AttributeType::Bool)
                        .required()
                        .build(),
                )
                .attribute(AttributeBuilder::new("registration_code", string()).computed().build())
                .build(),
        )
        .block(virtual_machine)
        .block(
            NestedBlockBuilder::new("auto_shutdown", NestingMode::List)
                .max_items(1)
                .attribute(duration("disconnect_delay"))
                .attribute(duration("idle_delay"))
                .attribute(duration("no_connect_delay"))
                .attribute(
                    AttributeBuilder::new("shutdown_on_idle", string())
                        .optional()
                        .validator(Box::new(StringInSliceValidator::new(&[
                            "LowUsage",
                            "UserAbsence",
                        ])))
                        .build(),
                )
                .build(),
        )
        .block(
            NestedBlockBuilder::new("connection_setting", NestingMode::List)
                .max_items(1)
                .attribute(
                    AttributeBuilder::new("client_rdp_access", string())
                        .optional()
                        .validator(public_only())
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("client_ssh_access", string())
                        .optional()
                        .validator(public_only())
                        .build(),
                )
                .build(),
        )
        .block(
            NestedBlockBuilder::new("network", NestingMode::List)
                .max_items(1)
                .attribute(
                    AttributeBuilder::new("subnet_id", string())
                        .optional()
                        .validator(func(armid::id::validate_resource_id::<SubnetId>, "subnet ID"))
                        .build(),
                )
                .attribute(AttributeBuilder::new("load_balancer_id", string()).computed().build())
                .attribute(AttributeBuilder::new("public_ip_id", string()).computed().build())
                .build(),
        )
        .block(
            NestedBlockBuilder::new("roster", NestingMode::List)
                .max_items(1)
                .attribute(
                    AttributeBuilder::new("active_directory_group_id", string())
                        .optional()
                        .validator(Box::new(UuidValidator))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("lms_instance", string())
                        .optional()
                        .validator(Box::new(UrlHttpValidator))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("lti_client_id", string())
                        .optional()
                        .validator(Box::new(StringNotEmptyValidator))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("lti_context_id", string())
                        .optional()
                        .validator(Box::new(UuidValidator))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("lti_roster_endpoint", string())
                        .optional()
                        .validator(Box::new(UrlHttpValidator))
                        .build(),
                )
                .build(),
        )
        .build()
}

#[derive(Default)]
pub struct LabServiceLabResource {
    provider_data: Option<AzureRmProviderData>,
}

impl LabServiceLabResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn create_lab(
        ctx: &Context,
        data: &AzureRmProviderData,
        model: &LabServiceLabModel,
    ) -> Result<LabServiceLabModel> {
        let id = LabId::new(&data.subscription_id, &model.resource_group_name, &model.name);
        let api = data.client.lab_services();

        match api.get(&id).await {
            Ok(_) => return Err(ProviderError::requires_import(RESOURCE_TYPE, id.id())),
            Err(e) if e.is_not_found() => {}
            Err(source) => {
                return Err(ProviderError::Api {
                    context: format!("checking for existing {}", id),
                    source,
                })
            }
        }

        api.create_or_update_then_poll(ctx, &id, &model.expand())
            .await
            .context(|| format!("creating {}", id))?;

        let lab = api.get(&id).await.context(|| format!("retrieving {}", id))?;
        Ok(LabServiceLabModel::flatten(&id, &lab, model))
    }

    async fn update_lab(
        ctx: &Context,
        data: &AzureRmProviderData,
        request: &UpdateResourceRequest,
    ) -> Result<LabServiceLabModel> {
        let prior: LabServiceLabModel = request.prior_state.decode()?;
        let planned: LabServiceLabModel = request.planned_state.decode()?;
        let id = prior.lab_id()?;
        let api = data.client.lab_services();

        let mut lab = api.get(&id).await.context(|| format!("retrieving {}", id))?;
        planned.apply_changes(&mut lab, &request.prior_state, &request.planned_state);

        api.create_or_update_then_poll(ctx, &id, &lab)
            .await
            .context(|| format!("updating {}", id))?;

        let lab = api.get(&id).await.context(|| format!("retrieving {}", id))?;
        Ok(LabServiceLabModel::flatten(&id, &lab, &planned))
    }
}

#[async_trait]
impl Resource for LabServiceLabResource {
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
            let model: LabServiceLabModel = request.planned_state.decode()?;
            Self::create_lab(&ctx, data, &model).await
        }
        .await;

        match result
            .map_err(|e| error_diagnostic("Failed to create lab", &e))
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
            let prior: LabServiceLabModel = request.current_state.decode()?;
            let id = prior.lab_id()?;
            match data.client.lab_services().get(&id).await {
                Ok(lab) => Ok(Some(LabServiceLabModel::flatten(&id, &lab, &prior))),
                Err(e) if e.is_not_found() => {
                    tracing::info!("{} was not found - removing from state", id);
                    Ok(None)
                }
                Err(source) => Err(ProviderError::Api {
                    context: format!("retrieving {}", id),
                    source,
                }),
            }
        }
        .await;

        let result = result
            .map_err(|e| error_diagnostic("Failed to read lab", &e))
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
        let result = Self::update_lab(&ctx, data, &request).await;

        match result
            .map_err(|e| error_diagnostic("Failed to update lab", &e))
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
            let model: LabServiceLabModel = request.prior_state.decode()?;
            let id = model.lab_id()?;
            match data.client.lab_services().delete_then_poll(&ctx, &id).await {
                Err(e) if e.is_not_found() => Ok(()),
                other => other.context(|| format!("deleting {}", id)),
            }
        }
        .await;

        if let Err(e) = result {
            diagnostics.push(error_diagnostic("Failed to delete lab", &e));
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for LabServiceLabResource {
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

#[async_trait]
impl ResourceWithModifyPlan for LabServiceLabResource {
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        let requires_replace = replacement_paths(&request.prior_state, &request.proposed_new_state);
        if !requires_replace.is_empty() {
            tracing::debug!(paths = ?requires_replace, "lab change requires replacement");
        }

        ModifyPlanResponse {
            planned_state: request.proposed_new_state,
            requires_replace,
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl ResourceWithImportState for LabServiceLabResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let id = match LabId::parse_insensitively(&request.id) {
            Ok(id) => id,
            Err(e) => {
                return ImportResourceStateResponse {
                    imported_resources: vec![],
                    diagnostics: vec![invalid_import_id(&e, IMPORT_EXAMPLE)],
                }
            }
        };

        let model = LabServiceLabModel {
            id: Some(id.id()),
            name: id.lab_name.clone(),
            resource_group_name: id.resource_group_name.clone(),
            ..Default::default()
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
