//! Lab Services labs (`Microsoft.LabServices`, 2022-08-01)

use armid::{LabId, ResourceId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::client::Client;
use super::error::ApiError;
use crate::context::Context;

pub const API_VERSION: &str = "2022-08-01";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lab {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub properties: LabProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabProperties {
    #[serde(default)]
    pub auto_shutdown_profile: AutoShutdownProfile,
    #[serde(default)]
    pub connection_profile: ConnectionProfile,
    #[serde(default)]
    pub security_profile: SecurityProfile,
    #[serde(default)]
    pub virtual_machine_profile: VirtualMachineProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Serialized even when empty so that an update can detach the plan
    #[serde(default)]
    pub lab_plan_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_profile: Option<LabNetworkProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roster_profile: Option<RosterProfile>,
    /// Read-only
    #[serde(skip_serializing)]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoShutdownProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disconnect_delay: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_delay: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_connect_delay: Option<String>,
    /// `Enabled` or `Disabled`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shutdown_on_disconnect: Option<String>,
    /// `None`, `LowUsage` or `UserAbsence`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shutdown_on_idle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shutdown_when_not_connected: Option<String>,
}

/// Access types are `None`, `Public` or `Private`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_rdp_access: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ssh_access: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_rdp_access: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_ssh_access: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityProfile {
    /// `Enabled` or `Disabled`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_access: Option<String>,
    /// Read-only
    #[serde(skip_serializing)]
    pub registration_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineProfile {
    #[serde(default)]
    pub admin_user: Credentials,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_admin_user: Option<Credentials>,
    #[serde(default)]
    pub create_option: String,
    #[serde(default)]
    pub image_reference: ImageReference,
    #[serde(default)]
    pub sku: LabSku,
    #[serde(default)]
    pub usage_quota: String,
    /// `Enabled` or `Disabled`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_shared_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_capabilities: Option<VirtualMachineAdditionalCapabilities>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    /// Never returned by the service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageReference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabSku {
    #[serde(default)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineAdditionalCapabilities {
    /// `Enabled` or `Disabled`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_gpu_drivers: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabNetworkProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_balancer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_ip_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_directory_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lms_instance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lti_client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lti_context_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lti_roster_endpoint: Option<String>,
}

pub struct LabServicesApi<'a> {
    client: &'a Client,
}

impl<'a> LabServicesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &LabId) -> Result<Lab, ApiError> {
        self.client.get(&id.id(), API_VERSION).await?.json()
    }

    pub async fn create_or_update_then_poll(
        &self,
        ctx: &Context,
        id: &LabId,
        lab: &Lab,
    ) -> Result<(), ApiError> {
        let path = id.id();
        let response = self.client.put(&path, API_VERSION, lab).await?;
        self.client
            .poller(ctx)
            .wait(&response, &path, API_VERSION)
            .await
    }

    pub async fn delete_then_poll(&self, ctx: &Context, id: &LabId) -> Result<(), ApiError> {
        let path = id.id();
        let response = self.client.delete(&path, API_VERSION).await?;
        self.client
            .poller(ctx)
            .wait_for_deletion(&response, &path, API_VERSION)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cleared_lab_plan_is_sent_as_null() {
        let lab = Lab {
            location: "westeurope".to_string(),
            ..Default::default()
        };
        let value = serde_json::to_value(&lab).unwrap();
        assert_eq!(value["properties"]["labPlanId"], serde_json::Value::Null);
        assert!(value["properties"].as_object().unwrap().contains_key("labPlanId"));
    }

    #[test]
    fn service_response_without_passwords_parses() {
        let lab: Lab = serde_json::from_value(json!({
            "location": "westeurope",
            "properties": {
                "title": "Test Title",
                "securityProfile": {"openAccess": "Disabled", "registrationCode": "abc123"},
                "virtualMachineProfile": {
                    "adminUser": {"username": "testadmin"},
                    "createOption": "Image",
                    "imageReference": {"offer": "0001-com-ubuntu-server-focal", "publisher": "canonical", "sku": "20_04-lts", "version": "latest"},
                    "sku": {"name": "Classic_Fsv2_2_4GB_128_S_SSD", "capacity": 1},
                    "usageQuota": "PT0S",
                    "useSharedPassword": "Disabled"
                },
                "provisioningState": "Succeeded"
            }
        }))
        .unwrap();

        let vm = &lab.properties.virtual_machine_profile;
        assert_eq!(vm.admin_user.username, "testadmin");
        assert_eq!(vm.admin_user.password, None);
        assert_eq!(vm.sku.capacity, Some(1));
        assert_eq!(
            lab.properties.security_profile.registration_code.as_deref(),
            Some("abc123")
        );
    }
}
