//! Data Box job API (`Microsoft.DataBox`, 2019-09-01)

use armid::{DataBoxJobId, ResourceId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::client::Client;
use super::error::ApiError;
use crate::context::Context;

pub const API_VERSION: &str = "2019-09-01";

/// Data Box job resource
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobResource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    pub sku: Sku,
    #[serde(default)]
    pub properties: JobProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sku {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProperties {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub delivery_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_info: Option<JobDeliveryInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JobDetails>,
    /// Read-only
    #[serde(skip_serializing)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDeliveryInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date_time: Option<String>,
}

/// Job details, one shape per SKU
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "jobDetailsType")]
pub enum JobDetails {
    DataBox(DataBoxJobDetails),
    DataBoxDisk(DiskJobDetails),
    DataBoxHeavy(HeavyJobDetails),
}

impl JobDetails {
    pub fn common(&self) -> &CommonJobDetails {
        match self {
            JobDetails::DataBox(d) => &d.common,
            JobDetails::DataBoxDisk(d) => &d.common,
            JobDetails::DataBoxHeavy(d) => &d.common,
        }
    }
}

/// Fields every job details variant carries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonJobDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_details: Option<ContactDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub destination_account_details: Vec<DestinationAccountDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Preferences>,
    #[serde(
        rename = "expectedDataSizeInTerabytes",
        skip_serializing_if = "Option::is_none"
    )]
    pub expected_data_size_in_tb: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataBoxJobDetails {
    #[serde(flatten)]
    pub common: CommonJobDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskJobDetails {
    #[serde(flatten)]
    pub common: CommonJobDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passkey: Option<String>,
    /// Disk size in TB (as a string key) to number of disks
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub preferred_disks: HashMap<String, i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeavyJobDetails {
    #[serde(flatten)]
    pub common: CommonJobDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetails {
    #[serde(default)]
    pub contact_name: String,
    #[serde(default)]
    pub email_list: Vec<String>,
    #[serde(default)]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_extension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(default)]
    pub notification_preference: Vec<NotificationPreference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreference {
    pub stage_name: String,
    pub send_notification: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[serde(default)]
    pub street_address1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_address2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_address3: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state_or_province: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_extended_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default)]
    pub address_type: String,
}

/// Where the copied data ends up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dataDestinationType")]
pub enum DestinationAccountDetails {
    #[serde(rename_all = "camelCase")]
    StorageAccount {
        storage_account_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        share_password: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ManagedDisk {
        resource_group_id: String,
        staging_storage_account_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        share_password: Option<String>,
    },
}

impl DestinationAccountDetails {
    /// Storage account the service locks while the job runs
    pub fn lock_scope(&self) -> &str {
        match self {
            DestinationAccountDetails::StorageAccount {
                storage_account_id, ..
            } => storage_account_id,
            DestinationAccountDetails::ManagedDisk {
                staging_storage_account_id,
                ..
            } => staging_storage_account_id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub preferred_data_center_region: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_preferences: Option<TransportPreferences>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportPreferences {
    pub preferred_shipment_type: String,
}

/// PATCH body: only contact details, shipping address and tags can change
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobResourceUpdateParameter {
    pub properties: UpdateJobProperties,
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateJobProperties {
    pub details: UpdateJobDetails,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_details: Option<ContactDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<ShippingAddress>,
}

#[derive(Debug, Serialize)]
struct CancellationReason<'a> {
    reason: &'a str,
}

/// Data Box job operations
pub struct DataBoxApi<'a> {
    client: &'a Client,
}

impl<'a> DataBoxApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Get a job including its details
    pub async fn get(&self, id: &DataBoxJobId) -> Result<JobResource, ApiError> {
        self.client
            .get_with_query(&id.id(), API_VERSION, &[("$expand", "details")])
            .await?
            .json()
    }

    pub async fn create_then_poll(
        &self,
        ctx: &Context,
        id: &DataBoxJobId,
        job: &JobResource,
    ) -> Result<(), ApiError> {
        let path = id.id();
        let response = self.client.put(&path, API_VERSION, job).await?;
        self.client
            .poller(ctx)
            .wait(&response, &path, API_VERSION)
            .await
    }

    pub async fn update_then_poll(
        &self,
        ctx: &Context,
        id: &DataBoxJobId,
        update: &JobResourceUpdateParameter,
    ) -> Result<(), ApiError> {
        let path = id.id();
        let response = self.client.patch(&path, API_VERSION, update).await?;
        self.client
            .poller(ctx)
            .wait(&response, &path, API_VERSION)
            .await
    }

    /// Cancel the order behind the job
    pub async fn cancel(&self, id: &DataBoxJobId, reason: &str) -> Result<(), ApiError> {
        let path = format!("{}/cancel", id.id());
        self.client
            .post(&path, API_VERSION, &CancellationReason { reason })
            .await?;
        Ok(())
    }

    pub async fn delete_then_poll(&self, ctx: &Context, id: &DataBoxJobId) -> Result<(), ApiError> {
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
    fn disk_job_details_round_trip_through_the_tag() {
        let body = json!({
            "jobDetailsType": "DataBoxDisk",
            "contactDetails": {
                "contactName": "Jane",
                "emailList": ["jane@example.com"],
                "phone": "+11234567890",
                "notificationPreference": [
                    {"stageName": "DevicePrepared", "sendNotification": true}
                ]
            },
            "destinationAccountDetails": [
                {
                    "dataDestinationType": "ManagedDisk",
                    "resourceGroupId": "/subscriptions/s/resourceGroups/rg",
                    "stagingStorageAccountId": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/sa"
                }
            ],
            "expectedDataSizeInTerabytes": 8,
            "passkey": "abc@1234567890",
            "preferredDisks": {"8": 2},
            "copyProgress": []
        });

        let details: JobDetails = serde_json::from_value(body).unwrap();
        match &details {
            JobDetails::DataBoxDisk(disk) => {
                assert_eq!(disk.preferred_disks.get("8"), Some(&2));
                assert_eq!(disk.common.expected_data_size_in_tb, Some(8));
                assert_eq!(
                    disk.common.destination_account_details[0].lock_scope(),
                    "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/sa"
                );
            }
            other => panic!("unexpected details {other:?}"),
        }

        let out = serde_json::to_value(&details).unwrap();
        assert_eq!(out["jobDetailsType"], "DataBoxDisk");
        assert_eq!(out["contactDetails"]["contactName"], "Jane");
    }

    #[test]
    fn storage_account_destination_serializes_with_type() {
        let dest = DestinationAccountDetails::StorageAccount {
            storage_account_id: "/sa".to_string(),
            share_password: None,
        };
        let out = serde_json::to_value(&dest).unwrap();
        assert_eq!(
            out,
            json!({"dataDestinationType": "StorageAccount", "storageAccountId": "/sa"})
        );
    }
}
