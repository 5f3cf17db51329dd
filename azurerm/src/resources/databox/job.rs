//! Data Box job resource implementation

use armid::{DataBoxJobId, ResourceId, ScopedLockId, StorageAccountId};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::api::databox::{
    CommonJobDetails, ContactDetails, DataBoxJobDetails, DestinationAccountDetails,
    DiskJobDetails, HeavyJobDetails, JobDeliveryInfo, JobDetails, JobProperties, JobResource,
    JobResourceUpdateParameter, NotificationPreference, Preferences, ShippingAddress, Sku,
    TransportPreferences, UpdateJobDetails, UpdateJobProperties,
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
use crate::types::{AttributePath, Diagnostic, Dynamic};
use crate::validate::databox as validate;
use crate::validator::{
    EachElementValidator, FuncValidator, ListLengthValidator, NumberRangeValidator,
    Rfc3339TimeValidator, StringInSliceValidator, StringNotEmptyValidator,
};

const RESOURCE_TYPE: &str = "azurerm_data_box_job";

const TIMEOUTS: ResourceTimeouts = ResourceTimeouts::uniform_minutes(30);

/// Lock the service places on every destination storage account
const SERVICE_LOCK_NAME: &str = "DATABOX_SERVICE";

const CANCELLATION_REASON: &str = "Cancel the order for deleting";

const MAX_DESTINATION_ACCOUNTS: usize = 10;

const IMPORT_EXAMPLE: &str =
    "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/group1/providers/Microsoft.DataBox/jobs/job1";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataBoxJobModel {
    pub id: Option<String>,
    pub name: String,
    pub location: String,
    pub resource_group_name: String,
    pub contact_details: Vec<ContactDetailsModel>,
    pub preferred_shipment_type: String,
    pub shipping_address: Vec<ShippingAddressModel>,
    pub sku_name: String,
    pub databox_disk_passkey: Option<String>,
    pub databox_preferred_disk: Vec<PreferredDiskModel>,
    pub datacenter_region_preference: Vec<String>,
    pub delivery_scheduled_date_time: Option<String>,
    pub delivery_type: String,
    pub destination_managed_disk: Vec<DestinationManagedDiskModel>,
    pub destination_storage_account: Vec<DestinationStorageAccountModel>,
    pub device_password: Option<String>,
    pub expected_data_size_in_tb: Option<i32>,
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactDetailsModel {
    pub name: String,
    pub emails: Vec<String>,
    pub phone_number: String,
    pub phone_extension: Option<String>,
    pub phone_mobile: Option<String>,
    pub notification_preference: Vec<NotificationPreferenceModel>,
}

/// One flag per shipping stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPreferenceModel {
    #[serde(default = "enabled")]
    pub at_azure_dc: bool,
    #[serde(default = "enabled")]
    pub data_copied: bool,
    #[serde(default = "enabled")]
    pub delivered: bool,
    #[serde(default = "enabled")]
    pub device_prepared: bool,
    #[serde(default = "enabled")]
    pub dispatched: bool,
    #[serde(default = "enabled")]
    pub picked_up: bool,
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingAddressModel {
    pub address_type: String,
    pub city: String,
    pub company_name: Option<String>,
    pub country: String,
    pub postal_code: String,
    pub postal_code_plus_four: Option<String>,
    pub state_or_province: String,
    pub street_address_1: String,
    pub street_address_2: Option<String>,
    pub street_address_3: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreferredDiskModel {
    pub count: i32,
    pub size_in_tb: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationManagedDiskModel {
    pub resource_group_id: String,
    pub staging_storage_account_id: String,
    pub share_password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationStorageAccountModel {
    pub storage_account_id: String,
    pub share_password: Option<String>,
}

impl DataBoxJobModel {
    fn destination_count(&self) -> usize {
        self.destination_managed_disk.len() + self.destination_storage_account.len()
    }

    fn contact_details(&self) -> Result<&ContactDetailsModel> {
        self.contact_details.first().ok_or_else(|| {
            ProviderError::InvalidConfiguration("`contact_details` is required".to_string())
        })
    }

    fn shipping_address(&self) -> Result<&ShippingAddressModel> {
        self.shipping_address.first().ok_or_else(|| {
            ProviderError::InvalidConfiguration("`shipping_address` is required".to_string())
        })
    }

    fn job_id(&self) -> Result<DataBoxJobId> {
        let id = self
            .id
            .as_deref()
            .ok_or_else(|| ProviderError::Custom("state has no `id`".to_string()))?;
        Ok(DataBoxJobId::parse(id)?)
    }

    fn expand(&self) -> Result<JobResource> {
        let count = self.destination_count();
        if count == 0 || count > MAX_DESTINATION_ACCOUNTS {
            return Err(ProviderError::InvalidConfiguration(
                "`destination_managed_disk` and `destination_storage_account` must be between 1 and 10 (inclusive)"
                    .to_string(),
            ));
        }

        let common = CommonJobDetails {
            contact_details: Some(self.contact_details()?.expand()),
            shipping_address: Some(self.shipping_address()?.expand()),
            destination_account_details: self.expand_destinations(),
            preferences: Some(Preferences {
                preferred_data_center_region: self.datacenter_region_preference.clone(),
                transport_preferences: Some(TransportPreferences {
                    preferred_shipment_type: self.preferred_shipment_type.clone(),
                }),
            }),
            expected_data_size_in_tb: self.expected_data_size_in_tb,
        };

        let details = match self.sku_name.as_str() {
            "DataBox" => JobDetails::DataBox(DataBoxJobDetails {
                common,
                device_password: self.device_password.clone(),
            }),
            "DataBoxDisk" => JobDetails::DataBoxDisk(DiskJobDetails {
                common,
                passkey: self.databox_disk_passkey.clone(),
                preferred_disks: self
                    .databox_preferred_disk
                    .first()
                    .map(|d| HashMap::from([(d.size_in_tb.to_string(), d.count)]))
                    .unwrap_or_default(),
            }),
            "DataBoxHeavy" => JobDetails::DataBoxHeavy(HeavyJobDetails {
                common,
                device_password: self.device_password.clone(),
            }),
            other => {
                return Err(ProviderError::InvalidConfiguration(format!(
                    "unsupported `sku_name` {:?}",
                    other
                )))
            }
        };

        Ok(JobResource {
            id: None,
            name: None,
            location: location::normalize(&self.location),
            tags: self.tags.clone(),
            sku: Sku {
                name: self.sku_name.clone(),
            },
            properties: JobProperties {
                delivery_type: self.delivery_type.clone(),
                delivery_info: self.delivery_scheduled_date_time.as_ref().map(|t| JobDeliveryInfo {
                    scheduled_date_time: Some(t.clone()),
                }),
                details: Some(details),
                status: None,
            },
        })
    }

    fn expand_destinations(&self) -> Vec<DestinationAccountDetails> {
        let disks = self
            .destination_managed_disk
            .iter()
            .map(|d| DestinationAccountDetails::ManagedDisk {
                resource_group_id: d.resource_group_id.clone(),
                staging_storage_account_id: d.staging_storage_account_id.clone(),
                share_password: d.share_password.clone(),
            });
        let accounts = self
            .destination_storage_account
            .iter()
            .map(|a| DestinationAccountDetails::StorageAccount {
                storage_account_id: a.storage_account_id.clone(),
                share_password: a.share_password.clone(),
            });
        disks.chain(accounts).collect()
    }

    fn expand_update(&self) -> Result<JobResourceUpdateParameter> {
        Ok(JobResourceUpdateParameter {
            properties: UpdateJobProperties {
                details: UpdateJobDetails {
                    contact_details: Some(self.contact_details()?.expand()),
                    shipping_address: Some(self.shipping_address()?.expand()),
                },
            },
            tags: self.tags.clone(),
        })
    }

    /// Storage accounts that carry the service lock for this job
    fn lock_scopes(&self) -> Vec<&str> {
        self.destination_managed_disk
            .iter()
            .map(|d| d.staging_storage_account_id.as_str())
            .chain(
                self.destination_storage_account
                    .iter()
                    .map(|a| a.storage_account_id.as_str()),
            )
            .filter(|scope| !scope.is_empty())
            .collect()
    }

    /// Build state from the service's view of the job. Secrets the service
    /// does not return are carried over from `prior`.
    fn flatten(id: &DataBoxJobId, job: &JobResource, prior: &DataBoxJobModel) -> Self {
        let mut model = DataBoxJobModel {
            id: Some(id.id()),
            name: id.name.clone(),
            resource_group_name: id.resource_group.clone(),
            location: location::normalize(&job.location),
            sku_name: job.sku.name.clone(),
            delivery_type: job.properties.delivery_type.clone(),
            delivery_scheduled_date_time: job
                .properties
                .delivery_info
                .as_ref()
                .and_then(|d| d.scheduled_date_time.as_deref())
                .map(normalize_rfc3339),
            tags: job.tags.clone(),
            databox_disk_passkey: prior.databox_disk_passkey.clone(),
            device_password: prior.device_password.clone(),
            preferred_shipment_type: prior.preferred_shipment_type.clone(),
            expected_data_size_in_tb: prior.expected_data_size_in_tb,
            ..Default::default()
        };

        let Some(details) = &job.properties.details else {
            return model;
        };

        match details {
            JobDetails::DataBox(d) => {
                if d.device_password.is_some() {
                    model.device_password = d.device_password.clone();
                }
            }
            JobDetails::DataBoxHeavy(d) => {
                if d.device_password.is_some() {
                    model.device_password = d.device_password.clone();
                }
            }
            JobDetails::DataBoxDisk(d) => {
                model.databox_preferred_disk = flatten_preferred_disks(&d.preferred_disks);
            }
        }

        let common = details.common();
        model.contact_details = common
            .contact_details
            .iter()
            .map(ContactDetailsModel::flatten)
            .collect();
        model.shipping_address = common
            .shipping_address
            .iter()
            .map(ShippingAddressModel::flatten)
            .collect();
        if let Some(size) = common.expected_data_size_in_tb {
            model.expected_data_size_in_tb = Some(size);
        }
        if let Some(preferences) = &common.preferences {
            if let Some(transport) = &preferences.transport_preferences {
                model.preferred_shipment_type = transport.preferred_shipment_type.clone();
            }
            model.datacenter_region_preference = preferences.preferred_data_center_region.clone();
        }

        for destination in &common.destination_account_details {
            match destination {
                DestinationAccountDetails::ManagedDisk {
                    resource_group_id,
                    staging_storage_account_id,
                    share_password,
                } => {
                    let prior_password = prior
                        .destination_managed_disk
                        .iter()
                        .find(|d| {
                            d.staging_storage_account_id
                                .eq_ignore_ascii_case(staging_storage_account_id)
                        })
                        .and_then(|d| d.share_password.clone());
                    model.destination_managed_disk.push(DestinationManagedDiskModel {
                        resource_group_id: resource_group_id.clone(),
                        staging_storage_account_id: staging_storage_account_id.clone(),
                        share_password: share_password.clone().or(prior_password),
                    });
                }
                DestinationAccountDetails::StorageAccount {
                    storage_account_id,
                    share_password,
                } => {
                    let prior_password = prior
                        .destination_storage_account
                        .iter()
                        .find(|a| a.storage_account_id.eq_ignore_ascii_case(storage_account_id))
                        .and_then(|a| a.share_password.clone());
                    model
                        .destination_storage_account
                        .push(DestinationStorageAccountModel {
                            storage_account_id: storage_account_id.clone(),
                            share_password: share_password.clone().or(prior_password),
                        });
                }
            }
        }

        model
    }
}

impl ContactDetailsModel {
    fn expand(&self) -> ContactDetails {
        ContactDetails {
            contact_name: self.name.clone(),
            email_list: self.emails.clone(),
            phone: self.phone_number.clone(),
            phone_extension: self.phone_extension.clone(),
            mobile: self.phone_mobile.clone(),
            notification_preference: self
                .notification_preference
                .first()
                .map(NotificationPreferenceModel::expand)
                .unwrap_or_default(),
        }
    }

    fn flatten(input: &ContactDetails) -> Self {
        Self {
            name: input.contact_name.clone(),
            emails: input.email_list.clone(),
            phone_number: input.phone.clone(),
            phone_extension: input.phone_extension.clone().filter(|v| !v.is_empty()),
            phone_mobile: input.mobile.clone().filter(|v| !v.is_empty()),
            notification_preference: NotificationPreferenceModel::flatten(
                &input.notification_preference,
            ),
        }
    }
}

impl NotificationPreferenceModel {
    fn expand(&self) -> Vec<NotificationPreference> {
        [
            ("DevicePrepared", self.device_prepared),
            ("Dispatched", self.dispatched),
            ("Delivered", self.delivered),
            ("PickedUp", self.picked_up),
            ("AtAzureDC", self.at_azure_dc),
            ("DataCopy", self.data_copied),
        ]
        .into_iter()
        .map(|(stage, send)| NotificationPreference {
            stage_name: stage.to_string(),
            send_notification: send,
        })
        .collect()
    }

    /// Stages missing from a non-empty list are off
    fn flatten(input: &[NotificationPreference]) -> Vec<Self> {
        if input.is_empty() {
            return Vec::new();
        }

        let mut model = Self {
            at_azure_dc: false,
            data_copied: false,
            delivered: false,
            device_prepared: false,
            dispatched: false,
            picked_up: false,
        };
        for item in input {
            let flag = match item.stage_name.as_str() {
                "DevicePrepared" => &mut model.device_prepared,
                "Dispatched" => &mut model.dispatched,
                "Delivered" => &mut model.delivered,
                "PickedUp" => &mut model.picked_up,
                "AtAzureDC" => &mut model.at_azure_dc,
                "DataCopy" => &mut model.data_copied,
                _ => continue,
            };
            *flag = item.send_notification;
        }
        vec![model]
    }
}

impl ShippingAddressModel {
    fn expand(&self) -> ShippingAddress {
        ShippingAddress {
            street_address1: self.street_address_1.clone(),
            street_address2: self.street_address_2.clone(),
            street_address3: self.street_address_3.clone(),
            city: self.city.clone(),
            state_or_province: self.state_or_province.clone(),
            country: self.country.clone(),
            postal_code: self.postal_code.clone(),
            zip_extended_code: self.postal_code_plus_four.clone(),
            company_name: self.company_name.clone(),
            address_type: self.address_type.clone(),
        }
    }

    fn flatten(input: &ShippingAddress) -> Self {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        Self {
            address_type: input.address_type.clone(),
            city: input.city.clone(),
            company_name: non_empty(&input.company_name),
            country: input.country.clone(),
            postal_code: input.postal_code.clone(),
            postal_code_plus_four: non_empty(&input.zip_extended_code),
            state_or_province: input.state_or_province.clone(),
            street_address_1: input.street_address1.clone(),
            street_address_2: non_empty(&input.street_address2),
            street_address_3: non_empty(&input.street_address3),
        }
    }
}

fn flatten_preferred_disks(input: &HashMap<String, i32>) -> Vec<PreferredDiskModel> {
    input
        .iter()
        .filter_map(|(size, count)| {
            size.parse::<i32>().ok().map(|size_in_tb| PreferredDiskModel {
                count: *count,
                size_in_tb,
            })
        })
        .min_by_key(|d| d.size_in_tb)
        .into_iter()
        .collect()
}

fn normalize_rfc3339(value: &str) -> String {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|_| value.to_string())
}

fn same_instant(a: &str, b: &str) -> bool {
    match (DateTime::parse_from_rfc3339(a), DateTime::parse_from_rfc3339(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(build_schema)
}

fn build_schema() -> Schema {
    let string = || AttributeType::String;
    let not_empty = || Box::new(StringNotEmptyValidator);

    let notification_preference = [
        "at_azure_dc",
        "data_copied",
        "delivered",
        "device_prepared",
        "dispatched",
        "picked_up",
    ]
    .into_iter()
    .fold(
        NestedBlockBuilder::new("notification_preference", NestingMode::List)
            .description("Which shipping stages send a notification")
            .max_items(1)
            .computed(),
        |block, flag| {
            block.attribute(
                AttributeBuilder::new(flag, AttributeType::Bool)
                    .optional()
                    .default(Dynamic::Bool(true))
                    .build(),
            )
        },
    )
    .build();

    let contact_details = NestedBlockBuilder::new("contact_details", NestingMode::List)
        .description("Who to contact about the order")
        .min_items(1)
        .max_items(1)
        .attribute(
            AttributeBuilder::new("emails", AttributeType::Set(Box::new(string())))
                .required()
                .validator(Box::new(ListLengthValidator {
                    min: Some(1),
                    max: Some(10),
                }))
                .validator(Box::new(EachElementValidator {
                    inner: Box::new(FuncValidator::new(
                        validate::data_box_job_email,
                        "email address",
                    )),
                }))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("name", string())
                .required()
                .validator(Box::new(FuncValidator::new(
                    validate::data_box_job_contact_name,
                    "contact name",
                )))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("phone_number", string())
                .required()
                .validator(Box::new(FuncValidator::new(
                    validate::data_box_job_phone_number,
                    "phone number",
                )))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("phone_extension", string())
                .optional()
                .validator(Box::new(FuncValidator::new(
                    validate::data_box_job_phone_extension,
                    "phone extension",
                )))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("phone_mobile", string())
                .optional()
                .validator(not_empty())
                .build(),
        )
        .block(notification_preference)
        .build();

    let street_address = |name: &str, required: bool| {
        let builder = AttributeBuilder::new(name, string()).validator(Box::new(FuncValidator::new(
            validate::data_box_job_street_address,
            "street address",
        )));
        if required {
            builder.required().build()
        } else {
            builder.optional().build()
        }
    };

    let shipping_address = NestedBlockBuilder::new("shipping_address", NestingMode::List)
        .description("Where the device is shipped to")
        .min_items(1)
        .max_items(1)
        .attribute(
            AttributeBuilder::new("city", string())
                .required()
                .validator(Box::new(FuncValidator::new(validate::data_box_job_city, "city")))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("country", string())
                .required()
                .validator(not_empty())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("postal_code", string())
                .required()
                .validator(Box::new(FuncValidator::new(
                    validate::data_box_job_post_code,
                    "postal code",
                )))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("state_or_province", string())
                .required()
                .validator(not_empty())
                .build(),
        )
        .attribute(street_address("street_address_1", true))
        .attribute(
            AttributeBuilder::new("address_type", string())
                .optional()
                .default(Dynamic::String("None".to_string()))
                .validator(Box::new(StringInSliceValidator::new(&[
                    "Commercial",
                    "None",
                    "Residential",
                ])))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("company_name", string())
                .optional()
                .validator(Box::new(FuncValidator::new(
                    validate::data_box_job_company_name,
                    "company name",
                )))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("postal_code_plus_four", string())
                .optional()
                .validator(Box::new(FuncValidator::new(
                    validate::data_box_job_post_code,
                    "postal code",
                )))
                .build(),
        )
        .attribute(street_address("street_address_2", false))
        .attribute(street_address("street_address_3", false))
        .build();

    let preferred_disk = NestedBlockBuilder::new("databox_preferred_disk", NestingMode::List)
        .max_items(1)
        .force_new()
        .attribute(
            AttributeBuilder::new("count", AttributeType::Number)
                .required()
                .validator(Box::new(NumberRangeValidator {
                    min: Some(1.0),
                    max: None,
                }))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("size_in_tb", AttributeType::Number)
                .required()
                .validator(Box::new(NumberRangeValidator {
                    min: Some(1.0),
                    max: None,
                }))
                .build(),
        )
        .build();

    let share_password = || {
        AttributeBuilder::new("share_password", string())
            .optional()
            .sensitive()
            .validator(not_empty())
            .build()
    };

    let destination_managed_disk =
        NestedBlockBuilder::new("destination_managed_disk", NestingMode::Set)
            .force_new()
            .attribute(
                AttributeBuilder::new("resource_group_id", string())
                    .required()
                    .validator(Box::new(FuncValidator::new(
                        armid::validate::validate_resource_group_id,
                        "resource group ID",
                    )))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("staging_storage_account_id", string())
                    .required()
                    .validator(Box::new(FuncValidator::new(
                        armid::id::validate_resource_id::<StorageAccountId>,
                        "storage account ID",
                    )))
                    .build(),
            )
            .attribute(share_password())
            .build();

    let destination_storage_account =
        NestedBlockBuilder::new("destination_storage_account", NestingMode::Set)
            .force_new()
            .attribute(
                AttributeBuilder::new("storage_account_id", string())
                    .required()
                    .validator(Box::new(FuncValidator::new(
                        armid::id::validate_resource_id::<StorageAccountId>,
                        "storage account ID",
                    )))
                    .build(),
            )
            .attribute(share_password())
            .build();

    SchemaBuilder::new()
        .version(0)
        .description("Manages a Data Box job")
        .attribute(id_attribute())
        .attribute(
            AttributeBuilder::new("name", string())
                .description("The name of the Data Box job")
                .required()
                .force_new()
                .validator(Box::new(FuncValidator::new(validate::data_box_job_name, "job name")))
                .build(),
        )
        .attribute(location_attribute())
        .attribute(resource_group_name_attribute())
        .attribute(
            AttributeBuilder::new("preferred_shipment_type", string())
                .required()
                .force_new()
                .validator(Box::new(StringInSliceValidator::new(&[
                    "CustomerManaged",
                    "MicrosoftManaged",
                ])))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("sku_name", string())
                .required()
                .force_new()
                .validator(Box::new(StringInSliceValidator::new(&[
                    "DataBox",
                    "DataBoxDisk",
                    "DataBoxHeavy",
                ])))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("databox_disk_passkey", string())
                .description("Passkey for the disks, DataBoxDisk only")
                .optional()
                .sensitive()
                .force_new()
                .validator(Box::new(FuncValidator::new(
                    validate::data_box_job_disk_pass_key,
                    "disk passkey",
                )))
                .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "datacenter_region_preference",
                AttributeType::Set(Box::new(string())),
            )
            .optional()
            .force_new()
            .validator(Box::new(EachElementValidator {
                inner: Box::new(StringNotEmptyValidator),
            }))
            .build(),
        )
        .attribute(
            AttributeBuilder::new("delivery_scheduled_date_time", string())
                .optional()
                .computed()
                .force_new()
                .validator(Box::new(Rfc3339TimeValidator))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("delivery_type", string())
                .optional()
                .force_new()
                .default(Dynamic::String("NonScheduled".to_string()))
                .validator(Box::new(StringInSliceValidator::new(&["NonScheduled", "Scheduled"])))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("device_password", string())
                .description("Device password, DataBox and DataBoxHeavy only")
                .optional()
                .sensitive()
                .force_new()
                .conflicts_with("databox_disk_passkey")
                .validator(not_empty())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("expected_data_size_in_tb", AttributeType::Number)
                .optional()
                .force_new()
                .validator(Box::new(NumberRangeValidator::between(1.0, 1_000_000.0)))
                .build(),
        )
        .attribute(tags_attribute())
        .block(contact_details)
        .block(shipping_address)
        .block(preferred_disk)
        .block(destination_managed_disk)
        .block(destination_storage_account)
        .build()
}

#[derive(Default)]
pub struct DataBoxJobResource {
    provider_data: Option<AzureRmProviderData>,
}

impl DataBoxJobResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn create_job(
        ctx: &Context,
        data: &AzureRmProviderData,
        model: &DataBoxJobModel,
    ) -> Result<DataBoxJobModel> {
        let id = DataBoxJobId::new(&data.subscription_id, &model.resource_group_name, &model.name);
        let api = data.client.databox();

        match api.get(&id).await {
            Ok(_) => return Err(ProviderError::requires_import(RESOURCE_TYPE, id.id())),
            Err(e) if e.is_not_found() => {}
            Err(source) => {
                return Err(ProviderError::Api {
                    context: format!("checking for presence of existing {}", id),
                    source,
                })
            }
        }

        let job = model.expand()?;
        api.create_then_poll(ctx, &id, &job)
            .await
            .context(|| format!("creating {}", id))?;

        let created = api.get(&id).await.context(|| format!("retrieving {}", id))?;
        Ok(DataBoxJobModel::flatten(&id, &created, model))
    }

    /// `None` when the job no longer exists
    async fn read_job(
        data: &AzureRmProviderData,
        model: &DataBoxJobModel,
    ) -> Result<Option<DataBoxJobModel>> {
        let id = model.job_id()?;
        match data.client.databox().get(&id).await {
            Ok(job) => Ok(Some(DataBoxJobModel::flatten(&id, &job, model))),
            Err(e) if e.is_not_found() => {
                tracing::info!("{} does not exist - removing from state", id);
                Ok(None)
            }
            Err(source) => Err(ProviderError::Api {
                context: format!("retrieving {}", id),
                source,
            }),
        }
    }

    async fn update_job(
        ctx: &Context,
        data: &AzureRmProviderData,
        prior: &DataBoxJobModel,
        planned: &DataBoxJobModel,
    ) -> Result<DataBoxJobModel> {
        let id = prior.job_id()?;
        let api = data.client.databox();

        let update = planned.expand_update()?;
        api.update_then_poll(ctx, &id, &update)
            .await
            .context(|| format!("updating {}", id))?;

        let updated = api.get(&id).await.context(|| format!("retrieving {}", id))?;
        Ok(DataBoxJobModel::flatten(&id, &updated, planned))
    }

    async fn delete_job(
        ctx: &Context,
        data: &AzureRmProviderData,
        model: &DataBoxJobModel,
    ) -> Result<()> {
        let id = model.job_id()?;
        let api = data.client.databox();

        match api.cancel(&id, CANCELLATION_REASON).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return Ok(()),
            Err(source) => {
                return Err(ProviderError::Api {
                    context: format!("cancelling order for {}", id),
                    source,
                })
            }
        }

        api.delete_then_poll(ctx, &id)
            .await
            .context(|| format!("deleting {}", id))?;

        for scope in model.lock_scopes() {
            let lock_id = ScopedLockId::new(scope, SERVICE_LOCK_NAME);
            match data.client.management_locks().delete_by_scope(&lock_id).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    tracing::debug!("{} already removed", lock_id);
                }
                Err(source) => {
                    return Err(ProviderError::Api {
                        context: format!("deleting {}", lock_id),
                        source,
                    })
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Resource for DataBoxJobResource {
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
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];

        let count = ["destination_managed_disk", "destination_storage_account"]
            .iter()
            .filter_map(|name| request.config.get_list(&AttributePath::new(name)).ok())
            .map(|items| items.len())
            .sum::<usize>();
        if count == 0 || count > MAX_DESTINATION_ACCOUNTS {
            diagnostics.push(Diagnostic::error(
                "Invalid destination accounts",
                "`destination_managed_disk` and `destination_storage_account` must be between 1 and 10 (inclusive)",
            ));
        }

        ValidateResourceConfigResponse { diagnostics }
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
            let model: DataBoxJobModel = request.planned_state.decode()?;
            Self::create_job(&ctx, data, &model).await
        }
        .await;

        match result.map_err(|e| error_diagnostic("Failed to create Data Box job", &e))
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
            let model: DataBoxJobModel = request.current_state.decode()?;
            Self::read_job(data, &model).await
        }
        .await;

        match result {
            Ok(Some(model)) => match encode_state(&model) {
                Ok(state) => ReadResourceResponse {
                    new_state: Some(state),
                    diagnostics,
                },
                Err(diag) => {
                    diagnostics.push(diag);
                    ReadResourceResponse {
                        new_state: Some(request.current_state),
                        diagnostics,
                    }
                }
            },
            Ok(None) => ReadResourceResponse {
                new_state: None,
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(error_diagnostic("Failed to read Data Box job", &e));
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
            let prior: DataBoxJobModel = request.prior_state.decode()?;
            let planned: DataBoxJobModel = request.planned_state.decode()?;
            Self::update_job(&ctx, data, &prior, &planned).await
        }
        .await;

        match result
            .map_err(|e| error_diagnostic("Failed to update Data Box job", &e))
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
            let model: DataBoxJobModel = request.prior_state.decode()?;
            Self::delete_job(&ctx, data, &model).await
        }
        .await;

        if let Err(e) = result {
            diagnostics.push(error_diagnostic("Failed to delete Data Box job", &e));
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for DataBoxJobResource {
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
impl ResourceWithModifyPlan for DataBoxJobResource {
    /// Keep the stored delivery time when the configured one names the same
    /// instant in a different notation
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        let mut diagnostics = vec![];
        let mut planned_state = request.proposed_new_state;

        let path = AttributePath::new("delivery_scheduled_date_time");
        if let (Ok(before), Ok(after)) = (
            request.prior_state.get_string(&path),
            planned_state.get_string(&path),
        ) {
            if before != after && same_instant(&before, &after) {
                if let Err(e) = planned_state.set_string(&path, before) {
                    diagnostics.push(error_diagnostic("Failed to modify plan", &e));
                }
            }
        }

        ModifyPlanResponse {
            planned_state,
            requires_replace: vec![],
            diagnostics,
        }
    }
}

#[async_trait]
impl ResourceWithImportState for DataBoxJobResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut diagnostics = vec![];

        let id = match DataBoxJobId::parse_insensitively(&request.id) {
            Ok(id) => id,
            Err(e) => {
                diagnostics.push(invalid_import_id(&e, IMPORT_EXAMPLE));
                return ImportResourceStateResponse {
                    imported_resources: vec![],
                    diagnostics,
                };
            }
        };

        let model = DataBoxJobModel {
            id: Some(id.id()),
            name: id.name.clone(),
            resource_group_name: id.resource_group.clone(),
            ..Default::default()
        };

        match encode_state(&model) {
            Ok(state) => ImportResourceStateResponse {
                imported_resources: vec![ImportedResource {
                    type_name: self.type_name().to_string(),
                    state,
                }],
                diagnostics,
            },
            Err(diag) => {
                diagnostics.push(diag);
                ImportResourceStateResponse {
                    imported_resources: vec![],
                    diagnostics,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use crate::locks::InMemoryLockManager;
    use crate::plan;
    use crate::types::DynamicValue;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::sync::Arc;

    const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";
    const JOB_PATH: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.DataBox/jobs/job1";
    const STORAGE_ACCOUNT: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.Storage/storageAccounts/sa1";

    fn configured(server_url: &str) -> DataBoxJobResource {
        DataBoxJobResource {
            provider_data: Some(AzureRmProviderData::new(
                create_test_client(server_url),
                Arc::new(InMemoryLockManager::new()),
                SUBSCRIPTION,
            )),
        }
    }

    fn model(sku: &str) -> DataBoxJobModel {
        DataBoxJobModel {
            name: "job1".to_string(),
            location: "West Europe".to_string(),
            resource_group_name: "rg1".to_string(),
            contact_details: vec![ContactDetailsModel {
                name: "Terraform Test".to_string(),
                emails: vec!["some.user@example.com".to_string()],
                phone_number: "+11234567891".to_string(),
                ..Default::default()
            }],
            preferred_shipment_type: "MicrosoftManaged".to_string(),
            shipping_address: vec![ShippingAddressModel {
                address_type: "None".to_string(),
                city: "San Francisco".to_string(),
                country: "US".to_string(),
                postal_code: "94107".to_string(),
                state_or_province: "CA".to_string(),
                street_address_1: "16 TOWNSEND ST".to_string(),
                ..Default::default()
            }],
            sku_name: sku.to_string(),
            delivery_type: "NonScheduled".to_string(),
            destination_storage_account: vec![DestinationStorageAccountModel {
                storage_account_id: STORAGE_ACCOUNT.to_string(),
                share_password: None,
            }],
            ..Default::default()
        }
    }

    fn job_body(sku: &str) -> serde_json::Value {
        json!({
            "id": JOB_PATH,
            "name": "job1",
            "location": "westeurope",
            "sku": {"name": sku},
            "tags": {"env": "test"},
            "properties": {
                "status": "DeviceOrdered",
                "deliveryType": "NonScheduled",
                "details": {
                    "jobDetailsType": sku,
                    "contactDetails": {
                        "contactName": "Terraform Test",
                        "emailList": ["some.user@example.com"],
                        "phone": "+11234567891",
                        "notificationPreference": [
                            {"stageName": "DevicePrepared", "sendNotification": true},
                            {"stageName": "Dispatched", "sendNotification": false}
                        ]
                    },
                    "shippingAddress": {
                        "streetAddress1": "16 TOWNSEND ST",
                        "city": "San Francisco",
                        "stateOrProvince": "CA",
                        "country": "US",
                        "postalCode": "94107",
                        "addressType": "None"
                    },
                    "destinationAccountDetails": [
                        {"dataDestinationType": "StorageAccount", "storageAccountId": STORAGE_ACCOUNT}
                    ],
                    "preferences": {
                        "preferredDataCenterRegion": [],
                        "transportPreferences": {"preferredShipmentType": "MicrosoftManaged"}
                    }
                }
            }
        })
    }

    #[test]
    fn schema_marks_force_new_and_sensitive_fields() {
        let schema = schema();
        let block = &schema.block;

        assert!(block.attribute("name").is_some_and(|a| a.force_new && a.required));
        assert!(block.attribute("device_password").is_some_and(|a| a.sensitive
            && a.conflicts_with == vec!["databox_disk_passkey".to_string()]));
        assert!(block
            .attribute("delivery_scheduled_date_time")
            .is_some_and(|a| a.optional && a.computed));

        let contact = block.block_type("contact_details").unwrap();
        assert_eq!((contact.min_items, contact.max_items), (1, 1));
        assert!(contact.block.block_type("notification_preference").is_some_and(|b| b.computed));
    }

    #[test]
    fn expand_chooses_details_by_sku() {
        let mut disk = model("DataBoxDisk");
        disk.databox_disk_passkey = Some("abcdef@12345678".to_string());
        disk.databox_preferred_disk = vec![PreferredDiskModel {
            count: 5,
            size_in_tb: 8,
        }];

        let body = serde_json::to_value(disk.expand().unwrap()).unwrap();
        let details = &body["properties"]["details"];
        assert_eq!(details["jobDetailsType"], "DataBoxDisk");
        assert_eq!(details["passkey"], "abcdef@12345678");
        assert_eq!(details["preferredDisks"], json!({"8": 5}));
        assert_eq!(body["location"], "westeurope");

        let mut heavy = model("DataBoxHeavy");
        heavy.device_password = Some("S3cure!Device".to_string());
        let body = serde_json::to_value(heavy.expand().unwrap()).unwrap();
        assert_eq!(body["properties"]["details"]["jobDetailsType"], "DataBoxHeavy");
        assert_eq!(body["properties"]["details"]["devicePassword"], "S3cure!Device");
        assert_eq!(
            body["properties"]["details"]["preferences"]["transportPreferences"]["preferredShipmentType"],
            "MicrosoftManaged"
        );
    }

    #[test]
    fn expand_requires_between_one_and_ten_destinations() {
        let mut job = model("DataBox");
        job.destination_storage_account.clear();
        let err = job.expand().unwrap_err();
        assert!(err.to_string().contains(
            "`destination_managed_disk` and `destination_storage_account` must be between 1 and 10 (inclusive)"
        ));

        job.destination_storage_account = vec![DestinationStorageAccountModel::default(); 11];
        assert!(job.expand().is_err());

        job.destination_storage_account.truncate(10);
        assert!(job.expand().is_ok());
    }

    #[test]
    fn notification_preferences_cover_every_stage() {
        let prefs = NotificationPreferenceModel {
            at_azure_dc: true,
            data_copied: false,
            delivered: true,
            device_prepared: true,
            dispatched: true,
            picked_up: false,
        };
        let expanded = prefs.expand();
        let stages: Vec<&str> = expanded.iter().map(|p| p.stage_name.as_str()).collect();
        assert_eq!(
            stages,
            ["DevicePrepared", "Dispatched", "Delivered", "PickedUp", "AtAzureDC", "DataCopy"]
        );
        assert_eq!(NotificationPreferenceModel::flatten(&expanded), vec![prefs]);

        assert!(NotificationPreferenceModel::flatten(&[]).is_empty());
        let empty_contact = ContactDetailsModel::default().expand();
        assert!(empty_contact.notification_preference.is_empty());
    }

    #[test]
    fn flatten_keeps_secrets_from_prior_state() {
        let mut prior = model("DataBox");
        prior.id = Some(JOB_PATH.to_string());
        prior.device_password = Some("S3cure!Device".to_string());
        prior.destination_storage_account[0].share_password = Some("share-secret".to_string());

        let job: JobResource = serde_json::from_value(job_body("DataBox")).unwrap();
        let id = DataBoxJobId::parse(JOB_PATH).unwrap();
        let flattened = DataBoxJobModel::flatten(&id, &job, &prior);

        assert_eq!(flattened.device_password.as_deref(), Some("S3cure!Device"));
        assert_eq!(
            flattened.destination_storage_account[0].share_password.as_deref(),
            Some("share-secret")
        );
        assert_eq!(flattened.tags.get("env").map(String::as_str), Some("test"));
        let prefs = &flattened.contact_details[0].notification_preference[0];
        assert!(prefs.device_prepared);
        assert!(!prefs.dispatched);
        assert!(!prefs.delivered);
    }

    #[test]
    fn scheduled_times_are_normalized() {
        assert_eq!(normalize_rfc3339("2024-05-01T10:00:00+00:00"), "2024-05-01T10:00:00Z");
        assert!(same_instant("2024-05-01T12:00:00+02:00", "2024-05-01T10:00:00Z"));
        assert!(!same_instant("2024-05-01T12:00:00Z", "2024-05-01T10:00:00Z"));
    }

    #[tokio::test]
    async fn modify_plan_suppresses_equivalent_delivery_time() {
        let resource = DataBoxJobResource::new();
        let prior = DynamicValue::from_json(json!({
            "delivery_scheduled_date_time": "2024-05-01T10:00:00Z"
        }));
        let proposed = DynamicValue::from_json(json!({
            "delivery_scheduled_date_time": "2024-05-01T12:00:00+02:00"
        }));

        let response = resource
            .modify_plan(
                Context::new(),
                ModifyPlanRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    config: proposed.clone(),
                    prior_state: prior.clone(),
                    proposed_new_state: proposed,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(plan::requires_replace(schema(), &prior, &response.planned_state).is_empty());
    }

    #[tokio::test]
    async fn validate_counts_destinations() {
        let resource = DataBoxJobResource::new();
        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    config: DynamicValue::from_json(json!({"destination_managed_disk": []})),
                },
            )
            .await;
        assert_eq!(response.diagnostics.len(), 1);
    }

    #[tokio::test]
    async fn create_fails_when_job_already_exists() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", JOB_PATH)
            .match_query(Matcher::UrlEncoded("$expand".into(), "details".into()))
            .with_body(job_body("DataBox").to_string())
            .create_async()
            .await;
        let put = server
            .mock("PUT", JOB_PATH)
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let resource = configured(&server.url());
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    planned_state: DynamicValue::from_model(&model("DataBox")).unwrap(),
                    config: DynamicValue::null(),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].detail.contains("needs to be imported"));
        assert!(response.diagnostics[0].detail.contains(RESOURCE_TYPE));
        put.assert_async().await;
    }

    #[tokio::test]
    async fn read_drops_missing_job() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", JOB_PATH)
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error":{"code":"ResourceNotFound","message":"not found"}}"#)
            .create_async()
            .await;

        let mut state = model("DataBox");
        state.id = Some(JOB_PATH.to_string());

        let response = configured(&server.url())
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    current_state: DynamicValue::from_model(&state).unwrap(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(response.new_state.is_none());
    }

    #[tokio::test]
    async fn delete_stops_when_order_is_gone() {
        let mut server = Server::new_async().await;
        let cancel = server
            .mock("POST", format!("{}/cancel", JOB_PATH).as_str())
            .match_query(Matcher::Any)
            .match_body(Matcher::Json(json!({"reason": "Cancel the order for deleting"})))
            .with_status(404)
            .with_body(r#"{"error":{"code":"ResourceNotFound","message":"not found"}}"#)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", JOB_PATH)
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let mut state = model("DataBox");
        state.id = Some(JOB_PATH.to_string());

        let response = configured(&server.url())
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    prior_state: DynamicValue::from_model(&state).unwrap(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        cancel.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn delete_removes_service_locks_and_ignores_missing_ones() {
        let mut server = Server::new_async().await;
        let _cancel = server
            .mock("POST", format!("{}/cancel", JOB_PATH).as_str())
            .match_query(Matcher::Any)
            .with_status(204)
            .create_async()
            .await;
        let _delete = server
            .mock("DELETE", JOB_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .create_async()
            .await;
        let lock = server
            .mock(
                "DELETE",
                format!(
                    "{}/providers/Microsoft.Authorization/locks/DATABOX_SERVICE",
                    STORAGE_ACCOUNT
                )
                .as_str(),
            )
            .match_query(Matcher::UrlEncoded("api-version".into(), "2016-09-01".into()))
            .with_status(404)
            .with_body(r#"{"error":{"code":"LockNotFound","message":"gone"}}"#)
            .expect(1)
            .create_async()
            .await;

        let mut state = model("DataBox");
        state.id = Some(JOB_PATH.to_string());

        let response = configured(&server.url())
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    prior_state: DynamicValue::from_model(&state).unwrap(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        lock.assert_async().await;
    }

    #[tokio::test]
    async fn import_accepts_differently_cased_id() {
        let resource = DataBoxJobResource::new();
        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    id: JOB_PATH.replace("resourceGroups", "resourcegroups"),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let state = &response.imported_resources[0].state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), JOB_PATH);
        assert_eq!(state.get_string(&AttributePath::new("name")).unwrap(), "job1");

        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    id: "/subscriptions/sub/resourceGroups/rg1".to_string(),
                },
            )
            .await;
        assert_eq!(response.diagnostics[0].summary, "Invalid import ID");
    }
}
