//! HPC cache resource implementation

use armid::{CacheId, ResourceId, SubnetId, UserAssignedIdentityId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

use super::{
    access_rule_block, expand_access_rules, flatten_access_rules, get_access_policy_by_name,
    insert_or_update_access_policy, set_access_policies, AccessRuleModel,
};
use crate::api::storage_cache::{
    Cache, CacheActiveDirectoryCredentials, CacheActiveDirectorySettings, CacheDirectorySettings,
    CacheEncryptionSettings, CacheIdentity, CacheLdapCredentials, CacheNetworkSettings,
    CacheProperties, CacheSku, CacheUsernameDownloadSettings, KeyVaultKeyReference,
    KeyVaultKeyReferenceSourceVault, NfsAccessPolicy, UserAssignedIdentity,
};
use crate::context::Context;
use crate::error::{ApiResultExt, ProviderError, Result};
use crate::location;
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
use crate::schema::{
    id_attribute, location_attribute, resource_group_name_attribute, tags_attribute,
    AttributeBuilder, AttributeType, NestedBlockBuilder, NestingMode, Schema, SchemaBuilder,
};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use crate::validate::key_vault::{self, NestedItemId};
use crate::validate::storage_cache::{self as validate, DEFAULT_ACCESS_POLICY_NAME};
use crate::validator::{
    EachElementValidator, FuncValidator, IntInSliceValidator, IpAddressValidator,
    ListLengthValidator, NumberRangeValidator, StringInSliceValidator, StringNotEmptyValidator,
};

const RESOURCE_TYPE: &str = "azurerm_hpc_cache";

const TIMEOUTS: ResourceTimeouts = ResourceTimeouts::uniform_minutes(60);

const CACHE_SIZES: &[i64] = &[3072, 6144, 12288, 21623, 24576, 43246, 49152, 86491];

const USERNAME_SOURCE_FILE: &str = "File";
const USERNAME_SOURCE_AD: &str = "AD";
const USERNAME_SOURCE_LDAP: &str = "LDAP";

const IDENTITY_SYSTEM: &str = "SystemAssigned";
const IDENTITY_USER: &str = "UserAssigned";
const IDENTITY_SYSTEM_AND_USER: &str = "SystemAssigned, UserAssigned";

const IMPORT_EXAMPLE: &str =
    "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/group1/providers/Microsoft.StorageCache/caches/cache1";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HpcCacheModel {
    pub id: Option<String>,
    pub name: String,
    pub resource_group_name: String,
    pub location: String,
    pub cache_size_in_gb: i64,
    pub subnet_id: String,
    pub sku_name: String,
    pub mtu: i64,
    pub ntp_server: String,
    pub dns: Vec<DnsModel>,
    pub directory_active_directory: Vec<DirectoryActiveDirectoryModel>,
    pub directory_flat_file: Vec<DirectoryFlatFileModel>,
    pub directory_ldap: Vec<DirectoryLdapModel>,
    pub default_access_policy: Vec<DefaultAccessPolicyModel>,
    pub mount_addresses: Vec<String>,
    pub identity: Vec<IdentityModel>,
    pub key_vault_key_id: Option<String>,
    pub automatically_rotate_key_to_latest_enabled: bool,
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsModel {
    pub servers: Vec<String>,
    pub search_domain: Option<String>,
}

/// Credentials are write-only on the service side, so state keeps the
/// configured ones
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryActiveDirectoryModel {
    pub dns_primary_ip: String,
    pub dns_secondary_ip: Option<String>,
    pub domain_name: String,
    pub cache_netbios_name: String,
    pub domain_netbios_name: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectoryFlatFileModel {
    pub group_file_uri: String,
    pub password_file_uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryLdapModel {
    pub server: String,
    pub base_dn: String,
    pub encrypted: bool,
    pub certificate_validation_uri: Option<String>,
    pub download_certificate_automatically: bool,
    pub bind: Vec<LdapBindModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LdapBindModel {
    pub dn: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityModel {
    #[serde(rename = "type")]
    pub type_: String,
    pub identity_ids: Vec<String>,
    pub principal_id: Option<String>,
    pub tenant_id: Option<String>,
}

impl IdentityModel {
    fn expand(&self) -> Result<CacheIdentity> {
        let has_user = self.type_ == IDENTITY_USER || self.type_ == IDENTITY_SYSTEM_AND_USER;
        if !has_user && !self.identity_ids.is_empty() {
            return Err(ProviderError::InvalidConfiguration(format!(
                "`identity_ids` can only be specified when `type` includes `{}`",
                IDENTITY_USER
            )));
        }
        if has_user && self.identity_ids.is_empty() {
            return Err(ProviderError::InvalidConfiguration(format!(
                "`identity_ids` must be specified when `type` includes `{}`",
                IDENTITY_USER
            )));
        }

        Ok(CacheIdentity {
            type_: self.type_.clone(),
            user_assigned_identities: self
                .identity_ids
                .iter()
                .map(|id| (id.clone(), UserAssignedIdentity::default()))
                .collect(),
            ..Default::default()
        })
    }

    fn flatten(input: Option<&CacheIdentity>) -> Result<Vec<Self>> {
        let Some(identity) = input else {
            return Ok(Vec::new());
        };

        // the service reports both types without the space
        let type_ = match identity.type_.replace(' ', "").to_ascii_lowercase().as_str() {
            "" | "none" => return Ok(Vec::new()),
            "systemassigned" => IDENTITY_SYSTEM,
            "userassigned" => IDENTITY_USER,
            "systemassigned,userassigned" => IDENTITY_SYSTEM_AND_USER,
            _ => {
                return Err(ProviderError::Custom(format!(
                    "unsupported identity type {:?}",
                    identity.type_
                )))
            }
        };

        let mut identity_ids = identity
            .user_assigned_identities
            .keys()
            .map(|id| Ok(UserAssignedIdentityId::parse_insensitively(id)?.id()))
            .collect::<Result<Vec<_>>>()?;
        identity_ids.sort();

        Ok(vec![Self {
            type_: type_.to_string(),
            identity_ids,
            principal_id: identity.principal_id.clone(),
            tenant_id: identity.tenant_id.clone(),
        }])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultAccessPolicyModel {
    pub access_rule: Vec<AccessRuleModel>,
}

/// Read-only SKUs only come in one size, and their sizes are reserved
fn check_sku_and_size(sku_name: &str, cache_size_in_gb: i64) -> Result<()> {
    let reserved = |size: i64| matches!(size, 21623 | 43246 | 86491);
    let message = match sku_name {
        "Standard_L4_5G" if cache_size_in_gb != 21623 => {
            "The Standard_L4_5G SKU only supports a cache size of 21623"
        }
        "Standard_L9G" if cache_size_in_gb != 43246 => {
            "The Standard_L9G SKU only supports a cache size of 43246"
        }
        "Standard_L16G" if cache_size_in_gb != 86491 => {
            "The Standard_L16G SKU only supports a cache size of 86491"
        }
        "Standard_2G" | "Standard_4G" | "Standard_8G" if reserved(cache_size_in_gb) => {
            "Incompatible cache size chosen. 21623, 43246 and 86491 are reserved for Read Only resources."
        }
        _ => return Ok(()),
    };
    Err(ProviderError::InvalidConfiguration(message.to_string()))
}

impl HpcCacheModel {
    fn cache_id(&self) -> Result<CacheId> {
        let id = self
            .id
            .as_deref()
            .ok_or_else(|| ProviderError::Custom("state has no `id`".to_string()))?;
        Ok(CacheId::parse(id)?)
    }

    fn default_access_policy(&self) -> Option<NfsAccessPolicy> {
        self.default_access_policy.first().map(|p| NfsAccessPolicy {
            name: DEFAULT_ACCESS_POLICY_NAME.to_string(),
            access_rules: expand_access_rules(&p.access_rule),
        })
    }

    fn network_settings(&self) -> CacheNetworkSettings {
        let mut settings = CacheNetworkSettings {
            mtu: Some(self.mtu),
            ntp_server: Some(self.ntp_server.clone()),
            ..Default::default()
        };
        if let Some(dns) = self.dns.first() {
            settings.dns_servers = Some(dns.servers.clone());
            settings.dns_search_domain = dns.search_domain.clone().filter(|d| !d.is_empty());
        }
        settings
    }

    /// At most one directory source is configured
    fn directory_settings(&self) -> Option<CacheDirectorySettings> {
        if let Some(ad) = self.directory_active_directory.first() {
            return Some(CacheDirectorySettings {
                active_directory: Some(CacheActiveDirectorySettings {
                    primary_dns_ip_address: ad.dns_primary_ip.clone(),
                    secondary_dns_ip_address: ad.dns_secondary_ip.clone().filter(|s| !s.is_empty()),
                    domain_name: ad.domain_name.clone(),
                    cache_net_bios_name: ad.cache_netbios_name.clone(),
                    domain_net_bios_name: ad.domain_netbios_name.clone(),
                    domain_joined: None,
                    credentials: Some(CacheActiveDirectoryCredentials {
                        username: ad.username.clone(),
                        password: Some(ad.password.clone()),
                    }),
                }),
                username_download: Some(CacheUsernameDownloadSettings {
                    extended_groups: Some(true),
                    username_source: Some(USERNAME_SOURCE_AD.to_string()),
                    ..Default::default()
                }),
            });
        }

        if let Some(file) = self.directory_flat_file.first() {
            return Some(CacheDirectorySettings {
                active_directory: None,
                username_download: Some(CacheUsernameDownloadSettings {
                    extended_groups: Some(true),
                    username_source: Some(USERNAME_SOURCE_FILE.to_string()),
                    group_file_uri: Some(file.group_file_uri.clone()),
                    user_file_uri: Some(file.password_file_uri.clone()),
                    ..Default::default()
                }),
            });
        }

        self.directory_ldap.first().map(|ldap| {
            let ca_certificate_uri = ldap
                .certificate_validation_uri
                .clone()
                .filter(|uri| !uri.is_empty());
            CacheDirectorySettings {
                active_directory: None,
                username_download: Some(CacheUsernameDownloadSettings {
                    extended_groups: Some(true),
                    username_source: Some(USERNAME_SOURCE_LDAP.to_string()),
                    ldap_server: Some(ldap.server.clone()),
                    ldap_base_dn: Some(ldap.base_dn.clone()),
                    encrypt_ldap_connection: Some(ldap.encrypted),
                    require_valid_certificate: Some(ca_certificate_uri.is_some()),
                    auto_download_certificate: Some(ldap.download_certificate_automatically),
                    ca_certificate_uri,
                    credentials: ldap.bind.first().map(|bind| CacheLdapCredentials {
                        bind_dn: Some(bind.dn.clone()),
                        bind_password: Some(bind.password.clone()),
                    }),
                    ..Default::default()
                }),
            }
        })
    }

    fn key_vault_key_id(&self) -> Option<&str> {
        self.key_vault_key_id.as_deref().filter(|id| !id.is_empty())
    }

    fn encryption_settings(&self, source_vault_id: String) -> Option<CacheEncryptionSettings> {
        self.key_vault_key_id().map(|key_url| CacheEncryptionSettings {
            key_encryption_key: Some(KeyVaultKeyReference {
                key_url: key_url.to_string(),
                source_vault: KeyVaultKeyReferenceSourceVault {
                    id: Some(source_vault_id),
                },
            }),
            rotation_to_latest_key_version_enabled: Some(
                self.automatically_rotate_key_to_latest_enabled,
            ),
        })
    }

    fn expand(&self, access_policies: Vec<NfsAccessPolicy>) -> Result<Cache> {
        let identity = self.identity.first().map(IdentityModel::expand).transpose()?;
        let mut cache = Cache {
            id: None,
            name: Some(self.name.clone()),
            location: location::normalize(&self.location),
            tags: self.tags.clone(),
            sku: Some(CacheSku {
                name: self.sku_name.clone(),
            }),
            identity,
            properties: CacheProperties {
                cache_size_gb: Some(self.cache_size_in_gb),
                subnet: Some(self.subnet_id.clone()),
                network_settings: Some(self.network_settings()),
                directory_services_settings: self.directory_settings(),
                ..Default::default()
            },
        };
        set_access_policies(&mut cache, access_policies);
        Ok(cache)
    }

    fn flatten(id: &CacheId, cache: &Cache, prior: &HpcCacheModel) -> Result<Self> {
        let props = &cache.properties;
        let network = props.network_settings.clone().unwrap_or_default();
        let directory =
            flatten_directory_settings(props.directory_services_settings.as_ref(), prior)?;
        let encryption = props.encryption_settings.as_ref();

        let default_access_policy =
            match get_access_policy_by_name(cache.access_policies(), DEFAULT_ACCESS_POLICY_NAME) {
                Some(policy) => vec![DefaultAccessPolicyModel {
                    access_rule: flatten_access_rules(&policy.access_rules)?,
                }],
                None => prior.default_access_policy.clone(),
            };

        Ok(Self {
            id: Some(id.id()),
            name: id.cache_name.clone(),
            resource_group_name: id.resource_group_name.clone(),
            location: location::normalize(&cache.location),
            cache_size_in_gb: props.cache_size_gb.unwrap_or_default(),
            subnet_id: props.subnet.clone().unwrap_or_default(),
            sku_name: cache.sku.as_ref().map(|s| s.name.clone()).unwrap_or_default(),
            mtu: network.mtu.unwrap_or_default(),
            ntp_server: network.ntp_server.clone().unwrap_or_default(),
            dns: network
                .dns_servers
                .clone()
                .map(|servers| DnsModel {
                    servers,
                    search_domain: network.dns_search_domain.clone(),
                })
                .into_iter()
                .collect(),
            directory_active_directory: directory.active_directory,
            directory_flat_file: directory.flat_file,
            directory_ldap: directory.ldap,
            default_access_policy,
            mount_addresses: props.mount_addresses.clone(),
            identity: IdentityModel::flatten(cache.identity.as_ref())?,
            key_vault_key_id: encryption
                .and_then(|e| e.key_encryption_key.as_ref())
                .map(|key| key.key_url.clone()),
            automatically_rotate_key_to_latest_enabled: encryption
                .and_then(|e| e.rotation_to_latest_key_version_enabled)
                .unwrap_or_default(),
            tags: cache.tags.clone(),
        })
    }
}

#[derive(Debug, Default)]
struct DirectoryModels {
    active_directory: Vec<DirectoryActiveDirectoryModel>,
    flat_file: Vec<DirectoryFlatFileModel>,
    ldap: Vec<DirectoryLdapModel>,
}

/// Secrets are never returned, so they come from `prior`
fn flatten_directory_settings(
    input: Option<&CacheDirectorySettings>,
    prior: &HpcCacheModel,
) -> Result<DirectoryModels> {
    let mut models = DirectoryModels::default();
    let Some(settings) = input else {
        return Ok(models);
    };
    let Some(download) = settings.username_download.as_ref() else {
        return Ok(models);
    };

    match download.username_source.as_deref() {
        None | Some("None") => {}
        Some(USERNAME_SOURCE_AD) => {
            let ad = settings.active_directory.clone().unwrap_or_default();
            let configured = prior.directory_active_directory.first();
            models.active_directory.push(DirectoryActiveDirectoryModel {
                dns_primary_ip: ad.primary_dns_ip_address,
                dns_secondary_ip: ad.secondary_dns_ip_address,
                domain_name: ad.domain_name,
                cache_netbios_name: ad.cache_net_bios_name,
                domain_netbios_name: ad.domain_net_bios_name,
                username: configured.map(|c| c.username.clone()).unwrap_or_default(),
                password: configured.map(|c| c.password.clone()).unwrap_or_default(),
            });
        }
        Some(USERNAME_SOURCE_FILE) => models.flat_file.push(DirectoryFlatFileModel {
            group_file_uri: download.group_file_uri.clone().unwrap_or_default(),
            password_file_uri: download.user_file_uri.clone().unwrap_or_default(),
        }),
        Some(USERNAME_SOURCE_LDAP) => models.ldap.push(DirectoryLdapModel {
            server: download.ldap_server.clone().unwrap_or_default(),
            base_dn: download.ldap_base_dn.clone().unwrap_or_default(),
            encrypted: download.encrypt_ldap_connection.unwrap_or_default(),
            certificate_validation_uri: download.ca_certificate_uri.clone(),
            download_certificate_automatically: download
                .auto_download_certificate
                .unwrap_or_default(),
            bind: prior
                .directory_ldap
                .first()
                .map(|ldap| ldap.bind.clone())
                .unwrap_or_default(),
        }),
        Some(other) => {
            return Err(ProviderError::Custom(format!(
                "source type {:?} is not supported",
                other
            )))
        }
    }
    Ok(models)
}

/// A cache can finish provisioning without having joined its domain or
/// fetched its directory, which leaves it unusable
fn check_directory_download(cache: &Cache) -> Result<()> {
    let settings = cache.properties.directory_services_settings.as_ref();

    if let Some(ad) = settings.and_then(|s| s.active_directory.as_ref()) {
        let joined = ad.domain_joined.as_deref().ok_or_else(|| {
            ProviderError::Custom("Unexpected nil `activeDirectory` in response".to_string())
        })?;
        if joined != "Yes" {
            return Err(ProviderError::Custom(format!(
                "failed to join domain, current status: {}",
                joined
            )));
        }
        return Ok(());
    }

    let downloaded = settings
        .and_then(|s| s.username_download.as_ref())
        .and_then(|d| d.username_downloaded.as_deref())
        .ok_or_else(|| {
            ProviderError::Custom("Unexpected nil `usernameDownload` in response".to_string())
        })?;

    if downloaded != "Yes" {
        return Err(ProviderError::Custom(format!(
            "failed to download directory info, current status: {}",
            downloaded
        )));
    }
    Ok(())
}

fn schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(build_schema)
}

fn build_schema() -> Schema {
    let not_empty = || Box::new(StringNotEmptyValidator);
    let netbios = || Box::new(FuncValidator::new(validate::netbios_name, "NetBIOS name"));

    SchemaBuilder::new()
        .version(0)
        .description("Manages an HPC cache")
        .attribute(id_attribute())
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .required()
                .force_new()
                .validator(not_empty())
                .build(),
        )
        .attribute(resource_group_name_attribute())
        .attribute(location_attribute())
        .attribute(
            AttributeBuilder::new("cache_size_in_gb", AttributeType::Number)
                .required()
                .force_new()
                .validator(Box::new(IntInSliceValidator {
                    allowed: CACHE_SIZES.to_vec(),
                }))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("subnet_id", AttributeType::String)
                .required()
                .force_new()
                .validator(Box::new(FuncValidator::new(
                    armid::id::validate_resource_id::<SubnetId>,
                    "subnet ID",
                )))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("sku_name", AttributeType::String)
                .required()
                .force_new()
                .validator(Box::new(StringInSliceValidator::new(&[
                    "Standard_2G",
                    "Standard_4G",
                    "Standard_8G",
                    "Standard_L4_5G",
                    "Standard_L9G",
                    "Standard_L16G",
                ])))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("mtu", AttributeType::Number)
                .optional()
                .default(Dynamic::Number(1500.0))
                .validator(Box::new(NumberRangeValidator::between(576.0, 1500.0)))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("ntp_server", AttributeType::String)
                .optional()
                .default(Dynamic::String("time.windows.com".to_string()))
                .validator(not_empty())
                .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "mount_addresses",
                AttributeType::List(Box::new(AttributeType::String)),
            )
            .description("Addresses clients mount the cache on")
            .computed()
            .build(),
        )
        .attribute(
            AttributeBuilder::new("key_vault_key_id", AttributeType::String)
                .description("Versioned Key Vault key used to encrypt the cache")
                .optional()
                .validator(Box::new(FuncValidator::new(
                    key_vault::nested_item_id,
                    "Key Vault key ID",
                )))
                .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "automatically_rotate_key_to_latest_enabled",
                AttributeType::Bool,
            )
            .optional()
            .default(Dynamic::Bool(false))
            .build(),
        )
        .attribute(tags_attribute())
        .block(
            NestedBlockBuilder::new("dns", NestingMode::List)
                .max_items(1)
                .attribute(
                    AttributeBuilder::new(
                        "servers",
                        AttributeType::List(Box::new(AttributeType::String)),
                    )
                    .required()
                    .validator(Box::new(ListLengthValidator {
                        min: None,
                        max: Some(3),
                    }))
                    .validator(Box::new(EachElementValidator {
                        inner: Box::new(IpAddressValidator),
                    }))
                    .build(),
                )
                .attribute(
                    AttributeBuilder::new("search_domain", AttributeType::String)
                        .optional()
                        .validator(not_empty())
                        .build(),
                )
                .build(),
        )
        .block(
            NestedBlockBuilder::new("directory_active_directory", NestingMode::List)
                .description("Join an Active Directory domain for username lookups")
                .max_items(1)
                .attribute(
                    AttributeBuilder::new("dns_primary_ip", AttributeType::String)
                        .required()
                        .validator(Box::new(IpAddressValidator))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("dns_secondary_ip", AttributeType::String)
                        .optional()
                        .validator(Box::new(IpAddressValidator))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("domain_name", AttributeType::String)
                        .required()
                        .validator(not_empty())
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("cache_netbios_name", AttributeType::String)
                        .required()
                        .validator(netbios())
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("domain_netbios_name", AttributeType::String)
                        .required()
                        .validator(netbios())
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("username", AttributeType::String)
                        .required()
                        .validator(not_empty())
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("password", AttributeType::String)
                        .required()
                        .sensitive()
                        .validator(not_empty())
                        .build(),
                )
                .build(),
        )
        .block(
            NestedBlockBuilder::new("directory_ldap", NestingMode::List)
                .description("Look up usernames and groups from an LDAP server")
                .max_items(1)
                .attribute(
                    AttributeBuilder::new("server", AttributeType::String)
                        .required()
                        .validator(not_empty())
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("base_dn", AttributeType::String)
                        .required()
                        .validator(not_empty())
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("encrypted", AttributeType::Bool)
                        .optional()
                        .default(Dynamic::Bool(false))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("certificate_validation_uri", AttributeType::String)
                        .optional()
                        .validator(not_empty())
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new(
                        "download_certificate_automatically",
                        AttributeType::Bool,
                    )
                    .optional()
                    .default(Dynamic::Bool(false))
                    .build(),
                )
                .block(
                    NestedBlockBuilder::new("bind", NestingMode::List)
                        .max_items(1)
                        .computed()
                        .attribute(
                            AttributeBuilder::new("dn", AttributeType::String)
                                .required()
                                .validator(not_empty())
                                .build(),
                        )
                        .attribute(
                            AttributeBuilder::new("password", AttributeType::String)
                                .required()
                                .sensitive()
                                .validator(not_empty())
                                .build(),
                        )
                        .build(),
                )
                .build(),
        )
        .block(
            NestedBlockBuilder::new("identity", NestingMode::List)
                .max_items(1)
                .force_new()
                .attribute(
                    AttributeBuilder::new("type", AttributeType::String)
                        .required()
                        .force_new()
                        .validator(Box::new(StringInSliceValidator::new(&[
                            IDENTITY_SYSTEM,
                            IDENTITY_USER,
                            IDENTITY_SYSTEM_AND_USER,
                        ])))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new(
                        "identity_ids",
                        AttributeType::Set(Box::new(AttributeType::String)),
                    )
                    .optional()
                    .force_new()
                    .validator(Box::new(EachElementValidator {
                        inner: Box::new(FuncValidator::new(
                            armid::id::validate_resource_id::<UserAssignedIdentityId>,
                            "user assigned identity ID",
                        )),
                    }))
                    .build(),
                )
                .attribute(
                    AttributeBuilder::new("principal_id", AttributeType::String)
                        .computed()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("tenant_id", AttributeType::String)
                        .computed()
                        .build(),
                )
                .build(),
        )
        .block(
            NestedBlockBuilder::new("directory_flat_file", NestingMode::List)
                .description("Look up usernames and groups from flat files")
                .max_items(1)
                .attribute(
                    AttributeBuilder::new("group_file_uri", AttributeType::String)
                        .required()
                        .validator(not_empty())
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("password_file_uri", AttributeType::String)
                        .required()
                        .validator(not_empty())
                        .build(),
                )
                .build(),
        )
        .block(
            NestedBlockBuilder::new("default_access_policy", NestingMode::List)
                .min_items(1)
                .max_items(1)
                .computed()
                .block(access_rule_block())
                .build(),
        )
        .build()
}

#[derive(Default)]
pub struct HpcCacheResource {
    provider_data: Option<AzureRmProviderData>,
}

impl HpcCacheResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared by create and update. Existing access policies are kept and
    /// the `default` policy is inserted or replaced. `prior` is `None` on
    /// create.
    async fn create_or_update(
        ctx: &Context,
        data: &AzureRmProviderData,
        id: &CacheId,
        model: &HpcCacheModel,
        prior: Option<&HpcCacheModel>,
    ) -> Result<HpcCacheModel> {
        let api = data.client.storage_cache();
        let is_new = prior.is_none();

        if is_new {
            match api.get(id).await {
                Ok(_) => return Err(ProviderError::requires_import(RESOURCE_TYPE, id.id())),
                Err(e) if e.is_not_found() => {}
                Err(source) => {
                    return Err(ProviderError::Api {
                        context: format!("checking for presence of existing {}", id),
                        source,
                    })
                }
            }
        }

        check_sku_and_size(&model.sku_name, model.cache_size_in_gb)?;

        let key_changed = match prior {
            Some(prior) => {
                if prior.key_vault_key_id().is_some() != model.key_vault_key_id().is_some() {
                    return Err(ProviderError::InvalidConfiguration(
                        "`key_vault_key_id` can not be added or removed after HPC Cache is created"
                            .to_string(),
                    ));
                }
                prior.key_vault_key_id() != model.key_vault_key_id()
            }
            None => true,
        };

        let _lock = data.locks.lock(&id.id()).await;

        let mut access_policies = Vec::new();
        if !is_new {
            let existing = api
                .get(id)
                .await
                .context(|| format!("retrieving existing {}", id))?;
            access_policies = existing.access_policies().to_vec();
        }
        if let Some(policy) = model.default_access_policy() {
            access_policies = insert_or_update_access_policy(access_policies, policy)?;
        }

        let mut cache = model.expand(access_policies)?;

        // a new or changed key resets rotation on the service side, so
        // turning it back on takes a second write
        let mut write_twice = false;
        if let Some(key_url) = model.key_vault_key_id() {
            let source_vault_id = check_key_vault(data, key_url, &model.location).await?;
            cache.properties.encryption_settings = model.encryption_settings(source_vault_id);
            write_twice = key_changed && model.automatically_rotate_key_to_latest_enabled;
        }

        api.create_or_update_then_poll(ctx, id, &cache)
            .await
            .context(|| format!("creating/updating {}", id))?;
        if write_twice {
            tracing::debug!("re-applying key rotation setting on {}", id);
            api.create_or_update_then_poll(ctx, id, &cache)
                .await
                .context(|| format!("updating {}", id))?;
        }

        if cache.properties.directory_services_settings.is_some() {
            let current = api.get(id).await.context(|| format!("retrieving {}", id))?;
            check_directory_download(&current)?;
        }

        api.wait_for_provisioning(ctx, id)
            .await
            .context(|| format!("waiting for the provisioning state of {}", id))?;

        let current = api.get(id).await.context(|| format!("retrieving {}", id))?;
        HpcCacheModel::flatten(id, &current, model)
    }
}

/// The vault holding a customer-managed key must sit in the cache's region
/// with soft delete and purge protection on. Returns the vault's ID.
async fn check_key_vault(
    data: &AzureRmProviderData,
    key_url: &str,
    cache_location: &str,
) -> Result<String> {
    let key = NestedItemId::parse(key_url).map_err(ProviderError::InvalidConfiguration)?;
    let vaults = data.client.key_vaults();

    let vault_id = vaults
        .find_by_name(&data.subscription_id, key.vault_name())
        .await
        .context(|| format!("looking up the Key Vault at {}", key.vault_base_url))?
        .ok_or_else(|| {
            ProviderError::Custom(format!(
                "Unable to determine the Resource ID for the Key Vault at URL {:?}",
                key.vault_base_url
            ))
        })?;
    let vault = vaults
        .get(&vault_id)
        .await
        .context(|| format!("retrieving {}", vault_id))?;

    let invalid = |reason: &str| {
        Err(ProviderError::InvalidConfiguration(format!(
            "validating Key Vault {:?} (Resource Group {:?}) for HPC Cache: {}",
            vault_id.vault_name, vault_id.resource_group_name, reason
        )))
    };
    if location::normalize(&vault.location) != location::normalize(cache_location) {
        return invalid("Key Vault must be in the same region as HPC Cache!");
    }
    if !vault.soft_delete_enabled() {
        return invalid("Soft Delete must be enabled but it isn't!");
    }
    if !vault.purge_protection_enabled() {
        return invalid("Purge Protection must be enabled but it isn't!");
    }

    Ok(vault_id.id())
}

/// Rules the schema cannot express: a single directory source and the
/// settings that only make sense together
fn check_config_combinations(config: &DynamicValue) -> Vec<Diagnostic> {
    let is_set = |path: &str| {
        config
            .get(&AttributePath::parse(path))
            .is_some_and(|v| match v {
                Dynamic::List(items) => !items.is_empty(),
                Dynamic::String(s) => !s.is_empty(),
                other => !other.is_null(),
            })
    };
    let mut diagnostics = Vec::new();

    let sources: Vec<&str> = [
        "directory_active_directory",
        "directory_flat_file",
        "directory_ldap",
    ]
    .into_iter()
    .filter(|name| is_set(*name))
    .collect();
    if sources.len() > 1 {
        diagnostics.push(
            Diagnostic::error(
                "Conflicting configuration arguments",
                format!("only one of {} can be specified", sources.join(", ")),
            )
            .with_attribute(AttributePath::new(sources[1])),
        );
    }

    let enabled = |path: &str| config.get_bool(&AttributePath::parse(path)).unwrap_or(false);
    let required_with = [
        ("key_vault_key_id", "identity", is_set("key_vault_key_id")),
        (
            "automatically_rotate_key_to_latest_enabled",
            "key_vault_key_id",
            enabled("automatically_rotate_key_to_latest_enabled"),
        ),
        (
            "directory_ldap.0.download_certificate_automatically",
            "directory_ldap.0.certificate_validation_uri",
            enabled("directory_ldap.0.download_certificate_automatically"),
        ),
    ];
    for (path, needs, used) in required_with {
        if used && !is_set(needs) {
            diagnostics.push(
                Diagnostic::error(
                    "Missing required argument",
                    format!("\"{}\": all of `{}` must be specified", path, needs),
                )
                .with_attribute(AttributePath::parse(path)),
            );
        }
    }

    diagnostics
}

#[async_trait]
impl Resource for HpcCacheResource {
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
        let mut diagnostics = check_config_combinations(&request.config);

        let sku = request.config.get_string(&AttributePath::new("sku_name"));
        let size = request.config.get_number(&AttributePath::new("cache_size_in_gb"));
        if let (Ok(sku), Ok(size)) = (sku, size) {
            if let Err(e) = check_sku_and_size(&sku, size as i64) {
                diagnostics.push(
                    error_diagnostic("Invalid cache size", &e)
                        .with_attribute(AttributePath::new("cache_size_in_gb")),
                );
            }
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
            let model: HpcCacheModel = request.planned_state.decode()?;
            let id = CacheId::new(&data.subscription_id, &model.resource_group_name, &model.name);
            Self::create_or_update(&ctx, data, &id, &model, None).await
        }
        .await;

        match result
            .map_err(|e| error_diagnostic("Failed to create HPC cache", &e))
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
            let prior: HpcCacheModel = request.current_state.decode()?;
            let id = prior.cache_id()?;
            match data.client.storage_cache().get(&id).await {
                Ok(cache) => HpcCacheModel::flatten(&id, &cache, &prior).map(Some),
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
            .map_err(|e| error_diagnostic("Failed to read HPC cache", &e))
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
            let prior: HpcCacheModel = request.prior_state.decode()?;
            let planned: HpcCacheModel = request.planned_state.decode()?;
            let id = prior.cache_id()?;
            Self::create_or_update(&ctx, data, &id, &planned, Some(&prior)).await
        }
        .await;

        match result
            .map_err(|e| error_diagnostic("Failed to update HPC cache", &e))
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
            let model: HpcCacheModel = request.prior_state.decode()?;
            let id = model.cache_id()?;
            match data.client.storage_cache().delete_then_poll(&ctx, &id).await {
                Err(e) if e.is_not_found() => Ok(()),
                other => other.context(|| format!("deleting {}", id)),
            }
        }
        .await;

        if let Err(e) = result {
            diagnostics.push(error_diagnostic("Failed to delete HPC cache", &e));
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for HpcCacheResource {
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

impl ResourceWithModifyPlan for HpcCacheResource {}

#[async_trait]
impl ResourceWithImportState for HpcCacheResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let id = match CacheId::parse_insensitively(&request.id) {
            Ok(id) => id,
            Err(e) => {
                return ImportResourceStateResponse {
                    imported_resources: vec![],
                    diagnostics: vec![invalid_import_id(&e, IMPORT_EXAMPLE)],
                }
            }
        };

        let model = HpcCacheModel {
            id: Some(id.id()),
            name: id.cache_name.clone(),
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
