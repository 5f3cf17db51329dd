//! HPC cache API (`Microsoft.StorageCache`, 2023-05-01)

use armid::{CacheId, ResourceId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::client::Client;
use super::error::ApiError;
use crate::context::Context;

pub const API_VERSION: &str = "2023-05-01";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cache {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<CacheSku>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<CacheIdentity>,
    #[serde(default)]
    pub properties: CacheProperties,
}

/// `type` is `SystemAssigned`, `UserAssigned`, both joined by `", "`, or
/// `None`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheIdentity {
    #[serde(rename = "type")]
    pub type_: String,
    /// Read-only
    #[serde(skip_serializing)]
    pub principal_id: Option<String>,
    /// Read-only
    #[serde(skip_serializing)]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub user_assigned_identities: HashMap<String, UserAssignedIdentity>,
}

/// Serialized as `{}`; the service fills in the IDs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAssignedIdentity {
    #[serde(skip_serializing)]
    pub principal_id: Option<String>,
    #[serde(skip_serializing)]
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSku {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheProperties {
    #[serde(rename = "cacheSizeGB", skip_serializing_if = "Option::is_none")]
    pub cache_size_gb: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_settings: Option<CacheNetworkSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_settings: Option<CacheSecuritySettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory_services_settings: Option<CacheDirectorySettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_settings: Option<CacheEncryptionSettings>,
    /// Read-only
    #[serde(skip_serializing)]
    pub provisioning_state: Option<String>,
    /// Read-only
    #[serde(default, skip_serializing)]
    pub mount_addresses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheNetworkSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtu: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ntp_server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_servers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_search_domain: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSecuritySettings {
    #[serde(default)]
    pub access_policies: Vec<NfsAccessPolicy>,
}

/// Named set of NFS access rules
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NfsAccessPolicy {
    pub name: String,
    #[serde(default)]
    pub access_rules: Vec<NfsAccessRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NfsAccessRule {
    pub scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    pub access: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submount_access: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_squash: Option<bool>,
    /// Numeric UID carried as a string
    #[serde(rename = "anonymousUID", skip_serializing_if = "Option::is_none")]
    pub anonymous_uid: Option<String>,
    #[serde(rename = "anonymousGID", skip_serializing_if = "Option::is_none")]
    pub anonymous_gid: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEncryptionSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_encryption_key: Option<KeyVaultKeyReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation_to_latest_key_version_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyVaultKeyReference {
    pub key_url: String,
    #[serde(default)]
    pub source_vault: KeyVaultKeyReferenceSourceVault,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyVaultKeyReferenceSourceVault {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheDirectorySettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_directory: Option<CacheActiveDirectorySettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username_download: Option<CacheUsernameDownloadSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheActiveDirectorySettings {
    pub primary_dns_ip_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_dns_ip_address: Option<String>,
    pub domain_name: String,
    pub cache_net_bios_name: String,
    pub domain_net_bios_name: String,
    /// Read-only: `Yes`, `No` or `Error`
    #[serde(skip_serializing)]
    pub domain_joined: Option<String>,
    /// Never returned by the service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<CacheActiveDirectoryCredentials>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheActiveDirectoryCredentials {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// LDAP bind credentials, never returned by the service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheLdapCredentials {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_dn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheUsernameDownloadSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_groups: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username_source: Option<String>,
    #[serde(rename = "groupFileURI", skip_serializing_if = "Option::is_none")]
    pub group_file_uri: Option<String>,
    #[serde(rename = "userFileURI", skip_serializing_if = "Option::is_none")]
    pub user_file_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ldap_server: Option<String>,
    #[serde(rename = "ldapBaseDN", skip_serializing_if = "Option::is_none")]
    pub ldap_base_dn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypt_ldap_connection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_valid_certificate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_download_certificate: Option<bool>,
    #[serde(rename = "caCertificateURI", skip_serializing_if = "Option::is_none")]
    pub ca_certificate_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<CacheLdapCredentials>,
    /// Read-only: `Yes`, `No` or `Error`
    #[serde(skip_serializing)]
    pub username_downloaded: Option<String>,
}

impl Cache {
    /// Access policies configured on the cache, empty when none are set
    pub fn access_policies(&self) -> &[NfsAccessPolicy] {
        self.properties
            .security_settings
            .as_ref()
            .map(|s| s.access_policies.as_slice())
            .unwrap_or_default()
    }
}

pub struct StorageCacheApi<'a> {
    client: &'a Client,
}

impl<'a> StorageCacheApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &CacheId) -> Result<Cache, ApiError> {
        self.client.get(&id.id(), API_VERSION).await?.json()
    }

    pub async fn create_or_update_then_poll(
        &self,
        ctx: &Context,
        id: &CacheId,
        cache: &Cache,
    ) -> Result<(), ApiError> {
        let path = id.id();
        let response = self.client.put(&path, API_VERSION, cache).await?;
        self.client
            .poller(ctx)
            .wait(&response, &path, API_VERSION)
            .await
    }

    pub async fn delete_then_poll(&self, ctx: &Context, id: &CacheId) -> Result<(), ApiError> {
        let path = id.id();
        let response = self.client.delete(&path, API_VERSION).await?;
        self.client
            .poller(ctx)
            .wait_for_deletion(&response, &path, API_VERSION)
            .await
    }

    /// Block until the cache reports `Succeeded`. Updates to a cache are
    /// rejected while it is still transitioning.
    pub async fn wait_for_provisioning(&self, ctx: &Context, id: &CacheId) -> Result<(), ApiError> {
        let current = self.get(id).await?;
        if current
            .properties
            .provisioning_state
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("Succeeded"))
        {
            return Ok(());
        }
        self.client
            .poller(ctx)
            .wait_for_provisioning_state(&id.id(), API_VERSION, "Succeeded")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};
    use serde_json::json;

    const CACHE_PATH: &str =
        "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.StorageCache/caches/cache1";

    #[test]
    fn access_rule_uses_upper_case_id_names() {
        let rule = NfsAccessRule {
            scope: "default".to_string(),
            access: "rw".to_string(),
            root_squash: Some(true),
            anonymous_uid: Some("65534".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(
            value,
            json!({"scope": "default", "access": "rw", "rootSquash": true, "anonymousUID": "65534"})
        );
    }

    #[test]
    fn read_only_fields_are_not_sent() {
        let mut cache = Cache::default();
        cache.properties.provisioning_state = Some("Succeeded".to_string());
        cache.properties.mount_addresses = vec!["10.0.0.4".to_string()];
        let value = serde_json::to_value(&cache).unwrap();
        assert!(value["properties"].get("provisioningState").is_none());
        assert!(value["properties"].get("mountAddresses").is_none());
    }

    #[tokio::test]
    async fn wait_for_provisioning_returns_when_already_succeeded() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", CACHE_PATH)
            .match_query(Matcher::UrlEncoded("api-version".into(), API_VERSION.into()))
            .with_body(r#"{"location":"westeurope","properties":{"provisioningState":"Succeeded"}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let ctx = Context::new();
        client
            .storage_cache()
            .wait_for_provisioning(&ctx, &CacheId::new("sub", "rg", "cache1"))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn get_parses_access_policies() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", CACHE_PATH)
            .match_query(Matcher::Any)
            .with_body(
                json!({
                    "location": "westeurope",
                    "sku": {"name": "Standard_2G"},
                    "properties": {
                        "cacheSizeGB": 3072,
                        "mountAddresses": ["10.0.0.4", "10.0.0.5"],
                        "securitySettings": {
                            "accessPolicies": [
                                {"name": "default", "accessRules": [{"scope": "default", "access": "rw"}]}
                            ]
                        }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let cache = client
            .storage_cache()
            .get(&CacheId::new("sub", "rg", "cache1"))
            .await
            .unwrap();

        assert_eq!(cache.properties.cache_size_gb, Some(3072));
        assert_eq!(cache.properties.mount_addresses.len(), 2);
        assert_eq!(cache.access_policies()[0].name, "default");
    }
}
