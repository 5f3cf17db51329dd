//! Key Vault lookups (`Microsoft.KeyVault/vaults`, 2023-07-01)
//!
//! Only what resources need to check a customer-managed key: finding the
//! vault behind a key URL and reading its location and protection flags.

use armid::{KeyVaultId, ResourceId};
use serde::Deserialize;

use super::client::Client;
use super::error::ApiError;

pub const API_VERSION: &str = "2023-07-01";

/// Generic resources listing, used to find a vault by name
const RESOURCES_API_VERSION: &str = "2021-04-01";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Vault {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub properties: VaultProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultProperties {
    pub vault_uri: Option<String>,
    pub enable_soft_delete: Option<bool>,
    pub enable_purge_protection: Option<bool>,
}

impl Vault {
    /// Soft delete defaults to on for vaults that do not report it
    pub fn soft_delete_enabled(&self) -> bool {
        self.properties.enable_soft_delete.unwrap_or(true)
    }

    pub fn purge_protection_enabled(&self) -> bool {
        self.properties.enable_purge_protection.unwrap_or(false)
    }
}

#[derive(Debug, Deserialize)]
struct ResourceList {
    #[serde(default)]
    value: Vec<GenericResource>,
}

#[derive(Debug, Deserialize)]
struct GenericResource {
    id: String,
}

pub struct KeyVaultApi<'a> {
    client: &'a Client,
}

impl<'a> KeyVaultApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &KeyVaultId) -> Result<Vault, ApiError> {
        self.client.get(&id.id(), API_VERSION).await?.json()
    }

    /// Find the vault called `vault_name` in the subscription. `None` when
    /// the subscription has no such vault.
    pub async fn find_by_name(
        &self,
        subscription_id: &str,
        vault_name: &str,
    ) -> Result<Option<KeyVaultId>, ApiError> {
        let filter = format!(
            "resourceType eq 'Microsoft.KeyVault/vaults' and name eq '{}'",
            vault_name
        );
        let list: ResourceList = self
            .client
            .get_with_query(
                &format!("/subscriptions/{}/resources", subscription_id),
                RESOURCES_API_VERSION,
                &[("$filter", filter.as_str())],
            )
            .await?
            .json()?;

        list.value
            .into_iter()
            .next()
            .map(|resource| {
                KeyVaultId::parse_insensitively(&resource.id)
                    .map_err(|e| ApiError::ParseError(e.to_string()))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use crate::api::test_helpers::create_test_client;
    use armid::KeyVaultId;
    use mockito::{Matcher, Server};

    const VAULT_PATH: &str =
        "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.KeyVault/vaults/vault1";

    #[tokio::test]
    async fn find_by_name_filters_on_type_and_name() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/subscriptions/sub/resources")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("api-version".into(), "2021-04-01".into()),
                Matcher::UrlEncoded(
                    "$filter".into(),
                    "resourceType eq 'Microsoft.KeyVault/vaults' and name eq 'vault1'".into(),
                ),
            ]))
            .with_body(format!(r#"{{"value":[{{"id":"{}"}}]}}"#, VAULT_PATH))
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let id = client.key_vaults().find_by_name("sub", "vault1").await.unwrap();

        assert_eq!(id, Some(KeyVaultId::new("sub", "rg", "vault1")));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn find_by_name_without_match_is_none() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/subscriptions/sub/resources")
            .match_query(Matcher::Any)
            .with_body(r#"{"value":[]}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        assert!(client
            .key_vaults()
            .find_by_name("sub", "vault1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn get_reads_protection_flags() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", VAULT_PATH)
            .match_query(Matcher::UrlEncoded("api-version".into(), "2023-07-01".into()))
            .with_body(
                r#"{"location":"westeurope","properties":{"enablePurgeProtection":true}}"#,
            )
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let vault = client
            .key_vaults()
            .get(&KeyVaultId::new("sub", "rg", "vault1"))
            .await
            .unwrap();

        assert_eq!(vault.location, "westeurope");
        assert!(vault.soft_delete_enabled());
        assert!(vault.purge_protection_enabled());
    }
}
