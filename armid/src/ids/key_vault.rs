use super::resource_group_path;
use crate::error::Result;
use crate::id::ResourceId;
use crate::parser::ParseResult;
use crate::segment::Segment;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyVaultId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub vault_name: String,
}

impl KeyVaultId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        vault_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            vault_name: vault_name.into(),
        }
    }
}

impl ResourceId for KeyVaultId {
    const DESCRIPTION: &'static str = "Key Vault";

    fn segments() -> Vec<Segment> {
        let mut segments = Segment::resource_group_prefix().to_vec();
        segments.extend([
            Segment::static_segment("staticProviders", "providers"),
            Segment::resource_provider("staticMicrosoftKeyVault", "Microsoft.KeyVault"),
            Segment::static_segment("staticVaults", "vaults"),
            Segment::user_specified("vaultName", "vaultValue"),
        ]);
        segments
    }

    fn from_parse_result(result: &ParseResult) -> Result<Self> {
        Ok(Self {
            subscription_id: result.required("subscriptionId")?,
            resource_group_name: result.required("resourceGroupName")?,
            vault_name: result.required("vaultName")?,
        })
    }

    fn id(&self) -> String {
        format!(
            "{}/providers/Microsoft.KeyVault/vaults/{}",
            resource_group_path(&self.subscription_id, &self.resource_group_name),
            self.vault_name
        )
    }
}

impl fmt::Display for KeyVaultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Subscription: {:?}, Resource Group Name: {:?}, Vault Name: {:?})",
            Self::DESCRIPTION,
            self.subscription_id,
            self.resource_group_name,
            self.vault_name
        )
    }
}
