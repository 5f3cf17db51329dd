use super::resource_group_path;
use crate::error::Result;
use crate::id::ResourceId;
use crate::parser::ParseResult;
use crate::segment::Segment;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageAccountId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub storage_account_name: String,
}

impl StorageAccountId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        storage_account_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            storage_account_name: storage_account_name.into(),
        }
    }
}

impl ResourceId for StorageAccountId {
    const DESCRIPTION: &'static str = "Storage Account";

    fn segments() -> Vec<Segment> {
        let mut segments = Segment::resource_group_prefix().to_vec();
        segments.extend([
            Segment::static_segment("staticProviders", "providers"),
            Segment::resource_provider("staticMicrosoftStorage", "Microsoft.Storage"),
            Segment::static_segment("staticStorageAccounts", "storageAccounts"),
            Segment::user_specified("storageAccountName", "storageAccountValue"),
        ]);
        segments
    }

    fn from_parse_result(result: &ParseResult) -> Result<Self> {
        Ok(Self {
            subscription_id: result.required("subscriptionId")?,
            resource_group_name: result.required("resourceGroupName")?,
            storage_account_name: result.required("storageAccountName")?,
        })
    }

    fn id(&self) -> String {
        format!(
            "{}/providers/Microsoft.Storage/storageAccounts/{}",
            resource_group_path(&self.subscription_id, &self.resource_group_name),
            self.storage_account_name
        )
    }
}

impl fmt::Display for StorageAccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Subscription: {:?}, Resource Group Name: {:?}, Storage Account Name: {:?})",
            Self::DESCRIPTION,
            self.subscription_id,
            self.resource_group_name,
            self.storage_account_name
        )
    }
}
