use super::resource_group_path;
use crate::error::Result;
use crate::id::ResourceId;
use crate::parser::ParseResult;
use crate::segment::Segment;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserAssignedIdentityId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub identity_name: String,
}

impl UserAssignedIdentityId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        identity_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            identity_name: identity_name.into(),
        }
    }
}

impl ResourceId for UserAssignedIdentityId {
    const DESCRIPTION: &'static str = "User Assigned Identity";

    fn segments() -> Vec<Segment> {
        let mut segments = Segment::resource_group_prefix().to_vec();
        segments.extend([
            Segment::static_segment("staticProviders", "providers"),
            Segment::resource_provider(
                "staticMicrosoftManagedIdentity",
                "Microsoft.ManagedIdentity",
            ),
            Segment::static_segment("staticUserAssignedIdentities", "userAssignedIdentities"),
            Segment::user_specified("identityName", "identityValue"),
        ]);
        segments
    }

    fn from_parse_result(result: &ParseResult) -> Result<Self> {
        Ok(Self {
            subscription_id: result.required("subscriptionId")?,
            resource_group_name: result.required("resourceGroupName")?,
            identity_name: result.required("identityName")?,
        })
    }

    fn id(&self) -> String {
        format!(
            "{}/providers/Microsoft.ManagedIdentity/userAssignedIdentities/{}",
            resource_group_path(&self.subscription_id, &self.resource_group_name),
            self.identity_name
        )
    }
}

impl fmt::Display for UserAssignedIdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Subscription: {:?}, Resource Group Name: {:?}, Identity Name: {:?})",
            Self::DESCRIPTION,
            self.subscription_id,
            self.resource_group_name,
            self.identity_name
        )
    }
}
