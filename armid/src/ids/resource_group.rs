use super::resource_group_path;
use crate::error::Result;
use crate::id::ResourceId;
use crate::parser::ParseResult;
use crate::segment::Segment;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceGroupId {
    pub subscription_id: String,
    pub resource_group_name: String,
}

impl ResourceGroupId {
    pub fn new(subscription_id: impl Into<String>, resource_group_name: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
        }
    }
}

impl ResourceId for ResourceGroupId {
    const DESCRIPTION: &'static str = "Resource Group";

    fn segments() -> Vec<Segment> {
        Segment::resource_group_prefix().to_vec()
    }

    fn from_parse_result(result: &ParseResult) -> Result<Self> {
        Ok(Self {
            subscription_id: result.required("subscriptionId")?,
            resource_group_name: result.required("resourceGroupName")?,
        })
    }

    fn id(&self) -> String {
        resource_group_path(&self.subscription_id, &self.resource_group_name)
    }
}

impl fmt::Display for ResourceGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Subscription: {:?}, Resource Group Name: {:?})",
            Self::DESCRIPTION,
            self.subscription_id,
            self.resource_group_name
        )
    }
}
