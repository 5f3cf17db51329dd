use super::resource_group_path;
use crate::error::Result;
use crate::id::ResourceId;
use crate::parser::ParseResult;
use crate::segment::Segment;
use std::fmt;

/// ID of a subnet inside a virtual network
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubnetId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub virtual_network_name: String,
    pub subnet_name: String,
}

impl SubnetId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        virtual_network_name: impl Into<String>,
        subnet_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            virtual_network_name: virtual_network_name.into(),
            subnet_name: subnet_name.into(),
        }
    }
}

impl ResourceId for SubnetId {
    const DESCRIPTION: &'static str = "Subnet";

    fn segments() -> Vec<Segment> {
        let mut segments = Segment::resource_group_prefix().to_vec();
        segments.extend([
            Segment::static_segment("staticProviders", "providers"),
            Segment::resource_provider("staticMicrosoftNetwork", "Microsoft.Network"),
            Segment::static_segment("staticVirtualNetworks", "virtualNetworks"),
            Segment::user_specified("virtualNetworkName", "virtualNetworkValue"),
            Segment::static_segment("staticSubnets", "subnets"),
            Segment::user_specified("subnetName", "subnetValue"),
        ]);
        segments
    }

    fn from_parse_result(result: &ParseResult) -> Result<Self> {
        Ok(Self {
            subscription_id: result.required("subscriptionId")?,
            resource_group_name: result.required("resourceGroupName")?,
            virtual_network_name: result.required("virtualNetworkName")?,
            subnet_name: result.required("subnetName")?,
        })
    }

    fn id(&self) -> String {
        format!(
            "{}/providers/Microsoft.Network/virtualNetworks/{}/subnets/{}",
            resource_group_path(&self.subscription_id, &self.resource_group_name),
            self.virtual_network_name,
            self.subnet_name
        )
    }
}

impl fmt::Display for SubnetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Subscription: {:?}, Resource Group Name: {:?}, Virtual Network Name: {:?}, Subnet Name: {:?})",
            Self::DESCRIPTION,
            self.subscription_id,
            self.resource_group_name,
            self.virtual_network_name,
            self.subnet_name
        )
    }
}
