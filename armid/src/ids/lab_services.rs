use super::resource_group_path;
use crate::error::Result;
use crate::id::ResourceId;
use crate::parser::ParseResult;
use crate::segment::Segment;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub lab_name: String,
}

impl LabId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        lab_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            lab_name: lab_name.into(),
        }
    }
}

impl ResourceId for LabId {
    const DESCRIPTION: &'static str = "Lab";

    fn segments() -> Vec<Segment> {
        let mut segments = Segment::resource_group_prefix().to_vec();
        segments.extend([
            Segment::static_segment("staticProviders", "providers"),
            Segment::resource_provider("staticMicrosoftLabServices", "Microsoft.LabServices"),
            Segment::static_segment("staticLabs", "labs"),
            Segment::user_specified("labName", "labValue"),
        ]);
        segments
    }

    fn from_parse_result(result: &ParseResult) -> Result<Self> {
        Ok(Self {
            subscription_id: result.required("subscriptionId")?,
            resource_group_name: result.required("resourceGroupName")?,
            lab_name: result.required("labName")?,
        })
    }

    fn id(&self) -> String {
        format!(
            "{}/providers/Microsoft.LabServices/labs/{}",
            resource_group_path(&self.subscription_id, &self.resource_group_name),
            self.lab_name
        )
    }
}

impl fmt::Display for LabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Subscription: {:?}, Resource Group Name: {:?}, Lab Name: {:?})",
            Self::DESCRIPTION,
            self.subscription_id,
            self.resource_group_name,
            self.lab_name
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabPlanId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub lab_plan_name: String,
}

impl LabPlanId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        lab_plan_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            lab_plan_name: lab_plan_name.into(),
        }
    }
}

impl ResourceId for LabPlanId {
    const DESCRIPTION: &'static str = "Lab Plan";

    fn segments() -> Vec<Segment> {
        let mut segments = Segment::resource_group_prefix().to_vec();
        segments.extend([
            Segment::static_segment("staticProviders", "providers"),
            Segment::resource_provider("staticMicrosoftLabServices", "Microsoft.LabServices"),
            Segment::static_segment("staticLabPlans", "labPlans"),
            Segment::user_specified("labPlanName", "labPlanValue"),
        ]);
        segments
    }

    fn from_parse_result(result: &ParseResult) -> Result<Self> {
        Ok(Self {
            subscription_id: result.required("subscriptionId")?,
            resource_group_name: result.required("resourceGroupName")?,
            lab_plan_name: result.required("labPlanName")?,
        })
    }

    fn id(&self) -> String {
        format!(
            "{}/providers/Microsoft.LabServices/labPlans/{}",
            resource_group_path(&self.subscription_id, &self.resource_group_name),
            self.lab_plan_name
        )
    }
}

impl fmt::Display for LabPlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Subscription: {:?}, Resource Group Name: {:?}, Lab Plan Name: {:?})",
            Self::DESCRIPTION,
            self.subscription_id,
            self.resource_group_name,
            self.lab_plan_name
        )
    }
}
