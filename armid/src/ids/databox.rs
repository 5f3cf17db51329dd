use super::resource_group_path;
use crate::error::Result;
use crate::id::ResourceId;
use crate::parser::ParseResult;
use crate::segment::Segment;
use std::fmt;

/// ID of a Data Box import/export order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataBoxJobId {
    pub subscription_id: String,
    pub resource_group: String,
    pub name: String,
}

impl DataBoxJobId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            name: name.into(),
        }
    }
}

impl ResourceId for DataBoxJobId {
    const DESCRIPTION: &'static str = "Data Box Job";

    fn segments() -> Vec<Segment> {
        let mut segments = Segment::resource_group_prefix().to_vec();
        segments.extend([
            Segment::static_segment("staticProviders", "providers"),
            Segment::resource_provider("staticMicrosoftDataBox", "Microsoft.DataBox"),
            Segment::static_segment("staticJobs", "jobs"),
            Segment::user_specified("jobName", "jobValue"),
        ]);
        segments
    }

    fn from_parse_result(result: &ParseResult) -> Result<Self> {
        Ok(Self {
            subscription_id: result.required("subscriptionId")?,
            resource_group: result.required("resourceGroupName")?,
            name: result.required("jobName")?,
        })
    }

    fn id(&self) -> String {
        format!(
            "{}/providers/Microsoft.DataBox/jobs/{}",
            resource_group_path(&self.subscription_id, &self.resource_group),
            self.name
        )
    }
}

impl fmt::Display for DataBoxJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Subscription: {:?}, Resource Group Name: {:?}, Job Name: {:?})",
            Self::DESCRIPTION,
            self.subscription_id,
            self.resource_group,
            self.name
        )
    }
}
