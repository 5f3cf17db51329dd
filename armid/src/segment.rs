//! Segment definitions describing the shape of a resource ID
//!
//! A typed resource ID declares its path as an ordered list of segments.
//! Literal segments (`subscriptions`, `providers`, `Microsoft.DataBox`, ...)
//! must appear verbatim, variable segments capture the value at that position.

/// Kind of a single path component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Fixed collection key such as `resourceGroups` or `jobs`
    Static(&'static str),
    /// Resource provider namespace such as `Microsoft.StorageCache`
    ResourceProvider(&'static str),
    /// Subscription ID value
    SubscriptionId,
    /// Resource group name value
    ResourceGroup,
    /// Any other user supplied value (resource names)
    UserSpecified,
    /// A nested resource ID of arbitrary depth, only valid as the first segment
    Scope,
}

/// Segment is one declared component of a resource ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub name: &'static str,
    pub kind: SegmentKind,
    pub example: &'static str,
}

impl Segment {
    pub const fn static_segment(name: &'static str, value: &'static str) -> Self {
        Self {
            name,
            kind: SegmentKind::Static(value),
            example: value,
        }
    }

    pub const fn resource_provider(name: &'static str, value: &'static str) -> Self {
        Self {
            name,
            kind: SegmentKind::ResourceProvider(value),
            example: value,
        }
    }

    pub const fn subscription_id(name: &'static str) -> Self {
        Self {
            name,
            kind: SegmentKind::SubscriptionId,
            example: "12345678-1234-9876-4563-123456789012",
        }
    }

    pub const fn resource_group(name: &'static str) -> Self {
        Self {
            name,
            kind: SegmentKind::ResourceGroup,
            example: "example-resource-group",
        }
    }

    pub const fn user_specified(name: &'static str, example: &'static str) -> Self {
        Self {
            name,
            kind: SegmentKind::UserSpecified,
            example,
        }
    }

    pub const fn scope(name: &'static str) -> Self {
        Self {
            name,
            kind: SegmentKind::Scope,
            example: "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/some-resource-group",
        }
    }

    /// Literal value for static and provider segments
    pub fn literal(&self) -> Option<&'static str> {
        match self.kind {
            SegmentKind::Static(value) | SegmentKind::ResourceProvider(value) => Some(value),
            _ => None,
        }
    }

    /// The first segments shared by every resource scoped to a resource group
    pub fn resource_group_prefix() -> [Segment; 4] {
        [
            Segment::static_segment("staticSubscriptions", "subscriptions"),
            Segment::subscription_id("subscriptionId"),
            Segment::static_segment("staticResourceGroups", "resourceGroups"),
            Segment::resource_group("resourceGroupName"),
        ]
    }
}
