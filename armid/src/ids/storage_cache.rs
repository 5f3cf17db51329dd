use super::resource_group_path;
use crate::error::Result;
use crate::id::ResourceId;
use crate::parser::ParseResult;
use crate::segment::Segment;
use std::fmt;

/// ID of an HPC cache
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub cache_name: String,
}

impl CacheId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        cache_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            cache_name: cache_name.into(),
        }
    }

    fn cache_segments() -> Vec<Segment> {
        let mut segments = Segment::resource_group_prefix().to_vec();
        segments.extend([
            Segment::static_segment("staticProviders", "providers"),
            Segment::resource_provider("staticMicrosoftStorageCache", "Microsoft.StorageCache"),
            Segment::static_segment("staticCaches", "caches"),
            Segment::user_specified("cacheName", "cacheValue"),
        ]);
        segments
    }
}

impl ResourceId for CacheId {
    const DESCRIPTION: &'static str = "Cache";

    fn segments() -> Vec<Segment> {
        Self::cache_segments()
    }

    fn from_parse_result(result: &ParseResult) -> Result<Self> {
        Ok(Self {
            subscription_id: result.required("subscriptionId")?,
            resource_group_name: result.required("resourceGroupName")?,
            cache_name: result.required("cacheName")?,
        })
    }

    fn id(&self) -> String {
        format!(
            "{}/providers/Microsoft.StorageCache/caches/{}",
            resource_group_path(&self.subscription_id, &self.resource_group_name),
            self.cache_name
        )
    }
}

impl fmt::Display for CacheId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Subscription: {:?}, Resource Group Name: {:?}, Cache Name: {:?})",
            Self::DESCRIPTION,
            self.subscription_id,
            self.resource_group_name,
            self.cache_name
        )
    }
}

/// ID of a named access policy within an HPC cache.
///
/// Access policies are not ARM resources in their own right; the ID is
/// the cache ID with a `cacheAccessPolicies/{name}` suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheAccessPolicyId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub cache_name: String,
    pub access_policy_name: String,
}

impl CacheAccessPolicyId {
    pub fn new(cache: &CacheId, access_policy_name: impl Into<String>) -> Self {
        Self {
            subscription_id: cache.subscription_id.clone(),
            resource_group_name: cache.resource_group_name.clone(),
            cache_name: cache.cache_name.clone(),
            access_policy_name: access_policy_name.into(),
        }
    }

    pub fn cache_id(&self) -> CacheId {
        CacheId::new(
            &self.subscription_id,
            &self.resource_group_name,
            &self.cache_name,
        )
    }
}

impl ResourceId for CacheAccessPolicyId {
    const DESCRIPTION: &'static str = "Cache Access Policy";

    fn segments() -> Vec<Segment> {
        let mut segments = CacheId::cache_segments();
        segments.extend([
            Segment::static_segment("staticCacheAccessPolicies", "cacheAccessPolicies"),
            Segment::user_specified("accessPolicyName", "accessPolicyValue"),
        ]);
        segments
    }

    fn from_parse_result(result: &ParseResult) -> Result<Self> {
        Ok(Self {
            subscription_id: result.required("subscriptionId")?,
            resource_group_name: result.required("resourceGroupName")?,
            cache_name: result.required("cacheName")?,
            access_policy_name: result.required("accessPolicyName")?,
        })
    }

    fn id(&self) -> String {
        format!(
            "{}/cacheAccessPolicies/{}",
            self.cache_id().id(),
            self.access_policy_name
        )
    }
}

impl fmt::Display for CacheAccessPolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Subscription: {:?}, Resource Group Name: {:?}, Cache Name: {:?}, Access Policy Name: {:?})",
            Self::DESCRIPTION,
            self.subscription_id,
            self.resource_group_name,
            self.cache_name,
            self.access_policy_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_policy_id_extends_cache_id() {
        let cache = CacheId::new("sub", "rg", "cache1");
        let policy = CacheAccessPolicyId::new(&cache, "policy1");

        assert_eq!(
            policy.id(),
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.StorageCache/caches/cache1/cacheAccessPolicies/policy1"
        );
        assert_eq!(policy.cache_id(), cache);
    }

    #[test]
    fn cache_id_rejects_access_policy_id() {
        let input = "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.StorageCache/caches/cache1/cacheAccessPolicies/policy1";
        assert!(CacheId::parse(input).is_err());
        assert!(CacheAccessPolicyId::parse(input).is_ok());
    }
}
