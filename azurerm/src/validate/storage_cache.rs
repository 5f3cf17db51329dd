//! HPC cache field validators

use super::matches;
use regex::Regex;
use std::sync::OnceLock;

/// Name reserved for the policy managed by the cache resource itself
pub const DEFAULT_ACCESS_POLICY_NAME: &str = "default";

pub fn cache_access_policy_name(value: &str, key: &str) -> Vec<String> {
    if value.trim().is_empty() {
        return vec![format!("{:?} must not be empty", key)];
    }
    if value == DEFAULT_ACCESS_POLICY_NAME {
        return vec![format!(
            "{:?} can not be {:?}, that policy is managed by the `azurerm_hpc_cache` resource",
            key, DEFAULT_ACCESS_POLICY_NAME
        )];
    }
    Vec::new()
}

/// 1 to 15 letters, digits or hyphens
pub fn netbios_name(value: &str, key: &str) -> Vec<String> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();

    if !matches(&RE, r"^[-0-9a-zA-Z]{1,15}$", value) {
        return vec![format!(
            "{:?} must be 1 to 15 letters, digits or hyphens, got {:?}",
            key, value
        )];
    }
    Vec::new()
}
