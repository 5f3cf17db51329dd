//! HPC cache resources
//!
//! Access policies live inside the cache's security settings, so both the
//! cache resource (for the `default` policy) and the access policy resource
//! edit the same list. Every edit is a read-modify-write of the whole cache
//! taken under a lock on the cache ID.

mod access_policy;
mod cache;

pub use access_policy::{HpcCacheAccessPolicyModel, HpcCacheAccessPolicyResource};
pub use cache::{HpcCacheModel, HpcCacheResource};

use serde::{Deserialize, Serialize};

use crate::api::storage_cache::{Cache, CacheSecuritySettings, NfsAccessPolicy, NfsAccessRule};
use crate::error::{ProviderError, Result};
use crate::schema::{AttributeBuilder, AttributeType, NestedBlock, NestedBlockBuilder, NestingMode};
use crate::validator::{NumberRangeValidator, StringInSliceValidator, StringNotEmptyValidator};

pub(crate) fn get_access_policy_by_name<'a>(
    policies: &'a [NfsAccessPolicy],
    name: &str,
) -> Option<&'a NfsAccessPolicy> {
    policies.iter().find(|p| p.name == name)
}

/// Replace the policy with the same name, or append it
pub(crate) fn insert_or_update_access_policy(
    mut policies: Vec<NfsAccessPolicy>,
    policy: NfsAccessPolicy,
) -> Result<Vec<NfsAccessPolicy>> {
    if policy.name.is_empty() {
        return Err(ProviderError::Custom(
            "the name of the HPC Cache access policy is empty".to_string(),
        ));
    }

    match policies.iter_mut().find(|p| p.name == policy.name) {
        Some(existing) => *existing = policy,
        None => policies.push(policy),
    }
    Ok(policies)
}

pub(crate) fn delete_access_policy_by_name(
    policies: Vec<NfsAccessPolicy>,
    name: &str,
) -> Vec<NfsAccessPolicy> {
    policies.into_iter().filter(|p| p.name != name).collect()
}

pub(crate) fn set_access_policies(cache: &mut Cache, policies: Vec<NfsAccessPolicy>) {
    cache.properties.security_settings = Some(CacheSecuritySettings {
        access_policies: policies,
    });
}

/// One NFS access rule as it appears in configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessRuleModel {
    pub scope: String,
    pub access: String,
    pub filter: Option<String>,
    pub suid_enabled: bool,
    pub submount_access_enabled: bool,
    pub root_squash_enabled: bool,
    pub anonymous_uid: i64,
    pub anonymous_gid: i64,
}

impl AccessRuleModel {
    pub(crate) fn expand(&self) -> NfsAccessRule {
        NfsAccessRule {
            scope: self.scope.clone(),
            filter: self.filter.clone(),
            access: self.access.clone(),
            suid: Some(self.suid_enabled),
            submount_access: Some(self.submount_access_enabled),
            root_squash: Some(self.root_squash_enabled),
            anonymous_uid: Some(self.anonymous_uid.to_string()),
            anonymous_gid: Some(self.anonymous_gid.to_string()),
        }
    }

    pub(crate) fn flatten(rule: &NfsAccessRule) -> Result<Self> {
        let numeric = |value: &Option<String>, field: &str| -> Result<i64> {
            match value.as_deref() {
                None | Some("") => Ok(0),
                Some(v) => v.parse().map_err(|_| {
                    ProviderError::Custom(format!("converting `{}` from string to int", field))
                }),
            }
        };

        Ok(Self {
            scope: rule.scope.clone(),
            access: rule.access.clone(),
            filter: rule.filter.clone().filter(|f| !f.is_empty()),
            suid_enabled: rule.suid.unwrap_or_default(),
            submount_access_enabled: rule.submount_access.unwrap_or_default(),
            root_squash_enabled: rule.root_squash.unwrap_or_default(),
            anonymous_uid: numeric(&rule.anonymous_uid, "anonymous_uid")?,
            anonymous_gid: numeric(&rule.anonymous_gid, "anonymous_gid")?,
        })
    }
}

pub(crate) fn expand_access_rules(rules: &[AccessRuleModel]) -> Vec<NfsAccessRule> {
    rules.iter().map(AccessRuleModel::expand).collect()
}

pub(crate) fn flatten_access_rules(rules: &[NfsAccessRule]) -> Result<Vec<AccessRuleModel>> {
    rules.iter().map(AccessRuleModel::flatten).collect()
}

/// The `access_rule` block shared by both resources
pub(crate) fn access_rule_block() -> NestedBlock {
    let flag = |name: &str| AttributeBuilder::new(name, AttributeType::Bool).optional().build();
    let id = |name: &str| {
        AttributeBuilder::new(name, AttributeType::Number)
            .optional()
            .validator(Box::new(NumberRangeValidator {
                min: Some(0.0),
                max: None,
            }))
            .build()
    };

    NestedBlockBuilder::new("access_rule", NestingMode::Set)
        .description("NFS access rules, at most one per scope and filter")
        .min_items(1)
        .max_items(3)
        .attribute(
            AttributeBuilder::new("scope", AttributeType::String)
                .required()
                .validator(Box::new(StringInSliceValidator::new(&["default", "network", "host"])))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("access", AttributeType::String)
                .required()
                .validator(Box::new(StringInSliceValidator::new(&["rw", "ro", "no"])))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("filter", AttributeType::String)
                .optional()
                .validator(Box::new(StringNotEmptyValidator))
                .build(),
        )
        .attribute(flag("suid_enabled"))
        .attribute(flag("submount_access_enabled"))
        .attribute(flag("root_squash_enabled"))
        .attribute(id("anonymous_uid"))
        .attribute(id("anonymous_gid"))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(name: &str, access: &str) -> NfsAccessPolicy {
        NfsAccessPolicy {
            name: name.to_string(),
            access_rules: vec![NfsAccessRule {
                scope: "default".to_string(),
                access: access.to_string(),
                ..Default::default()
            }],
        }
    }

    #[test]
    fn insert_appends_new_and_replaces_existing_policy() {
        let policies = vec![policy("default", "rw"), policy("readonly", "ro")];

        let updated = insert_or_update_access_policy(policies, policy("default", "no")).unwrap();
        assert_eq!(updated.len(), 2);
        assert_eq!(updated[0].access_rules[0].access, "no");

        let updated = insert_or_update_access_policy(updated, policy("other", "rw")).unwrap();
        assert_eq!(updated.len(), 3);
        assert_eq!(updated[2].name, "other");
    }

    #[test]
    fn insert_rejects_unnamed_policy() {
        assert!(insert_or_update_access_policy(vec![], policy("", "rw")).is_err());
    }

    #[test]
    fn delete_keeps_other_policies() {
        let policies = vec![policy("default", "rw"), policy("readonly", "ro")];
        let remaining = delete_access_policy_by_name(policies, "readonly");
        assert_eq!(remaining.len(), 1);
        assert!(get_access_policy_by_name(&remaining, "readonly").is_none());
        assert!(get_access_policy_by_name(&remaining, "default").is_some());
    }

    #[test]
    fn anonymous_ids_are_sent_as_strings() {
        let rule = AccessRuleModel {
            scope: "default".to_string(),
            access: "rw".to_string(),
            root_squash_enabled: true,
            anonymous_uid: 65534,
            anonymous_gid: 100,
            ..Default::default()
        };

        let expanded = rule.expand();
        assert_eq!(expanded.anonymous_uid.as_deref(), Some("65534"));
        assert_eq!(expanded.anonymous_gid.as_deref(), Some("100"));
        assert_eq!(AccessRuleModel::flatten(&expanded).unwrap(), rule);
    }

    #[test]
    fn non_numeric_anonymous_id_is_an_error() {
        let rule = NfsAccessRule {
            scope: "default".to_string(),
            access: "rw".to_string(),
            anonymous_uid: Some("nobody".to_string()),
            ..Default::default()
        };
        let err = AccessRuleModel::flatten(&rule).unwrap_err();
        assert_eq!(err.to_string(), "converting `anonymous_uid` from string to int");
    }
}
