//! Loose parsing of arbitrary ARM resource IDs
//!
//! Used where a field accepts "any resource ID" rather than one specific type,
//! e.g. the destination accounts of a Data Box job.

use crate::error::{ParseError, Result};
use std::fmt;

/// An ARM resource ID broken into key/value pairs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericResourceId {
    pub subscription_id: String,
    pub resource_group: Option<String>,
    pub provider: Option<String>,
    pub path: Vec<(String, String)>,
}

impl GenericResourceId {
    pub fn parse(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Err(ParseError::Empty);
        }

        let trimmed = input.trim_matches('/');
        let components: Vec<&str> = trimmed.split('/').collect();
        if components.len() % 2 != 0 {
            return Err(ParseError::OddSegmentCount {
                input: input.to_string(),
            });
        }

        let mut subscription_id = None;
        let mut resource_group = None;
        let mut provider = None;
        let mut path = Vec::new();

        for pair in components.chunks(2) {
            let (key, value) = (pair[0], pair[1]);
            if key.is_empty() || value.is_empty() {
                return Err(ParseError::Invalid {
                    input: input.to_string(),
                    reason: format!("key/value pair ({key:?}, {value:?}) is incomplete"),
                });
            }

            match key {
                "subscriptions" if subscription_id.is_none() => {
                    subscription_id = Some(value.to_string())
                }
                k if k.eq_ignore_ascii_case("resourceGroups") && resource_group.is_none() => {
                    resource_group = Some(value.to_string())
                }
                "providers" if provider.is_none() => provider = Some(value.to_string()),
                _ => path.push((key.to_string(), value.to_string())),
            }
        }

        let subscription_id = subscription_id.ok_or_else(|| ParseError::MissingKey {
            input: input.to_string(),
            key: "subscriptions".to_string(),
        })?;

        Ok(Self {
            subscription_id,
            resource_group,
            provider,
            path,
        })
    }

    /// Look up the value following `key` in the provider path
    pub fn value(&self, key: &str) -> Option<&str> {
        self.path
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for GenericResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/subscriptions/{}", self.subscription_id)?;
        if let Some(rg) = &self.resource_group {
            write!(f, "/resourceGroups/{}", rg)?;
        }
        if let Some(provider) = &self.provider {
            write!(f, "/providers/{}", provider)?;
        }
        for (key, value) in &self.path {
            write!(f, "/{}/{}", key, value)?;
        }
        Ok(())
    }
}

/// Validate that `value` is a well formed ARM resource ID of any type
pub fn validate_generic_resource_id(value: &str, key: &str) -> Vec<String> {
    if value.is_empty() {
        return vec![format!("{:?} cannot be an empty string", key)];
    }

    match GenericResourceId::parse(value) {
        Ok(_) => Vec::new(),
        Err(e) => vec![format!("Can not parse {:?} as a resource id: {}", key, e)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_parse_extracts_well_known_keys() {
        let id = GenericResourceId::parse(
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/acc",
        )
        .unwrap();

        assert_eq!(id.subscription_id, "sub");
        assert_eq!(id.resource_group.as_deref(), Some("rg"));
        assert_eq!(id.provider.as_deref(), Some("Microsoft.Storage"));
        assert_eq!(id.value("storageAccounts"), Some("acc"));
    }

    #[test]
    fn generic_parse_accepts_resource_group_ids() {
        let id = GenericResourceId::parse("/subscriptions/sub/resourceGroups/rg").unwrap();
        assert_eq!(id.resource_group.as_deref(), Some("rg"));
        assert!(id.provider.is_none());
        assert_eq!(id.to_string(), "/subscriptions/sub/resourceGroups/rg");
    }

    #[test]
    fn generic_parse_rejects_malformed_input() {
        assert!(GenericResourceId::parse("").is_err());
        assert!(GenericResourceId::parse("/subscriptions").is_err());
        assert!(GenericResourceId::parse("/resourceGroups/rg").is_err());
        assert!(GenericResourceId::parse("/subscriptions//resourceGroups/rg").is_err());
    }

    #[test]
    fn validate_generic_resource_id_reports_key() {
        assert!(validate_generic_resource_id("/subscriptions/sub", "scope").is_empty());

        let errors = validate_generic_resource_id("not-an-id", "scope");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("scope"));
    }
}
