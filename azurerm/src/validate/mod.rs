//! Per-service field validators
//!
//! Every validator has the [`ValidateFunc`](crate::validator::ValidateFunc)
//! shape: it takes the value and its attribute key and returns one message
//! per problem found. Schemas wrap them in a
//! [`FuncValidator`](crate::validator::FuncValidator).

pub mod databox;
pub mod key_vault;
pub mod lab_service;
pub mod storage_cache;

use regex::Regex;
use std::sync::OnceLock;

/// Match against a pattern compiled on first use
pub(crate) fn matches(cell: &'static OnceLock<Option<Regex>>, pattern: &str, value: &str) -> bool {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(value))
}

/// Character length check shared by the plain length validators
pub(crate) fn length_between(value: &str, key: &str, min: usize, max: usize) -> Vec<String> {
    let len = value.chars().count();
    if len < min || len > max {
        return vec![format!(
            "{:?} must be between {} and {} characters in length, got {}",
            key, min, max, len
        )];
    }
    Vec::new()
}

/// 1 to 90 characters of letters, digits, underscores, parentheses, hyphens
/// and periods, not ending in a period
pub fn resource_group_name(value: &str, key: &str) -> Vec<String> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();

    let mut errors = Vec::new();
    if !matches(&RE, r"^[-\w._()]+$", value) {
        errors.push(format!(
            "{:?} may only contain alphanumeric characters, dash, underscores, parentheses and periods",
            key
        ));
    }
    if value.chars().count() > 90 {
        errors.push(format!("{:?} may not exceed 90 characters in length", key));
    }
    if value.ends_with('.') {
        errors.push(format!("{:?} may not end with a period", key));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_group_names() {
        assert!(resource_group_name("my-rg_(1).x", "resource_group_name").is_empty());
        assert_eq!(resource_group_name("", "resource_group_name").len(), 1);
        assert_eq!(resource_group_name("rg.", "resource_group_name").len(), 1);
        assert_eq!(resource_group_name("rg with space", "resource_group_name").len(), 1);
        assert_eq!(resource_group_name(&"r".repeat(91), "resource_group_name").len(), 1);
    }

    #[test]
    fn length_between_is_inclusive() {
        assert!(length_between("ab", "k", 2, 3).is_empty());
        assert!(length_between("abc", "k", 2, 3).is_empty());
        assert_eq!(length_between("a", "k", 2, 3).len(), 1);
        assert_eq!(length_between("abcd", "k", 2, 3).len(), 1);
    }

    #[test]
    fn invalid_pattern_never_matches() {
        static BROKEN: OnceLock<Option<Regex>> = OnceLock::new();
        assert!(!matches(&BROKEN, "(unclosed", "anything"));
    }
}
