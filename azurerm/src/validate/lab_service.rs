//! Lab Service lab field validators

use armid::GenericResourceId;
use regex::Regex;
use std::sync::OnceLock;

use super::{length_between, matches};

pub fn lab_name(value: &str, key: &str) -> Vec<String> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    if !matches(&RE, r"^[-\w._()]{1,100}$", value) {
        return vec![format!(
            "{:?} must be between 1 and 100 characters and may contain only letters, numbers, underscores, periods, parentheses or hyphens",
            key
        )];
    }
    Vec::new()
}

pub fn lab_title(value: &str, key: &str) -> Vec<String> {
    length_between(value, key, 1, 120)
}

pub fn lab_description(value: &str, key: &str) -> Vec<String> {
    length_between(value, key, 1, 500)
}

/// Windows and Linux compatible account name
pub fn lab_username(value: &str, key: &str) -> Vec<String> {
    const FORBIDDEN: &[char] = &[
        '\\', '/', '"', '[', ']', ':', '|', '<', '>', '+', '=', ';', ',', '?', '*', '@', '&',
    ];

    let mut errors = length_between(value, key, 1, 20);
    if value.contains(FORBIDDEN) {
        errors.push(format!(
            "{:?} cannot contain any of the characters {:?}",
            key,
            FORBIDDEN.iter().collect::<String>()
        ));
    }
    if value.ends_with('.') {
        errors.push(format!("{:?} cannot end with a period", key));
    }
    errors
}

/// 8 to 123 characters drawing on at least three of lower case, upper case,
/// digits and special characters
pub fn lab_password(value: &str, key: &str) -> Vec<String> {
    let mut errors = length_between(value, key, 8, 123);

    let classes = [
        value.chars().any(|c| c.is_ascii_lowercase()),
        value.chars().any(|c| c.is_ascii_uppercase()),
        value.chars().any(|c| c.is_ascii_digit()),
        value.chars().any(|c| !c.is_ascii_alphanumeric()),
    ];
    if classes.iter().filter(|present| **present).count() < 3 {
        errors.push(format!(
            "{:?} must contain at least three of: a lower case character, an upper case character, a digit and a special character",
            key
        ));
    }
    errors
}

/// `major.minor.patch` or `latest`
pub fn lab_image_version(value: &str, key: &str) -> Vec<String> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    if value != "latest" && !matches(&RE, r"^\d+\.\d+\.\d+$", value) {
        return vec![format!(
            "{:?} must be in the format `major.minor.patch` or be `latest`, got {:?}",
            key, value
        )];
    }
    Vec::new()
}

pub fn lab_sku_name(value: &str, key: &str) -> Vec<String> {
    if value.trim().is_empty() {
        return vec![format!("{:?} must not be empty", key)];
    }
    Vec::new()
}

pub fn iso8601_duration(value: &str, key: &str) -> Vec<String> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = r"^P(\d+Y)?(\d+M)?(\d+W)?(\d+D)?(T(\d+H)?(\d+M)?(\d+(\.\d+)?S)?)?$";
    if value == "P" || value.ends_with('T') || !matches(&RE, pattern, value) {
        return vec![format!(
            "{:?} expected to be an ISO 8601 duration, got {:?}",
            key, value
        )];
    }
    Vec::new()
}

/// Compute gallery image, optionally pinned to a version
pub fn shared_image_id(value: &str, key: &str) -> Vec<String> {
    let id = match GenericResourceId::parse(value) {
        Ok(id) => id,
        Err(e) => return vec![format!("{}: {}", key, e)],
    };

    let is_gallery_image = id
        .provider
        .as_deref()
        .is_some_and(|p| p.eq_ignore_ascii_case("Microsoft.Compute"))
        && id.value("galleries").is_some()
        && id.value("images").is_some();
    if !is_gallery_image {
        return vec![format!(
            "{:?} expected to be a Shared Image ID (`.../providers/Microsoft.Compute/galleries/{{gallery}}/images/{{image}}`), got {:?}",
            key, value
        )];
    }
    Vec::new()
}
