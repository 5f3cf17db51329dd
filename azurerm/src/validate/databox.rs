//! Data Box job field validators

use regex::Regex;
use std::sync::OnceLock;

use super::{length_between, matches};

pub fn data_box_job_name(value: &str, key: &str) -> Vec<String> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    if !matches(&RE, r"^[a-zA-Z0-9][a-zA-Z0-9-]{1,22}[a-zA-Z0-9]$", value) {
        return vec![format!(
            "{:?} must be between 3 and 24 characters in length, begin and end with a letter or number and may contain only letters, numbers or hyphens",
            key
        )];
    }
    Vec::new()
}

pub fn data_box_job_email(value: &str, key: &str) -> Vec<String> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    if !matches(
        &RE,
        r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$",
        value,
    ) {
        return vec![format!("{:?} must be a valid email address, got {:?}", key, value)];
    }
    Vec::new()
}

pub fn data_box_job_contact_name(value: &str, key: &str) -> Vec<String> {
    length_between(value, key, 3, 34)
}

/// Leading `+` followed by 2 to 15 digits
pub fn data_box_job_phone_number(value: &str, key: &str) -> Vec<String> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    if !matches(&RE, r"^\+[0-9]{2,15}$", value) {
        return vec![format!(
            "{:?} must begin with '+' followed by between 2 and 15 digits",
            key
        )];
    }
    Vec::new()
}

pub fn data_box_job_phone_extension(value: &str, key: &str) -> Vec<String> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    if !matches(&RE, r"^[0-9]{0,4}$", value) {
        return vec![format!("{:?} must be at most 4 digits", key)];
    }
    Vec::new()
}

pub fn data_box_job_city(value: &str, key: &str) -> Vec<String> {
    length_between(value, key, 2, 35)
}

pub fn data_box_job_post_code(value: &str, key: &str) -> Vec<String> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    if !matches(&RE, r"^[a-zA-Z0-9][a-zA-Z0-9 -]{0,15}$", value) {
        return vec![format!(
            "{:?} must be at most 16 characters and contain only letters, numbers, spaces or hyphens",
            key
        )];
    }
    Vec::new()
}

pub fn data_box_job_street_address(value: &str, key: &str) -> Vec<String> {
    length_between(value, key, 1, 35)
}

pub fn data_box_job_company_name(value: &str, key: &str) -> Vec<String> {
    length_between(value, key, 2, 35)
}

/// 12 to 32 non-whitespace characters including at least one that is not a
/// letter or digit
pub fn data_box_job_disk_pass_key(value: &str, key: &str) -> Vec<String> {
    static LENGTH: OnceLock<Option<Regex>> = OnceLock::new();
    static SPECIAL: OnceLock<Option<Regex>> = OnceLock::new();

    let mut errors = Vec::new();
    if !matches(&LENGTH, r"^\S{12,32}$", value) {
        errors.push(format!(
            "{:?} must be between 12 and 32 characters without whitespace",
            key
        ));
    }
    if !matches(&SPECIAL, r"[^a-zA-Z0-9]", value) {
        errors.push(format!(
            "{:?} must contain at least one special character",
            key
        ));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_number() {
        assert!(data_box_job_phone_number("+12", "phone_number").is_empty());
        assert_eq!(data_box_job_phone_number("+1", "phone_number").len(), 1);
        assert_eq!(data_box_job_phone_number("12345", "phone_number").len(), 1);
        assert_eq!(
            data_box_job_phone_number("+1234567890123456", "phone_number").len(),
            1
        );
    }

    #[test]
    fn disk_pass_key() {
        assert!(data_box_job_disk_pass_key("2@hellohellohello", "passkey").is_empty());
        assert_eq!(data_box_job_disk_pass_key("hellohellohello2", "passkey").len(), 1);
        assert_eq!(data_box_job_disk_pass_key("a@b", "passkey").len(), 1);
        assert_eq!(data_box_job_disk_pass_key("short", "passkey").len(), 2);
    }

    #[test]
    fn job_name() {
        assert!(data_box_job_name("job-1", "name").is_empty());
        assert!(data_box_job_name("abc", "name").is_empty());
        assert_eq!(data_box_job_name("ab", "name").len(), 1);
        assert_eq!(data_box_job_name("-job", "name").len(), 1);
        assert_eq!(data_box_job_name("job_1", "name").len(), 1);
        assert_eq!(data_box_job_name(&"a".repeat(25), "name").len(), 1);
    }

    #[test]
    fn email() {
        assert!(data_box_job_email("some.user@example.com", "emails").is_empty());
        assert_eq!(data_box_job_email("not-an-email", "emails").len(), 1);
        assert_eq!(data_box_job_email("user@host", "emails").len(), 1);
    }

    #[test]
    fn phone_extension() {
        assert!(data_box_job_phone_extension("", "ext").is_empty());
        assert!(data_box_job_phone_extension("4321", "ext").is_empty());
        assert_eq!(data_box_job_phone_extension("12345", "ext").len(), 1);
        assert_eq!(data_box_job_phone_extension("12a", "ext").len(), 1);
    }

    #[test]
    fn post_code() {
        assert!(data_box_job_post_code("98052", "postal_code").is_empty());
        assert!(data_box_job_post_code("SW1A 1AA", "postal_code").is_empty());
        assert_eq!(data_box_job_post_code("", "postal_code").len(), 1);
        assert_eq!(data_box_job_post_code("98052!", "postal_code").len(), 1);
    }

    #[test]
    fn address_lengths() {
        assert!(data_box_job_city("Redmond", "city").is_empty());
        assert_eq!(data_box_job_city("R", "city").len(), 1);
        assert!(data_box_job_street_address("1", "street_address_1").is_empty());
        assert_eq!(data_box_job_street_address("", "street_address_1").len(), 1);
        assert_eq!(data_box_job_company_name(&"c".repeat(36), "company_name").len(), 1);
        assert!(data_box_job_contact_name("Jane Doe", "name").is_empty());
        assert_eq!(data_box_job_contact_name("Jo", "name").len(), 1);
    }
}
