//! Attribute validators
//!
//! Validators run against configuration values before a plan is made. Each one
//! inspects a single value and appends error diagnostics; values of the wrong
//! type and null values are left to the type checker.

use crate::types::{AttributePath, Diagnostic, Dynamic};
use std::net::IpAddr;

pub trait Validator: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>);
}

/// Signature of the field validators in [`crate::validate`]: the value and
/// its key in, one message per problem out.
pub type ValidateFunc = fn(&str, &str) -> Vec<String>;

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for StringLengthValidator {
    fn description(&self) -> String {
        format!("string length between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_string() {
            let len = s.chars().count();
            if let Some(min) = self.min {
                if len < min {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have minimum length of {}", path, min),
                            format!("Got length {}", len),
                        )
                        .with_attribute(path.clone()),
                    );
                }
            }
            if let Some(max) = self.max {
                if len > max {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have maximum length of {}", path, max),
                            format!("Got length {}", len),
                        )
                        .with_attribute(path.clone()),
                    );
                }
            }
        }
    }
}

pub struct StringPatternValidator {
    pub pattern: regex::Regex,
    pub description: String,
}

impl Validator for StringPatternValidator {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_string() {
            if !self.pattern.is_match(s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must match {}", path, self.description),
                        format!("Value '{}' does not match pattern", s),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

pub struct NumberRangeValidator {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumberRangeValidator {
    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }
}

impl Validator for NumberRangeValidator {
    fn description(&self) -> String {
        format!("number between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(n) = value.as_number() {
            if let Some(min) = self.min {
                if n < min {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must be at least {}", path, min),
                            format!("Got {}", n),
                        )
                        .with_attribute(path.clone()),
                    );
                }
            }
            if let Some(max) = self.max {
                if n > max {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must be at most {}", path, max),
                            format!("Got {}", n),
                        )
                        .with_attribute(path.clone()),
                    );
                }
            }
        }
    }
}

pub struct ListLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for ListLengthValidator {
    fn description(&self) -> String {
        format!("list length between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Dynamic::List(items) = value {
            if let Some(min) = self.min {
                if items.len() < min {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have at least {} items", path, min),
                            format!("Got {} items", items.len()),
                        )
                        .with_attribute(path.clone()),
                    );
                }
            }
            if let Some(max) = self.max {
                if items.len() > max {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have at most {} items", path, max),
                            format!("Got {} items", items.len()),
                        )
                        .with_attribute(path.clone()),
                    );
                }
            }
        }
    }
}

/// Accepts only one of a fixed set of strings
pub struct StringInSliceValidator {
    pub allowed: Vec<&'static str>,
}

impl StringInSliceValidator {
    pub fn new(allowed: &[&'static str]) -> Self {
        Self {
            allowed: allowed.to_vec(),
        }
    }
}

impl Validator for StringInSliceValidator {
    fn description(&self) -> String {
        format!("one of {:?}", self.allowed)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_string() {
            if !self.allowed.contains(&s.as_str()) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("expected {} to be one of {:?}", path, self.allowed),
                        format!("Got '{}'", s),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

/// Accepts only one of a fixed set of integers
pub struct IntInSliceValidator {
    pub allowed: Vec<i64>,
}

impl Validator for IntInSliceValidator {
    fn description(&self) -> String {
        format!("one of {:?}", self.allowed)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(n) = value.as_number() {
            if n.fract() != 0.0 || !self.allowed.contains(&(n as i64)) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("expected {} to be one of {:?}", path, self.allowed),
                        format!("Got {}", n),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

/// Adapts a plain `fn(value, key) -> errors` validator
pub struct FuncValidator {
    pub func: ValidateFunc,
    pub description: &'static str,
}

impl FuncValidator {
    pub fn new(func: ValidateFunc, description: &'static str) -> Self {
        Self { func, description }
    }
}

impl Validator for FuncValidator {
    fn description(&self) -> String {
        self.description.to_string()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_string() {
            for message in (self.func)(s, &path.to_string()) {
                diagnostics.push(
                    Diagnostic::error(format!("Invalid value for {}", path), message)
                        .with_attribute(path.clone()),
                );
            }
        }
    }
}

/// Applies the inner validator to every element of a list
pub struct EachElementValidator {
    pub inner: Box<dyn Validator>,
}

impl Validator for EachElementValidator {
    fn description(&self) -> String {
        format!("each element: {}", self.inner.description())
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Dynamic::List(items) = value {
            for (idx, item) in items.iter().enumerate() {
                self.inner
                    .validate(item, &path.clone().index(idx as i64), diagnostics);
            }
        }
    }
}

pub struct StringNotEmptyValidator;

impl Validator for StringNotEmptyValidator {
    fn description(&self) -> String {
        "non-empty string".to_string()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_string() {
            if s.trim().is_empty() {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must not be empty", path),
                        "Got an empty or whitespace-only string",
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

pub struct UuidValidator;

impl Validator for UuidValidator {
    fn description(&self) -> String {
        "UUID".to_string()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_string() {
            if uuid::Uuid::parse_str(s).is_err() {
                diagnostics.push(
                    Diagnostic::error(
                        format!("expected {} to be a valid UUID", path),
                        format!("Got '{}'", s),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

pub struct IpAddressValidator;

impl Validator for IpAddressValidator {
    fn description(&self) -> String {
        "IP address".to_string()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_string() {
            if s.parse::<IpAddr>().is_err() {
                diagnostics.push(
                    Diagnostic::error(
                        format!("expected {} to contain a valid IP", path),
                        format!("Got '{}'", s),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

/// Accepts absolute http and https URLs
pub struct UrlHttpValidator;

impl Validator for UrlHttpValidator {
    fn description(&self) -> String {
        "http or https URL".to_string()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_string() {
            let valid = url::Url::parse(s)
                .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
                .unwrap_or(false);
            if !valid {
                diagnostics.push(
                    Diagnostic::error(
                        format!("expected {} to have a url with schema of: \"http,https\"", path),
                        format!("Got '{}'", s),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

pub struct Rfc3339TimeValidator;

impl Validator for Rfc3339TimeValidator {
    fn description(&self) -> String {
        "RFC3339 timestamp".to_string()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_string() {
            if chrono::DateTime::parse_from_rfc3339(s).is_err() {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must be a valid RFC3339 date", path),
                        format!("Got '{}'", s),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(validator: &dyn Validator, value: Dynamic) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        validator.validate(&value, &AttributePath::new("field"), &mut diags);
        diags
    }

    #[test]
    fn string_length_validator_rejects_too_short() {
        let validator = StringLengthValidator {
            min: Some(5),
            max: None,
        };

        let diags = run(&validator, Dynamic::String("hi".to_string()));
        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("minimum length"));
    }

    #[test]
    fn string_length_validator_counts_characters() {
        let validator = StringLengthValidator {
            min: None,
            max: Some(3),
        };

        assert!(run(&validator, Dynamic::String("äöü".to_string())).is_empty());
    }

    #[test]
    fn number_range_validator_checks_bounds() {
        let validator = NumberRangeValidator::between(576.0, 1500.0);

        assert!(run(&validator, Dynamic::Number(1500.0)).is_empty());
        assert_eq!(run(&validator, Dynamic::Number(575.0)).len(), 1);
        assert_eq!(run(&validator, Dynamic::Number(1501.0)).len(), 1);
    }

    #[test]
    fn list_length_validator_checks_bounds() {
        let validator = ListLengthValidator {
            min: Some(1),
            max: Some(2),
        };

        let three = Dynamic::List(vec![Dynamic::Null, Dynamic::Null, Dynamic::Null]);
        assert_eq!(run(&validator, three).len(), 1);
        assert_eq!(run(&validator, Dynamic::List(vec![])).len(), 1);
    }

    #[test]
    fn string_in_slice_validator_is_case_sensitive() {
        let validator = StringInSliceValidator::new(&["rw", "ro", "no"]);

        assert!(run(&validator, Dynamic::String("ro".to_string())).is_empty());
        assert_eq!(run(&validator, Dynamic::String("RO".to_string())).len(), 1);
    }

    #[test]
    fn int_in_slice_validator_rejects_other_sizes() {
        let validator = IntInSliceValidator {
            allowed: vec![3072, 6144],
        };

        assert!(run(&validator, Dynamic::Number(3072.0)).is_empty());
        assert_eq!(run(&validator, Dynamic::Number(4096.0)).len(), 1);
    }

    #[test]
    fn func_validator_reports_each_message() {
        fn two_errors(_value: &str, key: &str) -> Vec<String> {
            vec![format!("{key} first"), format!("{key} second")]
        }

        let validator = FuncValidator::new(two_errors, "always fails");
        let diags = run(&validator, Dynamic::String("x".to_string()));

        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].detail, "field first");
    }

    #[test]
    fn each_element_validator_indexes_paths() {
        let validator = EachElementValidator {
            inner: Box::new(IpAddressValidator),
        };

        let diags = run(
            &validator,
            Dynamic::List(vec![
                Dynamic::String("10.0.0.1".to_string()),
                Dynamic::String("not-an-ip".to_string()),
            ]),
        );

        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].attribute,
            Some(AttributePath::new("field").index(1))
        );
    }

    #[test]
    fn format_validators() {
        assert!(run(&UuidValidator, Dynamic::String(uuid::Uuid::new_v4().to_string())).is_empty());
        assert_eq!(run(&UuidValidator, Dynamic::String("abc".to_string())).len(), 1);

        let url = Dynamic::String("https://lms.example.com".to_string());
        assert!(run(&UrlHttpValidator, url).is_empty());
        assert_eq!(run(&UrlHttpValidator, Dynamic::String("ftp://x".to_string())).len(), 1);

        let time = Dynamic::String("2024-01-01T00:00:00Z".to_string());
        assert!(run(&Rfc3339TimeValidator, time).is_empty());
        assert_eq!(run(&Rfc3339TimeValidator, Dynamic::String("tomorrow".to_string())).len(), 1);
    }
}
