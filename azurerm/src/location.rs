//! Azure region names
//!
//! The API accepts both display names ("West Europe") and programmatic names
//! ("westeurope") but returns the latter. State always holds the normalized
//! form so reads never show a spurious diff.

/// Lower-case and strip spaces
pub fn normalize(location: &str) -> String {
    location
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
