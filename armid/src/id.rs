//! The ResourceId trait implemented by every typed resource ID

use crate::error::Result;
use crate::parser::{ParseResult, Parser};
use crate::segment::Segment;

/// A typed Azure Resource Manager resource ID.
///
/// Implementors declare their path via [`ResourceId::segments`] and build
/// themselves from the captured values. Parsing and validation come for free.
pub trait ResourceId: Sized {
    /// Human readable resource type, used in `Display` output
    const DESCRIPTION: &'static str;

    /// Ordered segments making up the ID
    fn segments() -> Vec<Segment>;

    /// Build the typed ID from parsed segment values
    fn from_parse_result(result: &ParseResult) -> Result<Self>;

    /// Canonical string form of the ID
    fn id(&self) -> String;

    /// Parse with case-sensitive literal segments
    fn parse(input: &str) -> Result<Self> {
        let result = Parser::new(Self::segments()).parse(input, false)?;
        Self::from_parse_result(&result)
    }

    /// Parse accepting any ASCII casing of literal segments.
    ///
    /// The resulting ID always formats with the canonical casing.
    fn parse_insensitively(input: &str) -> Result<Self> {
        let result = Parser::new(Self::segments()).parse(input, true)?;
        Self::from_parse_result(&result)
    }
}

/// Validate that `value` parses as the ID type `T`.
///
/// Returns the list of errors in the same shape used by schema field
/// validators: empty when the value is valid.
pub fn validate_resource_id<T: ResourceId>(value: &str, key: &str) -> Vec<String> {
    match T::parse(value) {
        Ok(_) => Vec::new(),
        Err(e) => vec![format!("{}: {}", key, e)],
    }
}
