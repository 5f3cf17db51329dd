//! Error types for resource ID parsing

/// Error returned when a string cannot be parsed into a resource ID
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("cannot parse an empty string as a resource ID")]
    Empty,

    #[error("parsing {input:?}: the segment {segment:?} is missing or empty (for example {example:?})")]
    MissingSegment {
        input: String,
        segment: String,
        example: String,
    },

    #[error("parsing {input:?}: expected the segment {segment:?} to be {expected:?} but got {actual:?}")]
    UnexpectedSegment {
        input: String,
        segment: String,
        expected: String,
        actual: String,
    },

    #[error("parsing {input:?}: unexpected trailing segments {trailing:?}")]
    TrailingSegments { input: String, trailing: String },

    #[error("parsing {input:?}: the number of path segments is not divisible by 2")]
    OddSegmentCount { input: String },

    #[error("parsing {input:?}: no {key:?} segment was found")]
    MissingKey { input: String, key: String },

    #[error("parsing {input:?}: {reason}")]
    Invalid { input: String, reason: String },
}

/// Result type alias for resource ID parsing
pub type Result<T> = std::result::Result<T, ParseError>;
