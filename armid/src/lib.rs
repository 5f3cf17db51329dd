//! Azure Resource Manager resource ID codec
//!
//! Typed resource IDs are declared as an ordered list of [`Segment`]s. The
//! shared [`Parser`] matches input strings against those segments, and each
//! ID type formats itself back into the canonical form so that
//! `T::parse(&id.id()) == Ok(id)` holds for every valid ID.

pub mod error;
pub mod generic;
pub mod id;
pub mod ids;
pub mod parser;
pub mod segment;
pub mod validate;

pub use error::{ParseError, Result};
pub use generic::GenericResourceId;
pub use id::ResourceId;
pub use ids::*;
pub use parser::{ParseResult, Parser};
pub use segment::{Segment, SegmentKind};
