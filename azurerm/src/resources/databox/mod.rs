//! Data Box resources

mod job;

pub use job::{DataBoxJobModel, DataBoxJobResource};
