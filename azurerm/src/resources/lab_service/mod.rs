//! Lab Services resources

mod lab;

pub use lab::{LabServiceLabModel, LabServiceLabResource};
