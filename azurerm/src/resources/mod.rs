//! Resource implementations

pub mod databox;
pub mod lab_service;
pub mod storage_cache;

pub use databox::DataBoxJobResource;
pub use lab_service::LabServiceLabResource;
pub use storage_cache::{HpcCacheAccessPolicyResource, HpcCacheResource};

use crate::error::ProviderError;
use crate::types::{Diagnostic, DynamicValue};
use serde::Serialize;

pub(crate) fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}

pub(crate) fn error_diagnostic(summary: &str, err: &ProviderError) -> Diagnostic {
    Diagnostic::error(summary, err.to_string())
}

/// Encode a model as state, reporting failures as a diagnostic
pub(crate) fn encode_state<T: Serialize>(model: &T) -> Result<DynamicValue, Diagnostic> {
    DynamicValue::from_model(model)
        .map_err(|e| error_diagnostic("Failed to encode state", &e))
}

/// Invalid import ID diagnostic naming the expected format
pub(crate) fn invalid_import_id(err: &armid::ParseError, example: &str) -> Diagnostic {
    Diagnostic::error(
        "Invalid import ID",
        format!("{}. Expected an ID like {:?}", err, example),
    )
}
