//! Error types for the azurerm provider

use crate::api::ApiError;

/// Error type for provider operations
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider not configured")]
    ProviderNotConfigured,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error(transparent)]
    InvalidId(#[from] armid::ParseError),

    #[error("{context}: {source}")]
    Api {
        context: String,
        #[source]
        source: ApiError,
    },

    #[error("A resource with the ID {id:?} already exists - to be managed via Terraform this resource needs to be imported into the State. Please see the resource documentation for {resource_type:?} for more information.")]
    RequiresImport { resource_type: String, id: String },

    #[error("{0}")]
    Custom(String),
}

/// Result type alias for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

impl From<String> for ProviderError {
    fn from(s: String) -> Self {
        ProviderError::Custom(s)
    }
}

impl From<&str> for ProviderError {
    fn from(s: &str) -> Self {
        ProviderError::Custom(s.to_string())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self {
        ProviderError::DecodingError(e.to_string())
    }
}

impl ProviderError {
    pub fn requires_import(resource_type: &str, id: impl Into<String>) -> Self {
        ProviderError::RequiresImport {
            resource_type: resource_type.to_string(),
            id: id.into(),
        }
    }
}

/// Attach a human readable operation description to API errors
pub trait ApiResultExt<T> {
    fn context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ApiResultExt<T> for std::result::Result<T, ApiError> {
    fn context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|source| ProviderError::Api {
            context: f(),
            source,
        })
    }
}
