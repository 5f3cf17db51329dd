use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("unexpected status {status} with error: {code}: {message}")]
    ResponseError {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,

    #[error("long running operation ended with status {status:?}: {message}")]
    OperationFailed { status: String, message: String },

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error("context cancelled")]
    Cancelled,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP status of the failed response, when there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::ResponseError { status, .. } => Some(*status),
            ApiError::RequestError(e) => e.status().map(|s| s.as_u16()),
            ApiError::RateLimited => Some(429),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<crate::context::ContextError> for ApiError {
    fn from(e: crate::context::ContextError) -> Self {
        match e {
            crate::context::ContextError::Cancelled => ApiError::Cancelled,
            crate::context::ContextError::DeadlineExceeded => ApiError::DeadlineExceeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_only_404() {
        let not_found = ApiError::ResponseError {
            status: 404,
            code: "ResourceNotFound".to_string(),
            message: "gone".to_string(),
        };
        let conflict = ApiError::ResponseError {
            status: 409,
            code: "Conflict".to_string(),
            message: "busy".to_string(),
        };

        assert!(not_found.is_not_found());
        assert!(!conflict.is_not_found());
        assert!(!ApiError::ServiceUnavailable.is_not_found());
    }

    #[test]
    fn response_error_display_includes_code() {
        let err = ApiError::ResponseError {
            status: 400,
            code: "InvalidParameter".to_string(),
            message: "bad mtu".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unexpected status 400 with error: InvalidParameter: bad mtu"
        );
    }
}
