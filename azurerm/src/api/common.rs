//! Common types shared by the ARM service clients

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;

use super::error::ApiError;

/// ARM error envelope: `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Deserialize)]
pub struct ArmErrorResponse {
    pub error: ArmErrorDetails,
}

#[derive(Debug, Deserialize)]
pub struct ArmErrorDetails {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl ArmErrorResponse {
    /// Build an [`ApiError`] from an error body. Bodies that are not an ARM
    /// envelope are kept verbatim as the message.
    pub fn into_api_error(status: u16, body: &str) -> ApiError {
        match serde_json::from_str::<ArmErrorResponse>(body) {
            Ok(resp) => ApiError::ResponseError {
                status,
                code: resp.error.code,
                message: resp.error.message,
            },
            Err(_) => ApiError::ResponseError {
                status,
                code: String::new(),
                message: body.to_string(),
            },
        }
    }
}

/// Successful response with the headers the poller needs
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RawResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, self.body);
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })
    }

    /// Header lookup, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub(crate) async fn from_response(response: reqwest::Response) -> Result<Self, ApiError> {
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;
        tracing::debug!("API response ({}): {}", status, body);
        Ok(Self {
            status,
            headers,
            body,
        })
    }
}

/// Wrapper for ARM list responses
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "nextLink")]
    pub next_link: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arm_error_envelope_is_parsed() {
        let err = ArmErrorResponse::into_api_error(
            400,
            r#"{"error":{"code":"InvalidCacheSize","message":"size not allowed"}}"#,
        );
        match err {
            ApiError::ResponseError {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 400);
                assert_eq!(code, "InvalidCacheSize");
                assert_eq!(message, "size not allowed");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_arm_body_is_kept_as_message() {
        let err = ArmErrorResponse::into_api_error(502, "<html>bad gateway</html>");
        assert!(err.to_string().contains("bad gateway"));
    }

    #[test]
    fn header_lookup_ignores_case() {
        let resp = RawResponse {
            status: 202,
            headers: HashMap::from([("retry-after".to_string(), "5".to_string())]),
            body: String::new(),
        };
        assert_eq!(resp.header("Retry-After"), Some("5"));
        assert_eq!(resp.header("Location"), None);
    }
}
