//! Azure AD authentication
//!
//! Bearer tokens for Resource Manager come from a [`TokenCredential`]. The
//! client-secret credential runs the OAuth2 client-credentials flow and caches
//! the token until shortly before it expires.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::error::ApiError;

/// Refresh tokens this long before they actually expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Used when the token endpoint omits `expires_in`
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Access token to send as `Authorization: Bearer <token>`
    async fn get_token(&self) -> Result<String, ApiError>;
}

/// Pre-acquired token, used as-is
pub struct StaticTokenCredential {
    token: String,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(&self) -> Result<String, ApiError> {
        Ok(self.token.clone())
    }
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// Expiry with the buffer already applied
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: String,
}

/// Service principal authenticating with a client secret
pub struct ClientSecretCredential {
    http_client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

impl ClientSecretCredential {
    pub fn new(
        http_client: reqwest::Client,
        authority_host: &str,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
        resource_manager_endpoint: &str,
    ) -> Self {
        Self {
            http_client,
            token_url: format!(
                "{}/{}/oauth2/v2.0/token",
                authority_host.trim_end_matches('/'),
                tenant_id
            ),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            scope: format!("{}/.default", resource_manager_endpoint.trim_end_matches('/')),
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    async fn fetch_token(&self) -> Result<CachedToken, ApiError> {
        tracing::debug!("Requesting token from {}", self.token_url);

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = match serde_json::from_str::<TokenErrorResponse>(&text) {
                Ok(err) => format!("{}: {}", err.error, err.error_description),
                Err(_) => text,
            };
            return Err(ApiError::AuthError(message));
        }

        let token: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| ApiError::ParseError(format!("Failed to parse token response: {}", e)))?;

        let ttl = token
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_TTL);

        Ok(CachedToken {
            token: token.access_token,
            expires_at: Instant::now() + ttl.saturating_sub(TOKEN_EXPIRY_BUFFER),
        })
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    async fn get_token(&self) -> Result<String, ApiError> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let fresh = self.fetch_token().await?;
        let token = fresh.token.clone();

        *self.token_cache.write().await = Some(fresh);

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn credential(url: &str) -> ClientSecretCredential {
        ClientSecretCredential::new(
            reqwest::Client::new(),
            url,
            "tenant-1",
            "client-1",
            "s3cret",
            "https://management.azure.com/",
        )
    }

    #[tokio::test]
    async fn client_secret_token_is_cached() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/tenant-1/oauth2/v2.0/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
                Matcher::UrlEncoded("client_id".into(), "client-1".into()),
                Matcher::UrlEncoded(
                    "scope".into(),
                    "https://management.azure.com/.default".into(),
                ),
            ]))
            .with_body(r#"{"token_type":"Bearer","expires_in":3599,"access_token":"tok-1"}"#)
            .expect(1)
            .create_async()
            .await;

        let credential = credential(&server.url());

        assert_eq!(credential.get_token().await.unwrap(), "tok-1");
        assert_eq!(credential.get_token().await.unwrap(), "tok-1");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn short_lived_token_is_refreshed() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/tenant-1/oauth2/v2.0/token")
            .with_body(r#"{"expires_in":30,"access_token":"tok-short"}"#)
            .expect(2)
            .create_async()
            .await;

        let credential = credential(&server.url());

        credential.get_token().await.unwrap();
        credential.get_token().await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn token_endpoint_error_is_auth_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/tenant-1/oauth2/v2.0/token")
            .with_status(401)
            .with_body(r#"{"error":"invalid_client","error_description":"bad secret"}"#)
            .create_async()
            .await;

        let result = credential(&server.url()).get_token().await;
        match result {
            Err(ApiError::AuthError(message)) => assert!(message.contains("invalid_client")),
            other => panic!("expected AuthError, got {other:?}"),
        }
    }
}
