use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::auth::TokenCredential;
use super::common::{ArmErrorResponse, RawResponse};
use super::error::ApiError;

/// Azure Resource Manager API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    credential: Arc<dyn TokenCredential>,
    retry_config: RetryConfig,
    poller_config: PollerConfig,
}

#[derive(Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl RetryConfig {
    /// Exponential backoff before retry `attempt` (1-based), capped at
    /// `max_backoff_ms`
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        let factor = attempt
            .checked_sub(1)
            .and_then(|exp| 2_u64.checked_pow(exp))
            .unwrap_or(u64::MAX);
        self.initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        }
    }
}

/// Long-running operation polling
#[derive(Clone)]
pub struct PollerConfig {
    /// Delay between polls when the service sends no `Retry-After`
    pub default_interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            default_interval: Duration::from_secs(10),
        }
    }
}

/// Build the shared HTTP client
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ApiError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(10)
        .user_agent(concat!("terraform-provider-azurerm/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(ApiError::from)
}

impl Client {
    /// Create a new API client with default configuration
    pub fn new(endpoint: &str, credential: Arc<dyn TokenCredential>) -> Result<Self, ApiError> {
        Self::with_config(
            endpoint,
            credential,
            RetryConfig::default(),
            PollerConfig::default(),
        )
    }

    /// Create a new API client with custom retry and polling configuration
    pub fn with_config(
        endpoint: &str,
        credential: Arc<dyn TokenCredential>,
        retry_config: RetryConfig,
        poller_config: PollerConfig,
    ) -> Result<Self, ApiError> {
        let http_client = build_http_client(Duration::from_secs(retry_config.timeout_seconds))?;
        let base_url = endpoint.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                credential,
                retry_config,
                poller_config,
            }),
        })
    }

    pub fn poller_config(&self) -> &PollerConfig {
        &self.inner.poller_config
    }

    /// Full URL for an ARM path with the `api-version` and any extra query
    /// parameters appended
    pub fn url(
        &self,
        path: &str,
        api_version: &str,
        query: &[(&str, &str)],
    ) -> Result<Url, ApiError> {
        let raw = format!("{}{}", self.inner.base_url, path);
        let mut url =
            Url::parse(&raw).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", raw, e)))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("api-version", api_version);
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Execute a GET request with retry logic
    pub async fn get(&self, path: &str, api_version: &str) -> Result<RawResponse, ApiError> {
        self.get_with_query(path, api_version, &[]).await
    }

    /// Execute a GET request with extra query parameters, e.g. `$expand`
    pub async fn get_with_query(
        &self,
        path: &str,
        api_version: &str,
        query: &[(&str, &str)],
    ) -> Result<RawResponse, ApiError> {
        let url = self.url(path, api_version, query)?;
        tracing::debug!("GET request to: {}", url);
        self.execute_with_retry(|| self.inner.http_client.get(url.clone()), path)
            .await
    }

    /// GET an absolute URL handed out by the service, such as an
    /// `Azure-AsyncOperation` or `Location` header
    pub async fn get_url(&self, url: &str) -> Result<RawResponse, ApiError> {
        let url = Url::parse(url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", url, e)))?;
        tracing::debug!("GET request to: {}", url);
        self.execute_with_retry(|| self.inner.http_client.get(url.clone()), url.path())
            .await
    }

    /// Execute a PUT request with retry logic
    pub async fn put<B: Serialize>(
        &self,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<RawResponse, ApiError> {
        let url = self.url(path, api_version, &[])?;
        tracing::debug!("PUT request to: {}", url);
        self.execute_with_retry(|| self.inner.http_client.put(url.clone()).json(body), path)
            .await
    }

    /// Execute a PATCH request with retry logic
    pub async fn patch<B: Serialize>(
        &self,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<RawResponse, ApiError> {
        let url = self.url(path, api_version, &[])?;
        tracing::debug!("PATCH request to: {}", url);
        self.execute_with_retry(|| self.inner.http_client.patch(url.clone()).json(body), path)
            .await
    }

    /// Execute a POST request with retry logic
    pub async fn post<B: Serialize>(
        &self,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<RawResponse, ApiError> {
        let url = self.url(path, api_version, &[])?;
        tracing::debug!("POST request to: {}", url);
        self.execute_with_retry(|| self.inner.http_client.post(url.clone()).json(body), path)
            .await
    }

    /// Execute a DELETE request with retry logic
    pub async fn delete(&self, path: &str, api_version: &str) -> Result<RawResponse, ApiError> {
        let url = self.url(path, api_version, &[])?;
        tracing::debug!("DELETE request to: {}", url);
        self.execute_with_retry(|| self.inner.http_client.delete(url.clone()), path)
            .await
    }

    /// Data Box job operations
    pub fn databox(&self) -> crate::api::databox::DataBoxApi<'_> {
        crate::api::databox::DataBoxApi::new(self)
    }

    /// Management lock operations
    pub fn management_locks(&self) -> crate::api::management_locks::ManagementLocksApi<'_> {
        crate::api::management_locks::ManagementLocksApi::new(self)
    }

    /// HPC cache operations
    pub fn storage_cache(&self) -> crate::api::storage_cache::StorageCacheApi<'_> {
        crate::api::storage_cache::StorageCacheApi::new(self)
    }

    /// Lab Services operations
    pub fn lab_services(&self) -> crate::api::lab_services::LabServicesApi<'_> {
        crate::api::lab_services::LabServicesApi::new(self)
    }

    pub fn key_vaults(&self) -> crate::api::key_vault::KeyVaultApi<'_> {
        crate::api::key_vault::KeyVaultApi::new(self)
    }

    /// Execute request with retry logic
    async fn execute_with_retry<F>(
        &self,
        request_fn: F,
        path: &str,
    ) -> Result<RawResponse, ApiError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.inner.retry_config.max_retries {
            if attempt > 0 {
                let backoff = self.inner.retry_config.backoff_ms(attempt);
                tracing::warn!(
                    "Retrying request to {} after {}ms (attempt {})",
                    path,
                    backoff,
                    attempt
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let token = self.inner.credential.get_token().await?;

            match request_fn()
                .header(AUTHORIZATION, format!("Bearer {}", token))
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return RawResponse::from_response(response).await;
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        let text = response.text().await.unwrap_or_default();
                        return Err(ApiError::AuthError(text));
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(ApiError::RateLimited);
                    } else if status.is_server_error() {
                        let text = response.text().await.unwrap_or_default();
                        tracing::debug!("Server error ({}) from {}: {}", status, path, text);
                        last_error = Some(ArmErrorResponse::into_api_error(status.as_u16(), &text));
                    } else {
                        return self.handle_error_response(response).await;
                    }
                }
                Err(e) => {
                    if e.is_timeout() {
                        last_error =
                            Some(ApiError::Timeout(self.inner.retry_config.timeout_seconds));
                    } else if e.is_connect() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::RequestError(e));
                    }
                }
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    /// Handle error response
    async fn handle_error_response(
        &self,
        response: reqwest::Response,
    ) -> Result<RawResponse, ApiError> {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        tracing::debug!("API error response ({}): {}", status, text);

        Err(ArmErrorResponse::into_api_error(status, &text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};

    #[test]
    fn retry_config_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_backoff_ms, 100);
        assert_eq!(config.max_backoff_ms, 10000);
        assert_eq!(config.timeout_seconds, 30);
    }

    #[test]
    fn backoff_doubles_and_caps_without_overflow() {
        let config = RetryConfig {
            max_retries: 200,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        };
        assert_eq!(config.backoff_ms(1), 100);
        assert_eq!(config.backoff_ms(2), 200);
        assert_eq!(config.backoff_ms(4), 800);
        assert_eq!(config.backoff_ms(8), 10000);
        assert_eq!(config.backoff_ms(64), 10000);
        assert_eq!(config.backoff_ms(200), 10000);
    }

    #[test]
    fn url_appends_api_version_and_query() {
        let client = create_test_client("https://management.azure.com/");
        let url = client
            .url(
                "/subscriptions/s/resourceGroups/rg/providers/Microsoft.DataBox/jobs/j1",
                "2019-09-01",
                &[("$expand", "details")],
            )
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://management.azure.com/subscriptions/s/resourceGroups/rg/providers/Microsoft.DataBox/jobs/j1?api-version=2019-09-01&%24expand=details"
        );
    }

    #[tokio::test]
    async fn get_sends_bearer_token_and_api_version() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/subscriptions/s/resourceGroups/rg")
            .match_query(Matcher::UrlEncoded("api-version".into(), "2021-04-01".into()))
            .match_header("authorization", "Bearer test-token")
            .with_body(r#"{"name":"rg"}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let response = client
            .get("/subscriptions/s/resourceGroups/rg", "2021-04-01")
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(
            response.json::<serde_json::Value>().unwrap()["name"],
            "rg"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/missing")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error":{"code":"ResourceNotFound","message":"not here"}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client.get("/missing", "2021-04-01").await.unwrap_err();

        assert!(err.is_not_found());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_errors_are_retried_then_surfaced() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/flaky")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body(r#"{"error":{"code":"ServerBusy","message":"try later"}}"#)
            .expect(4)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client.get("/flaky", "2021-04-01").await.unwrap_err();

        assert_eq!(err.status(), Some(503));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unauthorized_is_auth_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/secure")
            .match_query(Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let result = client.get("/secure", "2021-04-01").await;

        assert!(matches!(result, Err(ApiError::AuthError(_))));
    }
}
