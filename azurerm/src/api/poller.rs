//! Long-running operation polling
//!
//! ARM reports asynchronous work in one of three ways: an
//! `Azure-AsyncOperation` status URL, a `Location` URL that answers 202 until
//! the work is done, or a `provisioningState` on the resource itself. The
//! poller follows whichever the initial response used, sleeping for the
//! `Retry-After` the service asks for, and gives up when the [`Context`] is
//! cancelled or its deadline passes.

use serde::Deserialize;
use std::time::Duration;

use super::client::Client;
use super::common::RawResponse;
use super::error::ApiError;
use crate::context::{Context, ContextError};

const ASYNC_OPERATION_HEADER: &str = "azure-asyncoperation";
const LOCATION_HEADER: &str = "location";
const RETRY_AFTER_HEADER: &str = "retry-after";

#[derive(Debug, Deserialize)]
struct OperationStatus {
    #[serde(default)]
    status: String,
    #[serde(default)]
    error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct ProvisioningEnvelope {
    #[serde(default)]
    properties: Option<ProvisioningProperties>,
}

#[derive(Debug, Default, Deserialize)]
struct ProvisioningProperties {
    #[serde(rename = "provisioningState")]
    provisioning_state: Option<String>,
}

/// Terminal state of a long-running operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperationState {
    InProgress,
    Succeeded,
    Failed,
    Canceled,
}

impl OperationState {
    fn from_status(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "succeeded" => OperationState::Succeeded,
            "failed" => OperationState::Failed,
            "canceled" | "cancelled" => OperationState::Canceled,
            _ => OperationState::InProgress,
        }
    }
}

/// Follows a long-running operation to completion
pub struct Poller<'a> {
    client: &'a Client,
    ctx: &'a Context,
}

impl<'a> Poller<'a> {
    pub fn new(client: &'a Client, ctx: &'a Context) -> Self {
        Self { client, ctx }
    }

    /// Wait for the operation started by a PUT, PATCH or POST. `resource_path`
    /// is polled for its provisioning state when the response carries no
    /// operation headers.
    pub async fn wait(
        &self,
        response: &RawResponse,
        resource_path: &str,
        api_version: &str,
    ) -> Result<(), ApiError> {
        self.wait_inner(response, resource_path, api_version, false)
            .await
    }

    /// Wait for the operation started by a DELETE. The resource answering 404
    /// counts as done.
    pub async fn wait_for_deletion(
        &self,
        response: &RawResponse,
        resource_path: &str,
        api_version: &str,
    ) -> Result<(), ApiError> {
        self.wait_inner(response, resource_path, api_version, true)
            .await
    }

    async fn wait_inner(
        &self,
        response: &RawResponse,
        resource_path: &str,
        api_version: &str,
        deleting: bool,
    ) -> Result<(), ApiError> {
        if let Some(url) = response.header(ASYNC_OPERATION_HEADER) {
            return self.poll_async_operation(url, retry_after(response)).await;
        }

        if response.status == 202 {
            if let Some(url) = response.header(LOCATION_HEADER) {
                return self.poll_location(url, retry_after(response)).await;
            }
        }

        if deleting {
            if response.status == 202 {
                return self
                    .poll_until_gone(resource_path, api_version, retry_after(response))
                    .await;
            }
            return Ok(());
        }

        match provisioning_state(response) {
            Some(state) if OperationState::from_status(&state) == OperationState::InProgress => {
                self.wait_for_provisioning_state(resource_path, api_version, "Succeeded")
                    .await
            }
            Some(state) => match OperationState::from_status(&state) {
                OperationState::Succeeded => Ok(()),
                _ => Err(ApiError::OperationFailed {
                    status: state,
                    message: format!("provisioning of {} did not succeed", resource_path),
                }),
            },
            None if response.status == 202 => {
                self.wait_for_provisioning_state(resource_path, api_version, "Succeeded")
                    .await
            }
            None => Ok(()),
        }
    }

    /// Poll the resource until its `provisioningState` equals `target`
    pub async fn wait_for_provisioning_state(
        &self,
        resource_path: &str,
        api_version: &str,
        target: &str,
    ) -> Result<(), ApiError> {
        let mut delay = None;
        loop {
            self.sleep(delay).await?;

            let response = self.client.get(resource_path, api_version).await?;
            delay = retry_after(&response);

            let state = provisioning_state(&response).unwrap_or_default();
            tracing::debug!("{} provisioning state: {:?}", resource_path, state);

            if state.eq_ignore_ascii_case(target) {
                return Ok(());
            }
            match OperationState::from_status(&state) {
                OperationState::Failed | OperationState::Canceled => {
                    return Err(ApiError::OperationFailed {
                        status: state,
                        message: format!("waiting for {} to reach {:?}", resource_path, target),
                    })
                }
                _ => {}
            }
        }
    }

    async fn poll_async_operation(
        &self,
        url: &str,
        initial: Option<Duration>,
    ) -> Result<(), ApiError> {
        let mut delay = initial;
        loop {
            self.sleep(delay).await?;

            let response = self.client.get_url(url).await?;
            delay = retry_after(&response);

            let status: OperationStatus = response.json()?;
            match OperationState::from_status(&status.status) {
                OperationState::InProgress => {
                    tracing::debug!("operation {} still {:?}", url, status.status);
                }
                OperationState::Succeeded => return Ok(()),
                OperationState::Failed | OperationState::Canceled => {
                    let message = status
                        .error
                        .map(|e| format!("{}: {}", e.code, e.message))
                        .unwrap_or_default();
                    return Err(ApiError::OperationFailed {
                        status: status.status,
                        message,
                    });
                }
            }
        }
    }

    async fn poll_location(&self, url: &str, initial: Option<Duration>) -> Result<(), ApiError> {
        let mut delay = initial;
        loop {
            self.sleep(delay).await?;

            let response = match self.client.get_url(url).await {
                Ok(response) => response,
                Err(e) if e.is_not_found() => return Ok(()),
                Err(e) => return Err(e),
            };
            if response.status != 202 {
                return Ok(());
            }
            delay = retry_after(&response);
        }
    }

    async fn poll_until_gone(
        &self,
        resource_path: &str,
        api_version: &str,
        initial: Option<Duration>,
    ) -> Result<(), ApiError> {
        let mut delay = initial;
        loop {
            self.sleep(delay).await?;

            match self.client.get(resource_path, api_version).await {
                Ok(response) => delay = retry_after(&response),
                Err(e) if e.is_not_found() => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    /// Sleep before the next poll, failing early if the context stops
    async fn sleep(&self, delay: Option<Duration>) -> Result<(), ApiError> {
        if let Some(err) = self.ctx.err() {
            return Err(err.into());
        }

        let delay = delay.unwrap_or(self.client.poller_config().default_interval);
        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            _ = self.ctx.cancelled() => {
                Err(self.ctx.err().unwrap_or(ContextError::Cancelled).into())
            }
        }
    }
}

fn retry_after(response: &RawResponse) -> Option<Duration> {
    response
        .header(RETRY_AFTER_HEADER)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn provisioning_state(response: &RawResponse) -> Option<String> {
    if response.body.trim().is_empty() {
        return None;
    }
    serde_json::from_str::<ProvisioningEnvelope>(&response.body)
        .ok()
        .and_then(|e| e.properties)
        .and_then(|p| p.provisioning_state)
}

impl Client {
    /// Poller bound to `ctx`
    pub fn poller<'a>(&'a self, ctx: &'a Context) -> Poller<'a> {
        Poller::new(self, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};
    use std::collections::HashMap;

    fn response(status: u16, headers: &[(&str, &str)], body: &str) -> RawResponse {
        RawResponse {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
                .collect::<HashMap<_, _>>(),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn async_operation_header_is_followed_until_succeeded() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/operations/op1")
            .with_body(r#"{"status":"Succeeded"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let ctx = Context::new();
        let op_url = format!("{}/operations/op1", server.url());
        let initial = response(201, &[("Azure-AsyncOperation", &op_url)], "{}");

        client.poller(&ctx).wait(&initial, "/r", "v").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn failed_operation_surfaces_error_details() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/operations/op2")
            .with_body(r#"{"status":"Failed","error":{"code":"QuotaExceeded","message":"no capacity"}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let ctx = Context::new();
        let op_url = format!("{}/operations/op2", server.url());
        let initial = response(202, &[("Azure-AsyncOperation", &op_url)], "");

        let err = client.poller(&ctx).wait(&initial, "/r", "v").await.unwrap_err();
        match err {
            ApiError::OperationFailed { status, message } => {
                assert_eq!(status, "Failed");
                assert!(message.contains("QuotaExceeded"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn location_polling_stops_on_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/locations/l1")
            .with_status(200)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let ctx = Context::new();
        let url = format!("{}/locations/l1", server.url());
        let initial = response(202, &[("Location", &url)], "");

        client.poller(&ctx).wait(&initial, "/r", "v").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn provisioning_state_polling_until_succeeded() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/caches/c1")
            .match_query(Matcher::UrlEncoded("api-version".into(), "2023-05-01".into()))
            .with_body(r#"{"properties":{"provisioningState":"Succeeded"}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let ctx = Context::new();
        let initial = response(201, &[], r#"{"properties":{"provisioningState":"Creating"}}"#);

        client
            .poller(&ctx)
            .wait(&initial, "/caches/c1", "2023-05-01")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn completed_response_needs_no_polling() {
        let client = create_test_client("http://127.0.0.1:1");
        let ctx = Context::new();
        let initial = response(200, &[], r#"{"properties":{"provisioningState":"Succeeded"}}"#);

        client.poller(&ctx).wait(&initial, "/r", "v").await.unwrap();
    }

    #[tokio::test]
    async fn deletion_finishes_when_resource_is_gone() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/jobs/j1")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error":{"code":"NotFound","message":"gone"}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let ctx = Context::new();
        let initial = response(202, &[], "");

        client
            .poller(&ctx)
            .wait_for_deletion(&initial, "/jobs/j1", "2019-09-01")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn deadline_stops_polling() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/operations/slow")
            .with_body(r#"{"status":"InProgress"}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let ctx = Context::new().with_timeout(Duration::from_millis(100));
        let op_url = format!("{}/operations/slow", server.url());
        let initial = response(201, &[("Azure-AsyncOperation", &op_url)], "");

        let err = client.poller(&ctx).wait(&initial, "/r", "v").await.unwrap_err();
        assert!(matches!(err, ApiError::DeadlineExceeded));
    }

    #[test]
    fn retry_after_is_read_in_seconds() {
        let r = response(202, &[("Retry-After", "7")], "");
        assert_eq!(retry_after(&r), Some(Duration::from_secs(7)));
        assert_eq!(retry_after(&response(202, &[], "")), None);
    }
}
