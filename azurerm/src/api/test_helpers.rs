//! Test helpers for the ARM API

use std::sync::Arc;
use std::time::Duration;

use super::auth::StaticTokenCredential;
use super::client::{Client, PollerConfig, RetryConfig};

/// Client against a mock server: static token, fast retries and polls
#[allow(dead_code)]
pub fn create_test_client(url: &str) -> Client {
    Client::with_config(
        url,
        Arc::new(StaticTokenCredential::new("test-token")),
        RetryConfig {
            max_retries: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            timeout_seconds: 5,
        },
        PollerConfig {
            default_interval: Duration::from_millis(10),
        },
    )
    .unwrap()
}
