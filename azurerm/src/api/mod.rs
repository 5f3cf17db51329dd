//! Azure Resource Manager API client and per-service operations

pub mod auth;
pub mod client;
pub mod common;
pub mod databox;
pub mod error;
pub mod key_vault;
pub mod lab_services;
pub mod management_locks;
pub mod poller;
pub mod storage_cache;

#[cfg(test)]
pub mod test_helpers;

pub use auth::{ClientSecretCredential, StaticTokenCredential, TokenCredential};
pub use client::{build_http_client, Client, PollerConfig, RetryConfig};
pub use common::RawResponse;
pub use error::ApiError;
pub use poller::Poller;
