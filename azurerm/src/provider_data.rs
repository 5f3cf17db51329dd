//! Provider data structure passed to resources

use crate::api::Client;
use crate::locks::LockManager;
use std::sync::Arc;

#[derive(Clone)]
pub struct AzureRmProviderData {
    pub client: Arc<Client>,
    pub locks: Arc<dyn LockManager>,
    /// Subscription new resources are created in
    pub subscription_id: String,
}

impl AzureRmProviderData {
    pub fn new(
        client: Client,
        locks: Arc<dyn LockManager>,
        subscription_id: impl Into<String>,
    ) -> Self {
        Self {
            client: Arc::new(client),
            locks,
            subscription_id: subscription_id.into(),
        }
    }
}
