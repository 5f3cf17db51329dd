//! Management locks (`Microsoft.Authorization/locks`, 2016-09-01)

use armid::{ResourceId, ScopedLockId};

use super::client::Client;
use super::error::ApiError;

pub const API_VERSION: &str = "2016-09-01";

pub struct ManagementLocksApi<'a> {
    client: &'a Client,
}

impl<'a> ManagementLocksApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Delete a lock at any scope. A lock that does not exist is an error
    /// the caller can detect with [`ApiError::is_not_found`].
    pub async fn delete_by_scope(&self, id: &ScopedLockId) -> Result<(), ApiError> {
        self.client.delete(&id.id(), API_VERSION).await?;
        Ok(())
    }
}
