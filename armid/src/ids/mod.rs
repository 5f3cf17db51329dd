//! Typed resource IDs for the services managed by the provider

mod databox;
mod key_vault;
mod lab_services;
mod managed_identity;
mod management_lock;
mod network;
mod resource_group;
mod storage;
mod storage_cache;

pub use databox::DataBoxJobId;
pub use key_vault::KeyVaultId;
pub use lab_services::{LabId, LabPlanId};
pub use managed_identity::UserAssignedIdentityId;
pub use management_lock::ScopedLockId;
pub use network::SubnetId;
pub use resource_group::ResourceGroupId;
pub use storage::StorageAccountId;
pub use storage_cache::{CacheAccessPolicyId, CacheId};

/// Render the `/subscriptions/{sub}/resourceGroups/{rg}` prefix
pub(crate) fn resource_group_path(subscription_id: &str, resource_group: &str) -> String {
    format!("/subscriptions/{subscription_id}/resourceGroups/{resource_group}")
}
