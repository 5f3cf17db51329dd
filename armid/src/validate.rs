//! Schema-level validators over resource ID strings

use crate::generic::GenericResourceId;
use crate::id::ResourceId;

pub use crate::generic::validate_generic_resource_id;
pub use crate::id::validate_resource_id;

/// Validate that `value` parses as `T`, accepting any casing of literal segments
pub fn validate_resource_id_insensitively<T: ResourceId>(value: &str, key: &str) -> Vec<String> {
    match T::parse_insensitively(value) {
        Ok(_) => Vec::new(),
        Err(e) => vec![format!("{}: {}", key, e)],
    }
}

/// Validate that `value` is the ID of a resource group
pub fn validate_resource_group_id(value: &str, key: &str) -> Vec<String> {
    match GenericResourceId::parse(value) {
        Ok(id) if id.resource_group.is_some() && id.provider.is_none() && id.path.is_empty() => {
            Vec::new()
        }
        Ok(_) => vec![format!("{:?} is not a resource group ID: {:?}", key, value)],
        Err(e) => vec![format!("Can not parse {:?} as a resource id: {}", key, e)],
    }
}
