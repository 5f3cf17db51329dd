use crate::error::Result;
use crate::id::ResourceId;
use crate::parser::ParseResult;
use crate::segment::Segment;
use std::fmt;

/// ID of a management lock applied at an arbitrary scope
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopedLockId {
    pub scope: String,
    pub lock_name: String,
}

impl ScopedLockId {
    pub fn new(scope: impl Into<String>, lock_name: impl Into<String>) -> Self {
        let scope = scope.into();
        let scope = if scope.starts_with('/') {
            scope
        } else {
            format!("/{scope}")
        };
        Self {
            scope: scope.trim_end_matches('/').to_string(),
            lock_name: lock_name.into(),
        }
    }
}

impl ResourceId for ScopedLockId {
    const DESCRIPTION: &'static str = "Scoped Lock";

    fn segments() -> Vec<Segment> {
        vec![
            Segment::scope("scope"),
            Segment::static_segment("staticProviders", "providers"),
            Segment::resource_provider("staticMicrosoftAuthorization", "Microsoft.Authorization"),
            Segment::static_segment("staticLocks", "locks"),
            Segment::user_specified("lockName", "lockValue"),
        ]
    }

    fn from_parse_result(result: &ParseResult) -> Result<Self> {
        Ok(Self {
            scope: result.required("scope")?,
            lock_name: result.required("lockName")?,
        })
    }

    fn id(&self) -> String {
        format!(
            "{}/providers/Microsoft.Authorization/locks/{}",
            self.scope, self.lock_name
        )
    }
}

impl fmt::Display for ScopedLockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Scope: {:?}, Lock Name: {:?})",
            Self::DESCRIPTION,
            self.scope,
            self.lock_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_normalizes_scope_slashes() {
        let id = ScopedLockId::new("subscriptions/sub/resourceGroups/rg/", "lock");
        assert_eq!(id.scope, "/subscriptions/sub/resourceGroups/rg");
        assert_eq!(
            id.id(),
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Authorization/locks/lock"
        );
    }
}
