use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AuthzError;
use crate::role::Role;

/// The authenticated caller for the current request.
///
/// Produced by the platform's credential-verification layer, which inserts it
/// into request extensions after validating the bearer token; this crate
/// trusts the value as-is and performs no identity verification of its own.
/// Request-scoped: constructed per request, dropped when the request ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AuthzError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| AuthzError::unauthorized("authentication required"))
    }
}

/// The target of an ownership-scoped action.
///
/// Resolved by business logic (storage lookup) before asking the contextual
/// evaluator; the evaluator itself never touches storage. `resource_type` is
/// advisory, used only for log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceContext {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub resource_type: Option<String>,
}

impl ResourceContext {
    pub fn new(id: Uuid, owner_id: Uuid) -> Self {
        Self {
            id,
            owner_id,
            resource_type: None,
        }
    }

    /// Shorthand for resources whose identity is their owner, e.g. a profile.
    pub fn owned_by(owner_id: Uuid) -> Self {
        Self::new(owner_id, owner_id)
    }

    pub fn with_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders() {
        let owner = Uuid::new_v4();
        let resource = ResourceContext::owned_by(owner).with_type("booking");
        assert_eq!(resource.id, owner);
        assert_eq!(resource.owner_id, owner);
        assert_eq!(resource.resource_type.as_deref(), Some("booking"));
    }
}
