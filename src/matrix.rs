//! Serializable permission summaries for UI control enablement and role
//! auditing. Advisory only: server-side enforcement never trusts a
//! client-echoed copy of these payloads.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::evaluator::PermissionEvaluator;
use crate::permission::Permission;
use crate::role::Role;

/// Per-category permission → granted map for one role.
///
/// Computed from the evaluator's injected table so the matrix can never drift
/// from the rules actually enforced.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PermissionMatrix {
    pub role: Role,
    #[schema(value_type = Object)]
    pub sections: BTreeMap<&'static str, BTreeMap<Permission, bool>>,
}

impl PermissionMatrix {
    pub fn granted(&self, permission: Permission) -> bool {
        self.sections
            .get(permission.category())
            .and_then(|section| section.get(&permission))
            .copied()
            .unwrap_or(false)
    }
}

/// Role permission set filtered by a single resource-owner hint, shaped for
/// the client.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EffectivePermissions {
    pub user_id: Uuid,
    pub role: Role,
    #[schema(value_type = Vec<String>)]
    pub permissions: BTreeSet<Permission>,
}

impl PermissionEvaluator {
    /// Full catalog as granted/denied booleans, grouped by functional area.
    pub fn permission_matrix(&self, role: Role) -> PermissionMatrix {
        let mut sections: BTreeMap<&'static str, BTreeMap<Permission, bool>> = BTreeMap::new();
        for permission in Permission::ALL {
            sections
                .entry(permission.category())
                .or_default()
                .insert(permission, self.has_permission(role, permission));
        }
        PermissionMatrix { role, sections }
    }

    /// [`PermissionEvaluator::effective_permissions`] shaped for the client.
    pub fn effective_permissions_response(
        &self,
        role: Role,
        user_id: Uuid,
        resource_owner: Option<Uuid>,
    ) -> EffectivePermissions {
        EffectivePermissions {
            user_id,
            role,
            permissions: self
                .effective_permissions(role, user_id, resource_owner)
                .into_iter()
                .collect(),
        }
    }
}
