use std::collections::HashSet;

use uuid::Uuid;

use crate::permission::Permission;
use crate::principal::{Principal, ResourceContext};
use crate::role::Role;
use crate::table::PermissionTable;

/// Permissions whose role-level grant is refined by resource ownership for
/// non-admin callers. Kept next to the dispatch below; the two must agree.
pub const OWNERSHIP_SCOPED: [Permission; 11] = [
    Permission::ViewProfile,
    Permission::UpdateProfile,
    Permission::ChangePassword,
    Permission::ReadBooking,
    Permission::UpdateBooking,
    Permission::CancelBooking,
    Permission::CompleteBooking,
    Permission::InitiatePayment,
    Permission::ViewPayment,
    Permission::ApplyCoupon,
    Permission::ReadNotification,
];

/// Permissions whose role-level grant is refined by resource ownership.
pub fn ownership_scoped() -> &'static [Permission] {
    &OWNERSHIP_SCOPED
}

/// Policy seam for handler-level authorization.
///
/// Business logic that wants a pluggable decision point (tests, alternative
/// policies) can hold an `Arc<dyn PolicyEvaluator>`; [`PermissionEvaluator`]
/// is the default implementation.
pub trait PolicyEvaluator: Send + Sync {
    /// Final allow/deny for `principal` performing `permission` on `resource`.
    fn can(&self, principal: &Principal, resource: &ResourceContext, permission: Permission) -> bool;
}

/// Role and ownership based permission evaluator.
///
/// Pure functions over an injected, immutable [`PermissionTable`]: no I/O, no
/// interior mutability, identical inputs always yield identical output.
/// Unknown or unconfigured roles degrade to "no permission" rather than an
/// error, so an authorization failure can never crash the request pipeline.
#[derive(Debug, Clone)]
pub struct PermissionEvaluator {
    table: PermissionTable,
}

impl Default for PermissionEvaluator {
    fn default() -> Self {
        Self::new(PermissionTable::default())
    }
}

impl PermissionEvaluator {
    pub fn new(table: PermissionTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PermissionTable {
        &self.table
    }

    /// Permission set granted to `role`; empty for an unconfigured role.
    pub fn permissions_for_role(&self, role: Role) -> &HashSet<Permission> {
        self.table.permissions_for(role)
    }

    pub fn has_permission(&self, role: Role, permission: Permission) -> bool {
        self.table.grants(role, permission)
    }

    /// True iff at least one of `permissions` is granted to `role`.
    pub fn has_any(&self, role: Role, permissions: &[Permission]) -> bool {
        permissions
            .iter()
            .any(|&permission| self.has_permission(role, permission))
    }

    /// True iff every one of `permissions` is granted to `role`.
    pub fn has_all(&self, role: Role, permissions: &[Permission]) -> bool {
        permissions
            .iter()
            .all(|&permission| self.has_permission(role, permission))
    }

    /// Refine a role-level grant into the final decision for one resource.
    ///
    /// Evaluation order, short-circuiting:
    /// 1. role-level deny is final (never bypassable);
    /// 2. Admin passes unconditionally;
    /// 3. otherwise dispatch on the permission (ownership, agent override,
    ///    agent-only, or default-allow).
    pub fn has_contextual_permission(
        &self,
        principal: &Principal,
        resource: &ResourceContext,
        permission: Permission,
    ) -> bool {
        let allowed = self.decide(principal, Some(resource.owner_id), permission);

        tracing::debug!(
            user_id = %principal.id,
            role = %principal.role,
            permission = %permission,
            resource_id = %resource.id,
            resource_type = resource.resource_type.as_deref().unwrap_or("unknown"),
            allowed,
            "contextual permission check"
        );

        allowed
    }

    /// The subset of the role's permissions that survive the contextual check
    /// against a single resource-owner hint. Admin short-circuits to the full
    /// set; `None` fails every ownership comparison.
    pub fn effective_permissions(
        &self,
        role: Role,
        user_id: Uuid,
        resource_owner: Option<Uuid>,
    ) -> HashSet<Permission> {
        let base = self.permissions_for_role(role);
        if role == Role::Admin {
            return base.clone();
        }

        let principal = Principal::new(user_id, role);
        base.iter()
            .copied()
            .filter(|&permission| self.decide(&principal, resource_owner, permission))
            .collect()
    }

    /// Shared dispatch for contextual and effective-permission evaluation.
    ///
    /// Total over every (role, permission, owner) triple; the wildcard arm is
    /// an intentional allow, not an omission: permissions without an ownership
    /// dimension (public vehicle listings, review reads, ...) are settled by
    /// the role-level grant alone.
    fn decide(&self, principal: &Principal, owner_id: Option<Uuid>, permission: Permission) -> bool {
        if !self.has_permission(principal.role, permission) {
            return false;
        }
        if principal.role == Role::Admin {
            return true;
        }

        let owns_resource = owner_id == Some(principal.id);

        match permission {
            // Own account
            Permission::ViewProfile
            | Permission::UpdateProfile
            | Permission::ChangePassword
            // Bookings
            | Permission::ReadBooking
            | Permission::UpdateBooking
            | Permission::CancelBooking
            | Permission::CompleteBooking
            // Payments and coupons
            | Permission::InitiatePayment
            | Permission::ViewPayment
            | Permission::ApplyCoupon
            // Notifications
            | Permission::ReadNotification => owns_resource,

            // Agents moderate any review; authors handle their own.
            Permission::RespondReview | Permission::DeleteReview => {
                owns_resource || principal.role == Role::Agent
            }

            // Fleet-operations surface, restricted to agents.
            Permission::ViewLocations
            | Permission::ManageLocations
            | Permission::AssignVehicle
            | Permission::MarkVehicleMaintenance
            | Permission::ViewDashboard => principal.role == Role::Agent,

            // No ownership dimension: the role grant is the decision.
            _ => true,
        }
    }
}

impl PolicyEvaluator for PermissionEvaluator {
    fn can(&self, principal: &Principal, resource: &ResourceContext, permission: Permission) -> bool {
        self.has_contextual_permission(principal, resource, permission)
    }
}
