use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use crate::permission::Permission;
use crate::role::Role;

/// Immutable role → permission mapping.
///
/// Built once at startup (or taken from [`PermissionTable::default`], the
/// production rule set) and handed to the evaluator by value; nothing mutates
/// it afterwards, so it is safe to share across request tasks without locking.
///
/// A role that was never granted anything resolves to the empty set rather
/// than an error: authorization failures fail closed instead of crashing the
/// request pipeline.
#[derive(Debug, Clone)]
pub struct PermissionTable {
    rules: HashMap<Role, HashSet<Permission>>,
}

impl PermissionTable {
    pub fn builder() -> PermissionTableBuilder {
        PermissionTableBuilder {
            rules: HashMap::new(),
        }
    }

    /// Permission set granted to `role`; empty if the role has no rule.
    pub fn permissions_for(&self, role: Role) -> &HashSet<Permission> {
        match self.rules.get(&role) {
            Some(permissions) => permissions,
            None => {
                tracing::warn!(role = %role, "role has no permission rule, treating as empty");
                empty_set()
            }
        }
    }

    pub fn grants(&self, role: Role, permission: Permission) -> bool {
        self.rules
            .get(&role)
            .map(|permissions| permissions.contains(&permission))
            .unwrap_or(false)
    }

    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.rules.keys().copied()
    }
}

fn empty_set() -> &'static HashSet<Permission> {
    static EMPTY: OnceLock<HashSet<Permission>> = OnceLock::new();
    EMPTY.get_or_init(HashSet::new)
}

#[derive(Debug)]
pub struct PermissionTableBuilder {
    rules: HashMap<Role, HashSet<Permission>>,
}

impl PermissionTableBuilder {
    /// Grant `permissions` to `role`, merging with any earlier grant.
    pub fn grant(mut self, role: Role, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.rules.entry(role).or_default().extend(permissions);
        self
    }

    pub fn build(self) -> PermissionTable {
        PermissionTable { rules: self.rules }
    }
}

impl Default for PermissionTable {
    /// The production rule set.
    ///
    /// Admin holds the entire catalog. Agent operates the fleet: vehicles,
    /// booking lifecycle, reviews, notifications, locations, dashboard.
    /// Customer holds the self-service surface; several of these grants are
    /// further refined by the ownership dispatch in the contextual evaluator.
    fn default() -> Self {
        PermissionTable::builder()
            .grant(Role::Admin, Permission::ALL)
            .grant(
                Role::Agent,
                [
                    // Vehicles
                    Permission::ReadVehicle,
                    Permission::CreateVehicle,
                    Permission::UpdateVehicle,
                    Permission::AssignVehicle,
                    Permission::MarkVehicleMaintenance,
                    Permission::ManageVehicles,
                    // Bookings
                    Permission::UpdateBooking,
                    Permission::ApproveBooking,
                    Permission::RejectBooking,
                    Permission::CompleteBooking,
                    Permission::ManageBookings,
                    // Reviews
                    Permission::ReadReview,
                    Permission::RespondReview,
                    // Notifications
                    Permission::SendNotification,
                    Permission::ReadNotification,
                    // Locations
                    Permission::ViewLocations,
                    Permission::ManageLocations,
                    // Dashboard
                    Permission::ViewDashboard,
                    // Own account
                    Permission::ViewProfile,
                    Permission::UpdateProfile,
                    Permission::ChangePassword,
                ],
            )
            .grant(
                Role::Customer,
                [
                    Permission::ReadVehicle,
                    // Bookings, ownership-refined
                    Permission::CreateBooking,
                    Permission::ReadBooking,
                    Permission::CancelBooking,
                    // Payments, ownership-refined
                    Permission::InitiatePayment,
                    Permission::ViewPayment,
                    Permission::ApplyCoupon,
                    // Reviews; deletion is ownership-refined
                    Permission::ReadReview,
                    Permission::DeleteReview,
                    Permission::ViewLocations,
                    // Notifications, ownership-refined
                    Permission::ReadNotification,
                    // Own account
                    Permission::ViewProfile,
                    Permission::UpdateProfile,
                    Permission::ChangePassword,
                ],
            )
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_role_has_a_nonempty_rule() {
        let table = PermissionTable::default();
        for role in Role::ALL {
            assert!(
                !table.permissions_for(role).is_empty(),
                "{role} has no permissions"
            );
        }
    }

    #[test]
    fn admin_holds_the_full_catalog() {
        let table = PermissionTable::default();
        for permission in Permission::ALL {
            assert!(table.grants(Role::Admin, permission), "admin missing {permission}");
        }
    }

    #[test]
    fn customer_cannot_manage_users_or_delete_vehicles() {
        let table = PermissionTable::default();
        assert!(!table.grants(Role::Customer, Permission::DeleteUser));
        assert!(!table.grants(Role::Customer, Permission::ManageUsers));
        assert!(!table.grants(Role::Customer, Permission::DeleteVehicle));
        assert!(!table.grants(Role::Agent, Permission::DeleteVehicle));
    }

    #[test]
    fn unconfigured_role_degrades_to_empty() {
        let table = PermissionTable::builder()
            .grant(Role::Admin, [Permission::ReadUser])
            .build();
        assert!(table.permissions_for(Role::Customer).is_empty());
        assert!(!table.grants(Role::Customer, Permission::ReadUser));
    }

    #[test]
    fn grants_merge_across_builder_calls() {
        let table = PermissionTable::builder()
            .grant(Role::Agent, [Permission::ReadVehicle])
            .grant(Role::Agent, [Permission::UpdateVehicle])
            .build();
        assert!(table.grants(Role::Agent, Permission::ReadVehicle));
        assert!(table.grants(Role::Agent, Permission::UpdateVehicle));
    }
}
