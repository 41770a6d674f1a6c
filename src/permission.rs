use serde::{Deserialize, Serialize};

/// The platform's permission catalog.
///
/// Permissions are static identifiers, never minted at runtime, and serialize
/// as their canonical `<resource>:<action>` string. Adding a variant here and
/// to [`Permission::ALL`] is the only way a new permission enters the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Permission {
    // User management
    CreateUser,
    ReadUser,
    UpdateUser,
    DeleteUser,
    ManageUsers,

    // Vehicle management
    CreateVehicle,
    ReadVehicle,
    UpdateVehicle,
    DeleteVehicle,
    ManageVehicles,
    AssignVehicle,
    MarkVehicleMaintenance,

    // Booking management
    CreateBooking,
    ReadBooking,
    UpdateBooking,
    DeleteBooking,
    ApproveBooking,
    RejectBooking,
    CancelBooking,
    CompleteBooking,
    ManageBookings,

    // Payments and coupons
    InitiatePayment,
    ViewPayment,
    IssueRefund,
    ApplyCoupon,
    ManageCoupons,

    // Reviews
    ReadReview,
    RespondReview,
    DeleteReview,

    // Notifications
    SendNotification,
    ReadNotification,

    // System
    ViewDashboard,
    ManageSettings,
    AccessAdminPanel,

    // Profile / account
    ViewProfile,
    UpdateProfile,
    ChangePassword,

    // Audit logs
    ReadAuditLogs,

    // Locations
    ManageLocations,
    ViewLocations,
}

impl Permission {
    pub const ALL: [Permission; 40] = [
        Permission::CreateUser,
        Permission::ReadUser,
        Permission::UpdateUser,
        Permission::DeleteUser,
        Permission::ManageUsers,
        Permission::CreateVehicle,
        Permission::ReadVehicle,
        Permission::UpdateVehicle,
        Permission::DeleteVehicle,
        Permission::ManageVehicles,
        Permission::AssignVehicle,
        Permission::MarkVehicleMaintenance,
        Permission::CreateBooking,
        Permission::ReadBooking,
        Permission::UpdateBooking,
        Permission::DeleteBooking,
        Permission::ApproveBooking,
        Permission::RejectBooking,
        Permission::CancelBooking,
        Permission::CompleteBooking,
        Permission::ManageBookings,
        Permission::InitiatePayment,
        Permission::ViewPayment,
        Permission::IssueRefund,
        Permission::ApplyCoupon,
        Permission::ManageCoupons,
        Permission::ReadReview,
        Permission::RespondReview,
        Permission::DeleteReview,
        Permission::SendNotification,
        Permission::ReadNotification,
        Permission::ViewDashboard,
        Permission::ManageSettings,
        Permission::AccessAdminPanel,
        Permission::ViewProfile,
        Permission::UpdateProfile,
        Permission::ChangePassword,
        Permission::ReadAuditLogs,
        Permission::ManageLocations,
        Permission::ViewLocations,
    ];

    /// Canonical `<resource>:<action>` name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::CreateUser => "user:create",
            Permission::ReadUser => "user:read",
            Permission::UpdateUser => "user:update",
            Permission::DeleteUser => "user:delete",
            Permission::ManageUsers => "user:manage",
            Permission::CreateVehicle => "vehicle:create",
            Permission::ReadVehicle => "vehicle:read",
            Permission::UpdateVehicle => "vehicle:update",
            Permission::DeleteVehicle => "vehicle:delete",
            Permission::ManageVehicles => "vehicle:manage",
            Permission::AssignVehicle => "vehicle:assign",
            Permission::MarkVehicleMaintenance => "vehicle:mark_maintenance",
            Permission::CreateBooking => "booking:create",
            Permission::ReadBooking => "booking:read",
            Permission::UpdateBooking => "booking:update",
            Permission::DeleteBooking => "booking:delete",
            Permission::ApproveBooking => "booking:approve",
            Permission::RejectBooking => "booking:reject",
            Permission::CancelBooking => "booking:cancel",
            Permission::CompleteBooking => "booking:complete",
            Permission::ManageBookings => "booking:manage",
            Permission::InitiatePayment => "payment:initiate",
            Permission::ViewPayment => "payment:view",
            Permission::IssueRefund => "payment:refund",
            Permission::ApplyCoupon => "payment:apply_coupon",
            Permission::ManageCoupons => "payment:manage_coupons",
            Permission::ReadReview => "review:read",
            Permission::RespondReview => "review:respond",
            Permission::DeleteReview => "review:delete",
            Permission::SendNotification => "notification:send",
            Permission::ReadNotification => "notification:read",
            Permission::ViewDashboard => "system:view_dashboard",
            Permission::ManageSettings => "system:manage_settings",
            Permission::AccessAdminPanel => "system:access_admin",
            Permission::ViewProfile => "account:view",
            Permission::UpdateProfile => "account:update",
            Permission::ChangePassword => "account:change_password",
            Permission::ReadAuditLogs => "audit:read",
            Permission::ManageLocations => "location:manage",
            Permission::ViewLocations => "location:view",
        }
    }

    /// Resource half of the permission name, e.g. `booking` for `booking:cancel`.
    pub fn resource(&self) -> &'static str {
        match self.as_str().split_once(':') {
            Some((resource, _)) => resource,
            None => self.as_str(),
        }
    }

    /// Action half of the permission name, e.g. `cancel` for `booking:cancel`.
    pub fn action(&self) -> &'static str {
        match self.as_str().split_once(':') {
            Some((_, action)) => action,
            None => self.as_str(),
        }
    }

    /// Functional area the permission belongs to, used to group matrix output.
    pub fn category(&self) -> &'static str {
        match self.resource() {
            "user" => "users",
            "vehicle" => "vehicles",
            "booking" => "bookings",
            "payment" => "payments",
            "review" => "reviews",
            "notification" => "notifications",
            "location" => "locations",
            "account" => "account",
            "system" => "system",
            "audit" => "audit_logs",
            other => other,
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission: {0}")]
pub struct UnknownPermission(pub String);

impl std::str::FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .copied()
            .find(|permission| permission.as_str() == value)
            .ok_or_else(|| UnknownPermission(value.to_string()))
    }
}

impl Serialize for Permission {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_names_are_namespaced_and_unique() {
        let mut seen = HashSet::new();
        for permission in Permission::ALL {
            assert!(
                permission.as_str().split_once(':').is_some(),
                "{permission} is not <resource>:<action>"
            );
            assert!(seen.insert(permission.as_str()), "duplicate name {permission}");
        }
        assert_eq!(seen.len(), Permission::ALL.len());
    }

    #[test]
    fn parses_canonical_names() {
        for permission in Permission::ALL {
            assert_eq!(permission.as_str().parse::<Permission>().unwrap(), permission);
        }
        assert!("booking:teleport".parse::<Permission>().is_err());
        assert!("CANCEL_BOOKING".parse::<Permission>().is_err());
    }

    #[test]
    fn serde_uses_canonical_strings() {
        let json = serde_json::to_string(&Permission::CancelBooking).unwrap();
        assert_eq!(json, "\"booking:cancel\"");
        let parsed: Permission = serde_json::from_str("\"vehicle:assign\"").unwrap();
        assert_eq!(parsed, Permission::AssignVehicle);
        assert!(serde_json::from_str::<Permission>("\"cart:view\"").is_err());
    }

    #[test]
    fn splits_resource_and_action() {
        assert_eq!(Permission::MarkVehicleMaintenance.resource(), "vehicle");
        assert_eq!(Permission::MarkVehicleMaintenance.action(), "mark_maintenance");
        assert_eq!(Permission::ReadAuditLogs.category(), "audit_logs");
    }
}
