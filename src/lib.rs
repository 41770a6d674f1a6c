//! Role and ownership based authorization for the fleet rental platform.
//!
//! This crate is the authorization core consumed by the platform's HTTP
//! services:
//! - a static role → permission table, built once and injected ([`PermissionTable`])
//! - role-level queries over it ([`PermissionEvaluator`])
//! - contextual refinement by resource ownership, with an Admin bypass and an
//!   Agent moderation override
//! - a route guard that rejects requests before the handler runs
//!   ([`RequirePermission`]) and attaches the resolved permission set for
//!   downstream checks ([`GrantedPermissions`])
//!
//! Authentication is not this crate's concern: an upstream layer verifies the
//! credential and inserts a [`Principal`] into request extensions. Ownership
//! lookups are not either: business logic resolves the target resource into a
//! [`ResourceContext`] before asking for a contextual decision.

pub mod errors;
pub mod evaluator;
pub mod guard;
pub mod matrix;
pub mod permission;
pub mod principal;
pub mod role;
pub mod table;

pub use errors::AuthzError;
pub use evaluator::{ownership_scoped, PermissionEvaluator, PolicyEvaluator};
pub use guard::{AuthzMode, GrantedPermissions, RequirePermission};
pub use matrix::{EffectivePermissions, PermissionMatrix};
pub use permission::{Permission, UnknownPermission};
pub use principal::{Principal, ResourceContext};
pub use role::{Role, UnknownRole};
pub use table::{PermissionTable, PermissionTableBuilder};
