//! Access-control entities, the permission catalog and the resolver.

#![forbid(unsafe_code)]

mod assignment;
mod ids;
mod resolver;
mod role;
mod security;

pub use assignment::{AssignmentPermissionOverride, RoleAssignment};
pub use ids::{AcademicYearId, AssignmentId, RoleId};
pub use orgrole_core::UserId;
pub use resolver::{
    AssignmentGrants, PermissionDecision, active_roles, effective_permissions, has_permission,
    resolve_catalog_permission, resolve_permission,
};
pub use role::Role;
pub use security::{AuditAction, Permission, PermissionDomain};
