//! Application services and ports.

#![forbid(unsafe_code)]

mod audit_ports;
mod authorization_service;
mod role_admin_ports;
mod role_admin_service;

pub use audit_ports::{
    AuditEvent, AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditRepository,
};
pub use authorization_service::{AuthorizationRepository, AuthorizationService};
pub use role_admin_ports::{
    AssignRoleInput, CreateRoleInput, RoleAdminRepository, SetOverrideInput, TransferRoleInput,
    UpdateRoleInput,
};
pub use role_admin_service::RoleAdminService;
