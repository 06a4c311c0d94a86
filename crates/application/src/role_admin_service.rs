use std::sync::Arc;

use chrono::{DateTime, Utc};
use orgrole_core::{AppResult, UserIdentity};
use orgrole_domain::{AuditAction, Permission};

use crate::audit_ports::{
    AuditEvent, AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditRepository,
};
use crate::role_admin_ports::RoleAdminRepository;
use crate::AuthorizationService;

mod assignments;
mod overrides;
mod roles;

/// Application service for role, assignment and override administration.
///
/// Every use-case checks the actor's permissions as of the supplied instant and
/// appends an audit event after a successful mutation.
#[derive(Clone)]
pub struct RoleAdminService {
    authorization_service: AuthorizationService,
    repository: Arc<dyn RoleAdminRepository>,
    audit_log_repository: Arc<dyn AuditLogRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl RoleAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        authorization_service: AuthorizationService,
        repository: Arc<dyn RoleAdminRepository>,
        audit_log_repository: Arc<dyn AuditLogRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            authorization_service,
            repository,
            audit_log_repository,
            audit_repository,
        }
    }

    /// Returns recent audit entries.
    pub async fn list_audit_log(
        &self,
        actor: &UserIdentity,
        query: AuditLogQuery,
        as_of: DateTime<Utc>,
    ) -> AppResult<Vec<AuditLogEntry>> {
        self.authorization_service
            .require_permission(actor.user_id(), Permission::SystemAuditRead, as_of)
            .await?;

        self.audit_log_repository.list_recent_entries(query).await
    }

    async fn require_role_manage_permission(
        &self,
        actor: &UserIdentity,
        as_of: DateTime<Utc>,
    ) -> AppResult<()> {
        self.authorization_service
            .require_permission(actor.user_id(), Permission::SystemRoleManage, as_of)
            .await
    }

    async fn audit(
        &self,
        actor: &UserIdentity,
        action: AuditAction,
        resource_type: &str,
        resource_id: String,
        detail: String,
    ) -> AppResult<()> {
        self.audit_repository
            .append_event(AuditEvent {
                actor: actor.user_id(),
                action,
                resource_type: resource_type.to_owned(),
                resource_id,
                detail: Some(detail),
            })
            .await
    }
}
