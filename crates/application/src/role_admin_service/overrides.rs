use orgrole_core::AppError;
use orgrole_domain::{AssignmentId, AssignmentPermissionOverride};

use crate::role_admin_ports::SetOverrideInput;

use super::*;

impl RoleAdminService {
    /// Creates or changes the override of one permission on one assignment.
    pub async fn set_override(
        &self,
        actor: &UserIdentity,
        input: SetOverrideInput,
        as_of: DateTime<Utc>,
    ) -> AppResult<AssignmentPermissionOverride> {
        self.require_role_manage_permission(actor, as_of).await?;

        let permission = Permission::from_transport(&input.permission)?;
        self.load_assignment(input.assignment_id).await?;

        let value = AssignmentPermissionOverride {
            assignment_id: input.assignment_id,
            permission,
            is_granted: input.is_granted,
        };
        self.repository.save_override(value).await?;

        let verb = if value.is_granted { "granted" } else { "revoked" };
        self.audit(
            actor,
            AuditAction::SecurityOverrideSaved,
            "assignment_override",
            format!("{}:{permission}", input.assignment_id),
            format!("{verb} '{permission}' on assignment '{}'", input.assignment_id),
        )
        .await?;

        Ok(value)
    }

    /// Removes the override of one permission on one assignment.
    pub async fn clear_override(
        &self,
        actor: &UserIdentity,
        assignment_id: AssignmentId,
        permission_name: &str,
        as_of: DateTime<Utc>,
    ) -> AppResult<()> {
        self.require_role_manage_permission(actor, as_of).await?;

        let permission = Permission::from_transport(permission_name)?;
        if !self
            .repository
            .clear_override(assignment_id, permission)
            .await?
        {
            return Err(AppError::NotFound(format!(
                "override '{permission}' on assignment '{assignment_id}' was not found"
            )));
        }

        self.audit(
            actor,
            AuditAction::SecurityOverrideCleared,
            "assignment_override",
            format!("{assignment_id}:{permission}"),
            format!("cleared '{permission}' on assignment '{assignment_id}'"),
        )
        .await
    }

    /// Lists the overrides of one assignment.
    pub async fn list_overrides(
        &self,
        actor: &UserIdentity,
        assignment_id: AssignmentId,
        as_of: DateTime<Utc>,
    ) -> AppResult<Vec<AssignmentPermissionOverride>> {
        self.require_role_manage_permission(actor, as_of).await?;

        self.load_assignment(assignment_id).await?;
        self.repository.list_overrides(assignment_id).await
    }
}
