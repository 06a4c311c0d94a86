use orgrole_core::{AppError, UserId};
use orgrole_domain::{AssignmentId, RoleAssignment};
use tracing::info;

use crate::role_admin_ports::{AssignRoleInput, TransferRoleInput};

use super::*;

impl RoleAdminService {
    /// Grants a role to a user for an academic year.
    pub async fn assign_role(
        &self,
        actor: &UserIdentity,
        input: AssignRoleInput,
        as_of: DateTime<Utc>,
    ) -> AppResult<RoleAssignment> {
        self.require_role_manage_permission(actor, as_of).await?;

        let role = self.load_role(input.role_id).await?;
        let assignment = RoleAssignment::new(
            AssignmentId::new(),
            input.user_id,
            input.role_id,
            input.academic_year_id,
            input.starts_at,
            input.ends_at,
        )?;
        self.repository.insert_assignment(assignment.clone()).await?;

        info!(
            assignment_id = %assignment.assignment_id(),
            user_id = %assignment.user_id(),
            role_name = role.name().as_str(),
            "role assigned"
        );
        self.audit(
            actor,
            AuditAction::SecurityRoleAssigned,
            "role_assignment",
            assignment.assignment_id().to_string(),
            format!(
                "assigned role '{}' to '{}' for academic year '{}'",
                role.name(),
                assignment.user_id(),
                assignment.academic_year_id()
            ),
        )
        .await?;

        Ok(assignment)
    }

    /// Records the end of an open assignment.
    pub async fn close_assignment(
        &self,
        actor: &UserIdentity,
        assignment_id: AssignmentId,
        ends_at: DateTime<Utc>,
        as_of: DateTime<Utc>,
    ) -> AppResult<RoleAssignment> {
        self.require_role_manage_permission(actor, as_of).await?;

        let mut assignment = self.load_assignment(assignment_id).await?;
        assignment.close(ends_at)?;
        self.repository
            .close_assignment(assignment_id, ends_at)
            .await?;

        self.audit(
            actor,
            AuditAction::SecurityAssignmentClosed,
            "role_assignment",
            assignment_id.to_string(),
            format!("closed assignment at '{}'", ends_at.to_rfc3339()),
        )
        .await?;

        Ok(assignment)
    }

    /// Hands a held role over to another user.
    ///
    /// The source assignment is closed one microsecond before `effective_at` and a
    /// new open assignment for the same role and academic year starts at that
    /// instant. A handover at or before the source start is a validation error.
    pub async fn transfer_role(
        &self,
        actor: &UserIdentity,
        input: TransferRoleInput,
        as_of: DateTime<Utc>,
    ) -> AppResult<RoleAssignment> {
        self.require_role_manage_permission(actor, as_of).await?;

        let mut source = self.load_assignment(input.assignment_id).await?;
        if source.user_id() == input.to_user_id {
            return Err(AppError::Validation(format!(
                "assignment '{}' already belongs to '{}'",
                input.assignment_id, input.to_user_id
            )));
        }

        // The outgoing holder stops one tick before the successor starts, so the
        // inclusive end bound never yields two holders at `effective_at`.
        let source_ends_at = input.effective_at - chrono::Duration::microseconds(1);
        source.close(source_ends_at)?;
        let replacement = RoleAssignment::new(
            AssignmentId::new(),
            input.to_user_id,
            source.role_id(),
            source.academic_year_id(),
            input.effective_at,
            None,
        )?;
        self.repository
            .transfer_assignment(input.assignment_id, source_ends_at, replacement.clone())
            .await?;

        info!(
            from_assignment_id = %input.assignment_id,
            to_assignment_id = %replacement.assignment_id(),
            from_user_id = %source.user_id(),
            to_user_id = %input.to_user_id,
            "role transferred"
        );
        self.audit(
            actor,
            AuditAction::SecurityRoleTransferred,
            "role_assignment",
            replacement.assignment_id().to_string(),
            format!(
                "transferred role '{}' from '{}' to '{}' at '{}'",
                source.role_id(),
                source.user_id(),
                input.to_user_id,
                input.effective_at.to_rfc3339()
            ),
        )
        .await?;

        Ok(replacement)
    }

    /// Removes an assignment and its overrides outright.
    pub async fn remove_assignment(
        &self,
        actor: &UserIdentity,
        assignment_id: AssignmentId,
        as_of: DateTime<Utc>,
    ) -> AppResult<()> {
        self.require_role_manage_permission(actor, as_of).await?;

        let assignment = self.load_assignment(assignment_id).await?;
        self.repository.delete_assignment(assignment_id).await?;

        self.audit(
            actor,
            AuditAction::SecurityAssignmentRemoved,
            "role_assignment",
            assignment_id.to_string(),
            format!(
                "removed role '{}' from '{}'",
                assignment.role_id(),
                assignment.user_id()
            ),
        )
        .await
    }

    /// Lists every assignment of a user, open or closed.
    pub async fn list_user_assignments(
        &self,
        actor: &UserIdentity,
        user_id: UserId,
        as_of: DateTime<Utc>,
    ) -> AppResult<Vec<RoleAssignment>> {
        self.require_role_manage_permission(actor, as_of).await?;
        self.repository.list_assignments_for_user(user_id).await
    }

    pub(super) async fn load_assignment(
        &self,
        assignment_id: AssignmentId,
    ) -> AppResult<RoleAssignment> {
        self.repository
            .find_assignment(assignment_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("role assignment '{assignment_id}' was not found"))
            })
    }
}
