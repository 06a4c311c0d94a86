use orgrole_core::AppError;
use orgrole_domain::{Role, RoleId};
use tracing::info;

use crate::role_admin_ports::{CreateRoleInput, UpdateRoleInput};

use super::*;

impl RoleAdminService {
    /// Returns all roles for administrative users.
    pub async fn list_roles(
        &self,
        actor: &UserIdentity,
        as_of: DateTime<Utc>,
    ) -> AppResult<Vec<Role>> {
        self.require_role_manage_permission(actor, as_of).await?;
        self.repository.list_roles().await
    }

    /// Returns one role.
    pub async fn find_role(
        &self,
        actor: &UserIdentity,
        role_id: RoleId,
        as_of: DateTime<Utc>,
    ) -> AppResult<Role> {
        self.require_role_manage_permission(actor, as_of).await?;
        self.load_role(role_id).await
    }

    /// Creates a role and emits an audit event.
    pub async fn create_role(
        &self,
        actor: &UserIdentity,
        input: CreateRoleInput,
        as_of: DateTime<Utc>,
    ) -> AppResult<Role> {
        self.require_role_manage_permission(actor, as_of).await?;

        let permissions = parse_permissions(&input.permissions)?;
        let role = Role::new(
            RoleId::new(),
            input.name,
            input.description,
            input.priority,
            permissions,
        )?;
        self.repository.insert_role(role.clone()).await?;

        info!(
            role_id = %role.role_id(),
            role_name = role.name().as_str(),
            priority = role.priority(),
            "role created"
        );
        self.audit(
            actor,
            AuditAction::SecurityRoleCreated,
            "role",
            role.role_id().to_string(),
            format!(
                "created role '{}' with priority {}",
                role.name(),
                role.priority()
            ),
        )
        .await?;

        Ok(role)
    }

    /// Updates name, description or priority of a role.
    pub async fn update_role(
        &self,
        actor: &UserIdentity,
        role_id: RoleId,
        input: UpdateRoleInput,
        as_of: DateTime<Utc>,
    ) -> AppResult<Role> {
        self.require_role_manage_permission(actor, as_of).await?;

        let mut role = self.load_role(role_id).await?;
        if let Some(name) = input.name {
            role.rename(name)?;
        }
        if let Some(description) = input.description {
            role.set_description(Some(description));
        }
        if let Some(priority) = input.priority {
            role.set_priority(priority);
        }
        self.repository.update_role(role.clone()).await?;
        let role = self.load_role(role_id).await?;

        self.audit(
            actor,
            AuditAction::SecurityRoleUpdated,
            "role",
            role_id.to_string(),
            format!(
                "updated role '{}' (priority {})",
                role.name(),
                role.priority()
            ),
        )
        .await?;

        Ok(role)
    }

    /// Deletes a role that has no assignment history.
    pub async fn delete_role(
        &self,
        actor: &UserIdentity,
        role_id: RoleId,
        as_of: DateTime<Utc>,
    ) -> AppResult<()> {
        self.require_role_manage_permission(actor, as_of).await?;

        let role = self.load_role(role_id).await?;
        let assignment_count = self.repository.count_role_assignments(role_id).await?;
        if assignment_count > 0 {
            return Err(AppError::Conflict(format!(
                "role '{}' has {assignment_count} assignment(s) and cannot be deleted",
                role.name()
            )));
        }

        self.repository.delete_role(role_id).await?;

        info!(role_id = %role_id, role_name = role.name().as_str(), "role deleted");
        self.audit(
            actor,
            AuditAction::SecurityRoleDeleted,
            "role",
            role_id.to_string(),
            format!("deleted role '{}'", role.name()),
        )
        .await
    }

    /// Adds a default permission to a role.
    pub async fn attach_permission(
        &self,
        actor: &UserIdentity,
        role_id: RoleId,
        permission_name: &str,
        as_of: DateTime<Utc>,
    ) -> AppResult<Role> {
        self.require_role_manage_permission(actor, as_of).await?;

        let permission = Permission::from_transport(permission_name)?;
        self.load_role(role_id).await?;
        let changed = self
            .repository
            .attach_role_permission(role_id, permission)
            .await?;
        let role = self.load_role(role_id).await?;
        if !changed {
            return Ok(role);
        }

        self.audit(
            actor,
            AuditAction::SecurityRolePermissionAttached,
            "role_permission",
            format!("{role_id}:{permission}"),
            format!("attached '{permission}' to role '{}'", role.name()),
        )
        .await?;

        Ok(role)
    }

    /// Removes a default permission from a role.
    pub async fn detach_permission(
        &self,
        actor: &UserIdentity,
        role_id: RoleId,
        permission_name: &str,
        as_of: DateTime<Utc>,
    ) -> AppResult<Role> {
        self.require_role_manage_permission(actor, as_of).await?;

        let permission = Permission::from_transport(permission_name)?;
        self.load_role(role_id).await?;
        let changed = self
            .repository
            .detach_role_permission(role_id, permission)
            .await?;
        let role = self.load_role(role_id).await?;
        if !changed {
            return Ok(role);
        }

        self.audit(
            actor,
            AuditAction::SecurityRolePermissionDetached,
            "role_permission",
            format!("{role_id}:{permission}"),
            format!("detached '{permission}' from role '{}'", role.name()),
        )
        .await?;

        Ok(role)
    }

    pub(super) async fn load_role(&self, role_id: RoleId) -> AppResult<Role> {
        self.repository
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))
    }
}

fn parse_permissions(names: &[String]) -> AppResult<Vec<Permission>> {
    names
        .iter()
        .map(|name| Permission::from_transport(name.as_str()))
        .collect()
}
