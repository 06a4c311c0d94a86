use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use orgrole_application::RoleAdminRepository;
use orgrole_core::{AppError, AppResult, UserId};
use orgrole_domain::{
    AcademicYearId, AssignmentId, AssignmentPermissionOverride, Permission, Role, RoleAssignment,
    RoleId,
};

mod assignments;
mod overrides;
mod roles;

/// PostgreSQL-backed repository for role, assignment and override administration.
#[derive(Clone)]
pub struct PostgresRoleAdminRepository {
    pool: PgPool,
}

impl PostgresRoleAdminRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> AppResult<Transaction<'_, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|error| AppError::Internal(format!("failed to begin transaction: {error}")))
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    role_id: uuid::Uuid,
    role_name: String,
    role_description: Option<String>,
    role_priority: i32,
    permission: Option<String>,
}

#[derive(Debug, FromRow)]
struct RoleAssignmentRow {
    assignment_id: uuid::Uuid,
    user_id: uuid::Uuid,
    role_id: uuid::Uuid,
    academic_year_id: uuid::Uuid,
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct OverrideRow {
    assignment_id: uuid::Uuid,
    permission: String,
    is_granted: bool,
}

#[async_trait]
impl RoleAdminRepository for PostgresRoleAdminRepository {
    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        self.list_roles_impl().await
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        self.find_role_impl(role_id).await
    }

    async fn insert_role(&self, role: Role) -> AppResult<()> {
        self.insert_role_impl(role).await
    }

    async fn update_role(&self, role: Role) -> AppResult<()> {
        self.update_role_impl(role).await
    }

    async fn attach_role_permission(
        &self,
        role_id: RoleId,
        permission: Permission,
    ) -> AppResult<bool> {
        self.attach_role_permission_impl(role_id, permission).await
    }

    async fn detach_role_permission(
        &self,
        role_id: RoleId,
        permission: Permission,
    ) -> AppResult<bool> {
        self.detach_role_permission_impl(role_id, permission).await
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        self.delete_role_impl(role_id).await
    }

    async fn count_role_assignments(&self, role_id: RoleId) -> AppResult<u64> {
        self.count_role_assignments_impl(role_id).await
    }

    async fn insert_assignment(&self, assignment: RoleAssignment) -> AppResult<()> {
        self.insert_assignment_impl(assignment).await
    }

    async fn find_assignment(
        &self,
        assignment_id: AssignmentId,
    ) -> AppResult<Option<RoleAssignment>> {
        self.find_assignment_impl(assignment_id).await
    }

    async fn close_assignment(
        &self,
        assignment_id: AssignmentId,
        ends_at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.close_assignment_impl(assignment_id, ends_at).await
    }

    async fn transfer_assignment(
        &self,
        source: AssignmentId,
        ends_at: DateTime<Utc>,
        replacement: RoleAssignment,
    ) -> AppResult<()> {
        self.transfer_assignment_impl(source, ends_at, replacement)
            .await
    }

    async fn delete_assignment(&self, assignment_id: AssignmentId) -> AppResult<()> {
        self.delete_assignment_impl(assignment_id).await
    }

    async fn list_assignments_for_user(&self, user_id: UserId) -> AppResult<Vec<RoleAssignment>> {
        self.list_assignments_for_user_impl(user_id).await
    }

    async fn save_override(&self, value: AssignmentPermissionOverride) -> AppResult<()> {
        self.save_override_impl(value).await
    }

    async fn clear_override(
        &self,
        assignment_id: AssignmentId,
        permission: Permission,
    ) -> AppResult<bool> {
        self.clear_override_impl(assignment_id, permission).await
    }

    async fn list_overrides(
        &self,
        assignment_id: AssignmentId,
    ) -> AppResult<Vec<AssignmentPermissionOverride>> {
        self.list_overrides_impl(assignment_id).await
    }
}

fn aggregate_roles(rows: Vec<RoleRow>) -> AppResult<Vec<Role>> {
    let mut order = Vec::new();
    let mut by_id: HashMap<uuid::Uuid, (RoleRow, Vec<Permission>)> = HashMap::new();

    for mut row in rows {
        let permission = row.permission.take().map(decode_permission).transpose()?;
        let entry = by_id.entry(row.role_id).or_insert_with(|| {
            order.push(row.role_id);
            (row, Vec::new())
        });

        if let Some(permission) = permission {
            entry.1.push(permission);
        }
    }

    order
        .into_iter()
        .filter_map(|role_id| by_id.remove(&role_id))
        .map(|(row, permissions)| {
            Role::new(
                RoleId::from_uuid(row.role_id),
                row.role_name,
                row.role_description,
                row.role_priority,
                permissions,
            )
        })
        .collect()
}

fn assignment_from_row(row: RoleAssignmentRow) -> AppResult<RoleAssignment> {
    RoleAssignment::new(
        AssignmentId::from_uuid(row.assignment_id),
        UserId::from_uuid(row.user_id),
        RoleId::from_uuid(row.role_id),
        AcademicYearId::from_uuid(row.academic_year_id),
        row.starts_at,
        row.ends_at,
    )
}

fn override_from_row(row: OverrideRow) -> AppResult<AssignmentPermissionOverride> {
    Ok(AssignmentPermissionOverride {
        assignment_id: AssignmentId::from_uuid(row.assignment_id),
        permission: decode_permission(row.permission)?,
        is_granted: row.is_granted,
    })
}

fn decode_permission(value: String) -> AppResult<Permission> {
    Permission::from_str(value.as_str()).map_err(|error| {
        AppError::Internal(format!("invalid stored permission '{value}': {error}"))
    })
}

fn database_error_code(error: &sqlx::Error) -> Option<String> {
    match error {
        sqlx::Error::Database(database_error) => {
            database_error.code().map(|code| code.into_owned())
        }
        _ => None,
    }
}

fn map_role_conflict(error: sqlx::Error, role_name: &str) -> AppError {
    if database_error_code(&error).as_deref() == Some("23505") {
        return AppError::Conflict(format!("role '{role_name}' already exists"));
    }

    AppError::Internal(format!("failed to persist role: {error}"))
}

fn map_missing_reference(error: sqlx::Error, action: &str) -> AppError {
    if database_error_code(&error).as_deref() == Some("23503") {
        let constraint = match &error {
            sqlx::Error::Database(database_error) => {
                database_error.constraint().unwrap_or("unknown").to_owned()
            }
            _ => "unknown".to_owned(),
        };
        return AppError::NotFound(format!(
            "failed to {action}: referenced record is missing ({constraint})"
        ));
    }

    AppError::Internal(format!("failed to {action}: {error}"))
}
