use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::debug;

use orgrole_application::AuthorizationRepository;
use orgrole_core::{AppError, AppResult, UserId};
use orgrole_domain::{
    AcademicYearId, AssignmentGrants, AssignmentId, AssignmentPermissionOverride, Permission,
    Role, RoleAssignment, RoleId,
};

/// PostgreSQL-backed repository for assignment-grant lookups.
#[derive(Clone)]
pub struct PostgresAuthorizationRepository {
    pool: PgPool,
}

impl PostgresAuthorizationRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AssignmentGrantRow {
    assignment_id: uuid::Uuid,
    user_id: uuid::Uuid,
    academic_year_id: uuid::Uuid,
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
    role_id: uuid::Uuid,
    role_name: String,
    role_description: Option<String>,
    role_priority: i32,
    role_permissions: Vec<String>,
    granted_overrides: Vec<String>,
    revoked_overrides: Vec<String>,
}

#[async_trait]
impl AuthorizationRepository for PostgresAuthorizationRepository {
    async fn load_assignment_grants(
        &self,
        user_id: UserId,
        as_of: DateTime<Utc>,
    ) -> AppResult<Vec<AssignmentGrants>> {
        let rows = sqlx::query_as::<_, AssignmentGrantRow>(
            r#"
            SELECT
                assignments.id AS assignment_id,
                assignments.user_id,
                assignments.academic_year_id,
                assignments.starts_at,
                assignments.ends_at,
                roles.id AS role_id,
                roles.name AS role_name,
                roles.description AS role_description,
                roles.priority AS role_priority,
                ARRAY(
                    SELECT role_permissions.permission
                    FROM role_permissions
                    WHERE role_permissions.role_id = roles.id
                    ORDER BY role_permissions.permission
                ) AS role_permissions,
                ARRAY(
                    SELECT overrides.permission
                    FROM assignment_permission_overrides AS overrides
                    WHERE overrides.assignment_id = assignments.id
                        AND overrides.is_granted
                    ORDER BY overrides.permission
                ) AS granted_overrides,
                ARRAY(
                    SELECT overrides.permission
                    FROM assignment_permission_overrides AS overrides
                    WHERE overrides.assignment_id = assignments.id
                        AND NOT overrides.is_granted
                    ORDER BY overrides.permission
                ) AS revoked_overrides
            FROM role_assignments AS assignments
            INNER JOIN roles
                ON roles.id = assignments.role_id
            WHERE assignments.user_id = $1
                AND assignments.starts_at <= $2
                AND (assignments.ends_at IS NULL OR assignments.ends_at >= $2)
            ORDER BY roles.priority, roles.name, assignments.id
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(as_of)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load role assignments: {error}"))
        })?;

        debug!(
            user_id = %user_id,
            assignments = rows.len(),
            "loaded active role assignments"
        );

        rows.into_iter().map(grants_from_row).collect()
    }
}

fn grants_from_row(row: AssignmentGrantRow) -> AppResult<AssignmentGrants> {
    let assignment_id = AssignmentId::from_uuid(row.assignment_id);
    let role = Role::new(
        RoleId::from_uuid(row.role_id),
        row.role_name,
        row.role_description,
        row.role_priority,
        decode_permissions(&row.role_permissions, assignment_id)?,
    )?;
    let assignment = RoleAssignment::new(
        assignment_id,
        UserId::from_uuid(row.user_id),
        role.role_id(),
        AcademicYearId::from_uuid(row.academic_year_id),
        row.starts_at,
        row.ends_at,
    )?;

    let granted = decode_permissions(&row.granted_overrides, assignment_id)?
        .into_iter()
        .map(|permission| (permission, true));
    let revoked = decode_permissions(&row.revoked_overrides, assignment_id)?
        .into_iter()
        .map(|permission| (permission, false));
    let overrides = granted
        .chain(revoked)
        .map(|(permission, is_granted)| AssignmentPermissionOverride {
            assignment_id,
            permission,
            is_granted,
        });

    AssignmentGrants::new(assignment, role, overrides)
}

fn decode_permissions(values: &[String], assignment_id: AssignmentId) -> AppResult<Vec<Permission>> {
    values
        .iter()
        .map(|value| {
            Permission::from_str(value.as_str()).map_err(|error| {
                AppError::Internal(format!(
                    "failed to decode permission '{value}' for assignment '{assignment_id}': {error}"
                ))
            })
        })
        .collect()
}
