use super::*;

impl PostgresRoleAdminRepository {
    pub(super) async fn save_override_impl(
        &self,
        value: AssignmentPermissionOverride,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO assignment_permission_overrides (assignment_id, permission, is_granted)
            VALUES ($1, $2, $3)
            ON CONFLICT (assignment_id, permission) DO UPDATE
            SET is_granted = EXCLUDED.is_granted,
                updated_at = now()
            "#,
        )
        .bind(value.assignment_id.as_uuid())
        .bind(value.permission.as_str())
        .bind(value.is_granted)
        .execute(&self.pool)
        .await
        .map_err(|error| map_missing_reference(error, "save permission override"))?;

        Ok(())
    }

    pub(super) async fn clear_override_impl(
        &self,
        assignment_id: AssignmentId,
        permission: Permission,
    ) -> AppResult<bool> {
        let deleted = sqlx::query(
            r#"
            DELETE FROM assignment_permission_overrides
            WHERE assignment_id = $1
                AND permission = $2
            "#,
        )
        .bind(assignment_id.as_uuid())
        .bind(permission.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to clear permission override: {error}"))
        })?;

        Ok(deleted.rows_affected() > 0)
    }

    pub(super) async fn list_overrides_impl(
        &self,
        assignment_id: AssignmentId,
    ) -> AppResult<Vec<AssignmentPermissionOverride>> {
        let rows = sqlx::query_as::<_, OverrideRow>(
            r#"
            SELECT assignment_id, permission, is_granted
            FROM assignment_permission_overrides
            WHERE assignment_id = $1
            ORDER BY permission
            "#,
        )
        .bind(assignment_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list permission overrides: {error}"))
        })?;

        rows.into_iter().map(override_from_row).collect()
    }
}
