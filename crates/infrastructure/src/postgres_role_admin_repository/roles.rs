use super::*;

impl PostgresRoleAdminRepository {
    pub(super) async fn list_roles_impl(&self) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT
                roles.id AS role_id,
                roles.name AS role_name,
                roles.description AS role_description,
                roles.priority AS role_priority,
                grants.permission
            FROM roles
            LEFT JOIN role_permissions AS grants
                ON grants.role_id = roles.id
            ORDER BY roles.priority, roles.name, grants.permission
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        aggregate_roles(rows)
    }

    pub(super) async fn find_role_impl(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT
                roles.id AS role_id,
                roles.name AS role_name,
                roles.description AS role_description,
                roles.priority AS role_priority,
                grants.permission
            FROM roles
            LEFT JOIN role_permissions AS grants
                ON grants.role_id = roles.id
            WHERE roles.id = $1
            ORDER BY grants.permission
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find role: {error}")))?;

        Ok(aggregate_roles(rows)?.into_iter().next())
    }

    pub(super) async fn insert_role_impl(&self, role: Role) -> AppResult<()> {
        let mut transaction = self.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO roles (id, name, description, priority)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(role.role_id().as_uuid())
        .bind(role.name().as_str())
        .bind(role.description())
        .bind(role.priority())
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_role_conflict(error, role.name().as_str()))?;

        insert_role_permissions(&mut transaction, &role).await?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })
    }

    pub(super) async fn update_role_impl(&self, role: Role) -> AppResult<()> {
        let updated = sqlx::query(
            r#"
            UPDATE roles
            SET name = $2,
                description = $3,
                priority = $4,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(role.role_id().as_uuid())
        .bind(role.name().as_str())
        .bind(role.description())
        .bind(role.priority())
        .execute(&self.pool)
        .await
        .map_err(|error| map_role_conflict(error, role.name().as_str()))?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "role '{}' was not found",
                role.role_id()
            )));
        }

        Ok(())
    }

    pub(super) async fn attach_role_permission_impl(
        &self,
        role_id: RoleId,
        permission: Permission,
    ) -> AppResult<bool> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission)
            VALUES ($1, $2)
            ON CONFLICT (role_id, permission) DO NOTHING
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(permission.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| map_missing_reference(error, "attach role permission"))?;

        Ok(inserted.rows_affected() > 0)
    }

    pub(super) async fn detach_role_permission_impl(
        &self,
        role_id: RoleId,
        permission: Permission,
    ) -> AppResult<bool> {
        let deleted = sqlx::query(
            r#"
            DELETE FROM role_permissions
            WHERE role_id = $1
              AND permission = $2
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(permission.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to detach role permission: {error}"))
        })?;

        if deleted.rows_affected() > 0 {
            return Ok(true);
        }

        if self.find_role_impl(role_id).await?.is_none() {
            return Err(AppError::NotFound(format!("role '{role_id}' was not found")));
        }

        Ok(false)
    }

    pub(super) async fn delete_role_impl(&self, role_id: RoleId) -> AppResult<()> {
        let deleted = sqlx::query(
            r#"
            DELETE FROM roles
            WHERE id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if database_error_code(&error).as_deref() == Some("23503") {
                return AppError::Conflict(format!(
                    "role '{role_id}' is referenced by role assignments"
                ));
            }
            AppError::Internal(format!("failed to delete role: {error}"))
        })?;

        if deleted.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("role '{role_id}' was not found")));
        }

        Ok(())
    }

    pub(super) async fn count_role_assignments_impl(&self, role_id: RoleId) -> AppResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM role_assignments
            WHERE role_id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to count role assignments: {error}"))
        })?;

        Ok(u64::try_from(count).unwrap_or_default())
    }
}

async fn insert_role_permissions(
    transaction: &mut Transaction<'_, Postgres>,
    role: &Role,
) -> AppResult<()> {
    for permission in role.permissions() {
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission)
            VALUES ($1, $2)
            ON CONFLICT (role_id, permission) DO NOTHING
            "#,
        )
        .bind(role.role_id().as_uuid())
        .bind(permission.as_str())
        .execute(&mut **transaction)
        .await
        .map_err(|error| map_missing_reference(error, "persist role grants"))?;
    }

    Ok(())
}
