use super::*;

impl PostgresRoleAdminRepository {
    pub(super) async fn insert_assignment_impl(&self, assignment: RoleAssignment) -> AppResult<()> {
        let mut transaction = self.begin().await?;
        insert_assignment(&mut transaction, &assignment).await?;
        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })
    }

    pub(super) async fn find_assignment_impl(
        &self,
        assignment_id: AssignmentId,
    ) -> AppResult<Option<RoleAssignment>> {
        sqlx::query_as::<_, RoleAssignmentRow>(
            r#"
            SELECT
                id AS assignment_id,
                user_id,
                role_id,
                academic_year_id,
                starts_at,
                ends_at
            FROM role_assignments
            WHERE id = $1
            "#,
        )
        .bind(assignment_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find role assignment: {error}")))?
        .map(assignment_from_row)
        .transpose()
    }

    pub(super) async fn close_assignment_impl(
        &self,
        assignment_id: AssignmentId,
        ends_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut transaction = self.begin().await?;
        close_assignment(&mut transaction, assignment_id, ends_at).await?;
        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })
    }

    pub(super) async fn transfer_assignment_impl(
        &self,
        source: AssignmentId,
        ends_at: DateTime<Utc>,
        replacement: RoleAssignment,
    ) -> AppResult<()> {
        let mut transaction = self.begin().await?;
        close_assignment(&mut transaction, source, ends_at).await?;
        insert_assignment(&mut transaction, &replacement).await?;
        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })
    }

    pub(super) async fn delete_assignment_impl(&self, assignment_id: AssignmentId) -> AppResult<()> {
        let deleted = sqlx::query(
            r#"
            DELETE FROM role_assignments
            WHERE id = $1
            "#,
        )
        .bind(assignment_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to delete role assignment: {error}"))
        })?;

        if deleted.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "role assignment '{assignment_id}' was not found"
            )));
        }

        Ok(())
    }

    pub(super) async fn list_assignments_for_user_impl(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<RoleAssignment>> {
        let rows = sqlx::query_as::<_, RoleAssignmentRow>(
            r#"
            SELECT
                id AS assignment_id,
                user_id,
                role_id,
                academic_year_id,
                starts_at,
                ends_at
            FROM role_assignments
            WHERE user_id = $1
            ORDER BY starts_at DESC, id
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list role assignments: {error}"))
        })?;

        rows.into_iter().map(assignment_from_row).collect()
    }
}

async fn insert_assignment(
    transaction: &mut Transaction<'_, Postgres>,
    assignment: &RoleAssignment,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO role_assignments (
            id,
            user_id,
            role_id,
            academic_year_id,
            starts_at,
            ends_at
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(assignment.assignment_id().as_uuid())
    .bind(assignment.user_id().as_uuid())
    .bind(assignment.role_id().as_uuid())
    .bind(assignment.academic_year_id().as_uuid())
    .bind(assignment.starts_at())
    .bind(assignment.ends_at())
    .execute(&mut **transaction)
    .await
    .map_err(|error| match database_error_code(&error).as_deref() {
        Some("23505") => AppError::Conflict(format!(
            "user '{}' already holds role '{}' in academic year '{}'",
            assignment.user_id(),
            assignment.role_id(),
            assignment.academic_year_id()
        )),
        Some("23503") => {
            AppError::NotFound(format!("role '{}' was not found", assignment.role_id()))
        }
        _ => AppError::Internal(format!("failed to insert role assignment: {error}")),
    })?;

    Ok(())
}

async fn close_assignment(
    transaction: &mut Transaction<'_, Postgres>,
    assignment_id: AssignmentId,
    ends_at: DateTime<Utc>,
) -> AppResult<()> {
    let closed = sqlx::query(
        r#"
        UPDATE role_assignments
        SET ends_at = $2
        WHERE id = $1
            AND ends_at IS NULL
            AND starts_at <= $2
        "#,
    )
    .bind(assignment_id.as_uuid())
    .bind(ends_at)
    .execute(&mut **transaction)
    .await
    .map_err(|error| AppError::Internal(format!("failed to close role assignment: {error}")))?;

    if closed.rows_affected() > 0 {
        return Ok(());
    }

    let current = sqlx::query_as::<_, RoleAssignmentRow>(
        r#"
        SELECT
            id AS assignment_id,
            user_id,
            role_id,
            academic_year_id,
            starts_at,
            ends_at
        FROM role_assignments
        WHERE id = $1
        "#,
    )
    .bind(assignment_id.as_uuid())
    .fetch_optional(&mut **transaction)
    .await
    .map_err(|error| AppError::Internal(format!("failed to find role assignment: {error}")))?
    .map(assignment_from_row)
    .transpose()?;

    match current {
        None => Err(AppError::NotFound(format!(
            "role assignment '{assignment_id}' was not found"
        ))),
        Some(mut assignment) => {
            assignment.close(ends_at)?;
            Err(AppError::Conflict(format!(
                "role assignment '{assignment_id}' changed concurrently"
            )))
        }
    }
}
