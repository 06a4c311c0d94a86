use sqlx::PgPool;
use tracing::info;

use orgrole_core::{AppError, AppResult};
use orgrole_domain::Permission;

/// Upserts the static permission catalog into the `permissions` table.
///
/// Rows for names that are no longer in the catalog are left untouched so that
/// historical role grants keep their foreign keys.
pub async fn sync_permission_catalog(pool: &PgPool) -> AppResult<usize> {
    let mut transaction = pool
        .begin()
        .await
        .map_err(|error| AppError::Internal(format!("failed to begin transaction: {error}")))?;

    for permission in Permission::all() {
        sqlx::query(
            r#"
            INSERT INTO permissions (name, domain, description)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE
            SET domain = EXCLUDED.domain,
                description = EXCLUDED.description
            "#,
        )
        .bind(permission.as_str())
        .bind(permission.domain().as_str())
        .bind(permission.description())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to sync permission '{}': {error}",
                permission.as_str()
            ))
        })?;
    }

    transaction
        .commit()
        .await
        .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))?;

    let synced = Permission::all().len();
    info!(permissions = synced, "permission catalog synced");
    Ok(synced)
}
