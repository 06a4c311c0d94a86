//! Orgrole composition root: prepares the database for the access-control engine.

#![forbid(unsafe_code)]

mod bootstrap_config;

use orgrole_application::RoleAdminRepository;
use orgrole_core::{AppError, AppResult};
use orgrole_infrastructure::{PostgresRoleAdminRepository, sync_permission_catalog};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::bootstrap_config::{BootstrapConfig, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = BootstrapConfig::load()?;
    let pool = connect_and_migrate(&config).await?;

    if config.skip_catalog_sync {
        warn!("permission catalog sync skipped by configuration");
    } else {
        sync_permission_catalog(&pool).await?;
    }

    let roles = PostgresRoleAdminRepository::new(pool).list_roles().await?;
    info!(
        roles = roles.len(),
        max_connections = config.database_max_connections,
        "orgrole database ready"
    );

    Ok(())
}

async fn connect_and_migrate(config: &BootstrapConfig) -> AppResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(config.database_url.as_str())
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    Ok(pool)
}
