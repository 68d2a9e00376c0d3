//! Database migration runner.

use sqlx::PgPool;
use tracing::info;

use broker_core::error::{AppError, ErrorKind};
use broker_core::result::AppResult;

/// Run all pending database migrations.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    info!("Applying job store migrations");

    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to run migrations: {e}"),
                e,
            )
        })?;

    info!("Job store schema is up to date");
    Ok(())
}
