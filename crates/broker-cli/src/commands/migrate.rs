//! Job store migration command.

use crate::output;
use broker_core::config::DatabaseBackend;
use broker_core::error::AppError;
use broker_database::connection::DatabasePool;
use broker_database::migration::run_migrations;

/// Apply all pending migrations to the configured PostgreSQL job store.
pub async fn execute(config_path: &str) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;

    if config.database.backend != DatabaseBackend::Postgres {
        return Err(AppError::configuration(format!(
            "Migrations require the postgres backend (configured: {})",
            config.database.backend
        )));
    }

    let pool = DatabasePool::connect(&config.database).await?;
    println!("Running job store migrations...");
    let result = run_migrations(pool.pool()).await;
    pool.close().await;
    result?;

    output::print_success("All migrations applied successfully.");
    Ok(())
}
