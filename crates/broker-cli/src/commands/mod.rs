//! CLI command definitions and dispatch.

pub mod job;
pub mod migrate;
pub mod serve;

use clap::{Parser, Subcommand};
use tracing::{debug, info};

use crate::output::OutputFormat;
use broker_core::config::AppConfig;
use broker_core::error::AppError;
use broker_database::StoreManager;
use broker_service::Scheduler;
use broker_storage::LogStoreManager;

/// JobBroker: job queue and dispatch engine
#[derive(Debug, Parser)]
#[command(name = "jobbroker", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the JobBroker server
    Serve(serve::ServeArgs),
    /// Apply job store migrations
    Migrate,
    /// Job management
    Job(job::JobArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        debug!(config = %self.config, command = ?self.command, "Executing command");
        match &self.command {
            Commands::Serve(args) => serve::execute(args, &self.config).await,
            Commands::Migrate => migrate::execute(&self.config).await,
            Commands::Job(args) => job::execute(args, &self.config, self.format).await,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load_from(config_path.trim_end_matches(".toml"))
}

/// Helper: build a scheduler over the configured backends
pub async fn create_scheduler(config: &AppConfig) -> Result<(Scheduler, StoreManager), AppError> {
    let stores = StoreManager::new(&config.database).await?;
    let logs = LogStoreManager::new(&config.storage).await?;
    info!(
        backend = %stores.backend(),
        storage = %config.storage.provider,
        "Connected job store"
    );
    let scheduler = Scheduler::from_managers(&stores, std::sync::Arc::new(logs));
    Ok((scheduler, stores))
}
