//! Job management CLI commands.
//!
//! These commands drive the scheduler directly against the configured
//! backends, so they are only meaningful with a shared (postgres) job store.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use broker_core::error::AppError;
use broker_core::types::JobId;
use broker_entity::job::{Job, JobEvent, NewJob};

/// Arguments for job commands
#[derive(Debug, Args)]
pub struct JobArgs {
    /// Job subcommand
    #[command(subcommand)]
    pub command: JobCommand,
}

/// Job subcommands
#[derive(Debug, Subcommand)]
pub enum JobCommand {
    /// List jobs
    List {
        /// Only WAITING and RUNNING jobs
        #[arg(long)]
        active: bool,
        /// Filter by submitter
        #[arg(short, long)]
        submitter: Option<String>,
    },
    /// Show a job with its status history
    Show {
        /// Job identifier
        id: JobId,
    },
    /// Submit a new job
    Submit {
        /// Who submits the job
        #[arg(long)]
        submitter: String,
        /// Human-readable description
        #[arg(long)]
        description: String,
        /// Command the runner executes
        #[arg(long)]
        command: String,
    },
    /// Remove a job and its logfile
    Remove {
        /// Job identifier
        id: JobId,
    },
    /// Claim the oldest waiting job
    Claim,
    /// Record a status update for a job
    Status {
        /// Job identifier
        id: JobId,
        /// Status name (e.g. DONE) or ordinal (0-5)
        status: String,
    },
}

/// Job display row for table output
#[derive(Debug, Serialize, Tabled)]
struct JobRow {
    /// Job identifier
    id: i64,
    /// Current status
    status: String,
    /// Submitter
    submitter: String,
    /// Description
    description: String,
    /// Command
    command: String,
    /// Logfile attached
    logfile: String,
}

impl From<&Job> for JobRow {
    fn from(job: &Job) -> Self {
        Self {
            id: job.identifier.get(),
            status: job.current_status().to_string(),
            submitter: job.submitter.clone(),
            description: job.description.clone(),
            command: job.command.clone(),
            logfile: job
                .logfile_handle
                .as_ref()
                .map(|h| h.to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Event display row for table output
#[derive(Debug, Serialize, Tabled)]
struct EventRow {
    /// Sequence number
    sequence: i64,
    /// Status
    status: String,
    /// Recorded at
    recorded_at: String,
}

impl From<&JobEvent> for EventRow {
    fn from(event: &JobEvent) -> Self {
        Self {
            sequence: event.sequence,
            status: event.status.to_string(),
            recorded_at: event.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Interpret a status argument the way runners send it: digits are an
/// ordinal, anything else a status name.
fn status_token(raw: &str) -> serde_json::Value {
    match raw.parse::<i64>() {
        Ok(ordinal) => serde_json::Value::from(ordinal),
        Err(_) => serde_json::Value::from(raw),
    }
}

fn print_job(job: &Job, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_item(job, format),
        OutputFormat::Table => {
            output::print_kv("Identifier", &job.identifier.to_string());
            output::print_kv("Status", job.current_status().as_str());
            output::print_kv("Submitter", &job.submitter);
            output::print_kv("Description", &job.description);
            output::print_kv("Command", &job.command);
            output::print_kv(
                "Logfile",
                job.logfile_handle.as_ref().map_or("-", |h| h.as_str()),
            );
            let events: Vec<EventRow> = job.events.iter().map(EventRow::from).collect();
            output::print_list(&events, format);
        }
    }
}

/// Execute job commands
pub async fn execute(
    args: &JobArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let (scheduler, stores) = super::create_scheduler(&config).await?;

    let result = async {
        match &args.command {
            JobCommand::List { active, submitter } => {
                let jobs = scheduler.list_jobs(*active, submitter.as_deref()).await?;
                let rows: Vec<JobRow> = jobs.iter().map(JobRow::from).collect();
                output::print_list(&rows, format);
            }
            JobCommand::Show { id } => {
                let job = scheduler.get_job(*id).await?;
                print_job(&job, format);
            }
            JobCommand::Submit {
                submitter,
                description,
                command,
            } => {
                let job = scheduler
                    .submit(NewJob::new(submitter, description, command))
                    .await?;
                match format {
                    OutputFormat::Json => output::print_item(&job, format),
                    OutputFormat::Table => {
                        output::print_success(&format!("Job #{} submitted", job.identifier))
                    }
                }
            }
            JobCommand::Remove { id } => {
                scheduler.remove(*id).await?;
                output::print_success(&format!("Job #{id} removed"));
            }
            JobCommand::Claim => match scheduler.claim_next().await? {
                Some(job) => print_job(&job, format),
                None => output::print_warning("No job is waiting"),
            },
            JobCommand::Status { id, status } => {
                let event = scheduler.update_status(*id, &status_token(status)).await?;
                match format {
                    OutputFormat::Json => output::print_item(&event, format),
                    OutputFormat::Table => output::print_success(&format!(
                        "Job #{id} is now {} (event {})",
                        event.status, event.sequence
                    )),
                }
            }
        }
        Ok::<(), AppError>(())
    }
    .await;

    stores.close().await;
    result
}
