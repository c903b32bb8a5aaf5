//! Job command handlers
//!
//! Queue a restore test, watch the queue and inspect finished runs.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use drill_client::OrchestratorClient;
use drill_core::domain::job::{Job, JobStatus};

use crate::id_resolver::{resolve_definition_id, resolve_job_id};

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// Queue a run of a test definition
    Run {
        /// Definition ID or unambiguous prefix
        definition: String,
    },
    /// List pending and running jobs
    Active,
    /// List finished jobs, most recent first
    History {
        /// Number of jobs to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },
    /// Show job details and its log
    Show {
        /// Job ID or unambiguous prefix
        id: String,

        /// Omit the job log
        #[arg(long)]
        no_log: bool,
    },
}

pub async fn handle_job_command(command: JobCommands, client: &OrchestratorClient) -> Result<()> {
    match command {
        JobCommands::Run { definition } => run_definition(client, &definition).await,
        JobCommands::Active => list_active(client).await,
        JobCommands::History { limit } => list_history(client, limit).await,
        JobCommands::Show { id, no_log } => show_job(client, &id, !no_log).await,
    }
}

async fn run_definition(client: &OrchestratorClient, definition: &str) -> Result<()> {
    let definition_id = resolve_definition_id(client, definition).await?;

    match client.enqueue(definition_id).await {
        Ok(job) => {
            println!("{}", "✓ Restore test queued".green().bold());
            println!("  Job ID:     {}", job.id.to_string().cyan());
            println!("  Definition: {}", job.definition_name);
            println!("  Status:     {}", colorize_status(job.status));
            Ok(())
        }
        Err(e) if e.is_conflict() => {
            println!(
                "{}",
                "⚠ This test is already queued or running".yellow()
            );
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn list_active(client: &OrchestratorClient) -> Result<()> {
    let jobs = client.active_jobs().await?;

    if jobs.is_empty() {
        println!("{}", "No active jobs.".yellow());
    } else {
        println!("{}", format!("Found {} active job(s):", jobs.len()).bold());
        println!();
        for job in &jobs {
            print_job_summary(job);
        }
    }

    Ok(())
}

async fn list_history(client: &OrchestratorClient, limit: i64) -> Result<()> {
    let jobs = client.job_history(Some(limit)).await?;

    if jobs.is_empty() {
        println!("{}", "No finished jobs yet.".yellow());
    } else {
        println!("{}", format!("Last {} job(s):", jobs.len()).bold());
        println!();
        for job in &jobs {
            print_job_summary(job);
        }
    }

    Ok(())
}

async fn show_job(client: &OrchestratorClient, id: &str, with_log: bool) -> Result<()> {
    let uuid = resolve_job_id(client, id).await?;
    let job = client.get_job(uuid).await?;

    print_job_details(&job);

    if with_log {
        println!();
        if job.log_output.trim().is_empty() {
            println!("{}", "No log recorded for this job.".dimmed());
        } else {
            println!("{}", "Log:".bold());
            println!("{}", "─".repeat(80).dimmed());
            for line in job.log_output.lines() {
                print_log_line(line);
            }
            println!("{}", "─".repeat(80).dimmed());
        }
    }

    Ok(())
}

fn print_job_summary(job: &Job) {
    println!("  {} Job {}", "▸".cyan(), job.id.to_string().dimmed());
    println!("    Definition: {}", job.definition_name);
    println!("    Status:     {}", colorize_status(job.status));
    println!(
        "    Created:    {}",
        job.created_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    if job.status.is_terminal() {
        println!("    Duration:   {}s", job.duration_seconds);
    }
    println!();
}

fn print_job_details(job: &Job) {
    println!("{}", "Job Details:".bold());
    println!("  ID:          {}", job.id.to_string().cyan());
    println!("  Definition:  {}", job.definition_name);
    match job.definition_id {
        Some(id) => println!("  Def. ID:     {}", id.to_string().dimmed()),
        None => println!("  Def. ID:     {}", "(deleted)".dimmed()),
    }
    println!("  Status:      {}", colorize_status(job.status));
    println!("  Created:     {}", job.created_at.format("%Y-%m-%d %H:%M:%S"));

    if let Some(started) = job.started_at {
        println!("  Started:     {}", started.format("%Y-%m-%d %H:%M:%S"));
    }

    if let Some(finished) = job.finished_at {
        println!("  Finished:    {}", finished.format("%Y-%m-%d %H:%M:%S"));
        println!("  Duration:    {}s", job.duration_seconds);
    }

    if let Some(backup) = &job.last_processed_backup_id {
        println!("  Backup:      {}", backup);
    }
}

/// Colors a persisted `[HH:MM:SS] ...` log line by its level prefix
fn print_log_line(line: &str) {
    let (stamp, message) = match line.split_once("] ") {
        Some((stamp, message)) if stamp.starts_with('[') => (format!("{}]", stamp), message),
        _ => (String::new(), line),
    };

    let message = if message.starts_with("ERROR: ") || message.starts_with("VALIDATION FAILED") {
        message.red()
    } else if message.starts_with("WARN: ") {
        message.yellow()
    } else {
        message.normal()
    };

    println!("{} {}", stamp.dimmed(), message);
}

/// Colorize job status for display
fn colorize_status(status: JobStatus) -> ColoredString {
    let status_str = status.as_str();
    match status {
        JobStatus::Pending => status_str.yellow(),
        JobStatus::Running => status_str.cyan(),
        JobStatus::Success => status_str.green(),
        JobStatus::Failed => status_str.red(),
    }
}
