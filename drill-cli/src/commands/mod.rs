//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod definition;
mod job;
mod target;

pub use definition::DefinitionCommands;
pub use job::JobCommands;
pub use target::{NotificationCommands, StorageCommands};

use anyhow::{Context, Result};
use clap::Subcommand;
use drill_client::OrchestratorClient;
use serde::de::DeserializeOwned;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Restore test runs
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// Test definitions
    Definition {
        #[command(subcommand)]
        command: DefinitionCommands,
    },
    /// Storage targets for archived artifacts
    Storage {
        #[command(subcommand)]
        command: StorageCommands,
    },
    /// Notification targets
    Notification {
        #[command(subcommand)]
        command: NotificationCommands,
    },
}

/// Routes the command to the appropriate handler module
pub async fn handle_command(command: Commands, client: &OrchestratorClient) -> Result<()> {
    match command {
        Commands::Job { command } => job::handle_job_command(command, client).await,
        Commands::Definition { command } => {
            definition::handle_definition_command(command, client).await
        }
        Commands::Storage { command } => target::handle_storage_command(command, client).await,
        Commands::Notification { command } => {
            target::handle_notification_command(command, client).await
        }
    }
}

/// Reads a JSON request body from a file
fn read_json_file<T: DeserializeOwned>(path: &str) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path))
}
