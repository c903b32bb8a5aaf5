//! Storage and notification target command handlers

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use drill_client::OrchestratorClient;
use drill_core::dto::target::{CreateNotificationTarget, CreateStorageTarget};

use super::read_json_file;
use crate::id_resolver::{resolve_notification_id, resolve_storage_id};

/// Storage target subcommands
#[derive(Subcommand)]
pub enum StorageCommands {
    /// Register a storage target from a JSON file
    Create {
        /// Path to the JSON target (`name`, `kind`, `config`)
        #[arg(short, long)]
        file: String,
    },
    /// List storage targets
    List,
    /// Replace a storage target with the contents of a JSON file
    Update {
        /// Target ID or unambiguous prefix
        id: String,
        /// Path to the JSON target (`name`, `kind`, `config`)
        #[arg(short, long)]
        file: String,
    },
    /// Test a storage target through the backup directory
    Test {
        /// Target ID or unambiguous prefix
        id: String,
    },
    /// Delete a storage target
    Delete {
        /// Target ID or unambiguous prefix
        id: String,
    },
}

/// Notification target subcommands
#[derive(Subcommand)]
pub enum NotificationCommands {
    /// Register a notification target from a JSON file
    Create {
        /// Path to the JSON target (`name`, `kind`, `config`)
        #[arg(short, long)]
        file: String,
    },
    /// List notification targets
    List,
    /// Replace a notification target with the contents of a JSON file
    Update {
        /// Target ID or unambiguous prefix
        id: String,
        /// Path to the JSON target (`name`, `kind`, `config`)
        #[arg(short, long)]
        file: String,
    },
    /// Send a test message through a notification target
    Test {
        /// Target ID or unambiguous prefix
        id: String,
    },
    /// Delete a notification target
    Delete {
        /// Target ID or unambiguous prefix
        id: String,
    },
}

pub async fn handle_storage_command(
    command: StorageCommands,
    client: &OrchestratorClient,
) -> Result<()> {
    match command {
        StorageCommands::Create { file } => {
            let req: CreateStorageTarget = read_json_file(&file)?;
            let target = client.create_storage(&req).await?;
            println!("{}", "✓ Storage target created".green().bold());
            println!("  ID:   {}", target.id.to_string().cyan());
            println!("  Name: {} ({})", target.name, target.kind);
            Ok(())
        }
        StorageCommands::List => {
            let targets = client.list_storage().await?;
            if targets.is_empty() {
                println!("{}", "No storage targets found.".yellow());
            }
            for target in &targets {
                print_target(&target.id.to_string(), &target.name, target.kind.as_str());
            }
            Ok(())
        }
        StorageCommands::Update { id, file } => {
            let req: CreateStorageTarget = read_json_file(&file)?;
            let uuid = resolve_storage_id(client, &id).await?;
            let target = client.update_storage(uuid, &req).await?;
            println!("{}", "✓ Storage target updated".green().bold());
            println!("  ID:   {}", target.id.to_string().cyan());
            println!("  Name: {} ({})", target.name, target.kind);
            Ok(())
        }
        StorageCommands::Test { id } => {
            let uuid = resolve_storage_id(client, &id).await?;
            println!("Testing storage target {}...", uuid.to_string().dimmed());
            let result = client.test_storage(uuid).await?;
            if result.success {
                println!("{}", format!("✓ {}", result.message).green());
            } else {
                println!("{}", format!("✗ {}", result.message).red());
            }
            Ok(())
        }
        StorageCommands::Delete { id } => {
            let uuid = resolve_storage_id(client, &id).await?;
            client.delete_storage(uuid).await?;
            println!("{}", format!("✓ Storage target {} deleted", uuid).green());
            Ok(())
        }
    }
}

pub async fn handle_notification_command(
    command: NotificationCommands,
    client: &OrchestratorClient,
) -> Result<()> {
    match command {
        NotificationCommands::Create { file } => {
            let req: CreateNotificationTarget = read_json_file(&file)?;
            let target = client.create_notification(&req).await?;
            println!("{}", "✓ Notification target created".green().bold());
            println!("  ID:   {}", target.id.to_string().cyan());
            println!("  Name: {} ({})", target.name, target.kind);
            Ok(())
        }
        NotificationCommands::List => {
            let targets = client.list_notifications().await?;
            if targets.is_empty() {
                println!("{}", "No notification targets found.".yellow());
            }
            for target in &targets {
                print_target(&target.id.to_string(), &target.name, target.kind.as_str());
            }
            Ok(())
        }
        NotificationCommands::Update { id, file } => {
            let req: CreateNotificationTarget = read_json_file(&file)?;
            let uuid = resolve_notification_id(client, &id).await?;
            let target = client.update_notification(uuid, &req).await?;
            println!("{}", "✓ Notification target updated".green().bold());
            println!("  ID:   {}", target.id.to_string().cyan());
            println!("  Name: {} ({})", target.name, target.kind);
            Ok(())
        }
        NotificationCommands::Test { id } => {
            let uuid = resolve_notification_id(client, &id).await?;
            println!("Sending test notification via {}...", uuid.to_string().dimmed());
            let result = client.test_notification(uuid).await?;
            if result.success {
                println!("{}", format!("✓ {}", result.message).green());
            } else {
                println!("{}", format!("✗ {}", result.message).red());
            }
            Ok(())
        }
        NotificationCommands::Delete { id } => {
            let uuid = resolve_notification_id(client, &id).await?;
            client.delete_notification(uuid).await?;
            println!(
                "{}",
                format!("✓ Notification target {} deleted", uuid).green()
            );
            Ok(())
        }
    }
}

fn print_target(id: &str, name: &str, kind: &str) {
    println!("  {} {} {}", "▸".cyan(), name.bold(), id.dimmed());
    println!("    Kind: {}", kind);
}
