//! Test definition command handlers

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use drill_client::OrchestratorClient;
use drill_core::domain::definition::TestDefinition;
use drill_core::dto::definition::CreateDefinition;

use super::read_json_file;
use crate::id_resolver::resolve_definition_id;

/// Definition subcommands
#[derive(Subcommand)]
pub enum DefinitionCommands {
    /// Register a test definition from a JSON file
    Create {
        /// Path to the JSON definition
        #[arg(short, long)]
        file: String,
    },
    /// List all test definitions
    List,
    /// Show a test definition
    Show {
        /// Definition ID or unambiguous prefix
        id: String,
    },
    /// Replace a test definition with the contents of a JSON file
    Update {
        /// Definition ID or unambiguous prefix
        id: String,
        /// Path to the JSON definition
        #[arg(short, long)]
        file: String,
    },
    /// Delete a test definition; its jobs keep their history
    Delete {
        /// Definition ID or unambiguous prefix
        id: String,
    },
}

pub async fn handle_definition_command(
    command: DefinitionCommands,
    client: &OrchestratorClient,
) -> Result<()> {
    match command {
        DefinitionCommands::Create { file } => create_definition(client, &file).await,
        DefinitionCommands::List => list_definitions(client).await,
        DefinitionCommands::Show { id } => show_definition(client, &id).await,
        DefinitionCommands::Update { id, file } => update_definition(client, &id, &file).await,
        DefinitionCommands::Delete { id } => delete_definition(client, &id).await,
    }
}

async fn create_definition(client: &OrchestratorClient, file: &str) -> Result<()> {
    let req: CreateDefinition = read_json_file(file)?;
    let definition = client.create_definition(&req).await?;

    println!("{}", "✓ Test definition created".green().bold());
    println!("  ID:   {}", definition.id.to_string().cyan());
    println!("  Name: {}", definition.name);

    Ok(())
}

async fn update_definition(client: &OrchestratorClient, id: &str, file: &str) -> Result<()> {
    let req: CreateDefinition = read_json_file(file)?;
    let uuid = resolve_definition_id(client, id).await?;
    let definition = client.update_definition(uuid, &req).await?;

    println!("{}", "✓ Test definition updated".green().bold());
    println!("  ID:   {}", definition.id.to_string().cyan());
    println!("  Name: {}", definition.name);

    Ok(())
}

async fn list_definitions(client: &OrchestratorClient) -> Result<()> {
    let definitions = client.list_definitions().await?;

    if definitions.is_empty() {
        println!("{}", "No test definitions found.".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("Found {} test definition(s):", definitions.len()).bold()
    );
    println!();
    for definition in &definitions {
        println!(
            "  {} {} {}",
            "▸".cyan(),
            definition.name.bold(),
            definition.id.to_string().dimmed()
        );
        println!("    Database: {}", definition.source_database_name);
        println!(
            "    Last backup: {}",
            definition
                .last_processed_backup_id
                .as_deref()
                .unwrap_or("never")
                .dimmed()
        );
        println!();
    }

    Ok(())
}

async fn show_definition(client: &OrchestratorClient, id: &str) -> Result<()> {
    let uuid = resolve_definition_id(client, id).await?;
    let definition = client.get_definition(uuid).await?;
    print_definition(&definition);
    Ok(())
}

async fn delete_definition(client: &OrchestratorClient, id: &str) -> Result<()> {
    let uuid = resolve_definition_id(client, id).await?;
    client.delete_definition(uuid).await?;
    println!("{}", format!("✓ Test definition {} deleted", uuid).green());
    Ok(())
}

fn print_definition(definition: &TestDefinition) {
    println!("{}", "Test Definition:".bold());
    println!("  ID:         {}", definition.id.to_string().cyan());
    println!("  Name:       {}", definition.name);
    println!("  Workspace:  {}", definition.workspace_id);
    println!(
        "  Database:   {} ({})",
        definition.source_database_name, definition.source_database_id
    );
    println!(
        "  Storage:    {} target(s)",
        definition.storage_ids.len()
    );
    println!(
        "  Notify:     {} target(s)",
        definition.notification_ids.len()
    );
    if let Some(backup) = &definition.last_processed_backup_id {
        println!("  Last backup: {}", backup);
    }

    for (title, script) in [
        ("Pre-restore script:", &definition.pre_restore_script),
        ("Validation script:", &definition.post_restore_script),
    ] {
        if let Some(script) = script {
            println!("\n{}", title.bold());
            println!("{}", script.dimmed());
        }
    }
}
