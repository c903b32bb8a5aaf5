//! Drill CLI
//!
//! Command-line interface for the restore drill orchestrator.

mod commands;
mod id_resolver;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use drill_client::OrchestratorClient;

#[derive(Parser)]
#[command(name = "drill")]
#[command(about = "Restore drill CLI", long_about = None)]
struct Cli {
    /// Orchestrator URL
    #[arg(
        long,
        env = "DRILL_ORCHESTRATOR_URL",
        default_value = "http://localhost:8080"
    )]
    orchestrator_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = OrchestratorClient::new(cli.orchestrator_url);

    handle_command(cli.command, &client).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use commands::{DefinitionCommands, NotificationCommands, StorageCommands};

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(std::iter::once("drill").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn test_update_commands_take_id_and_file() {
        match parse(&["definition", "update", "3f2a", "--file", "def.json"]) {
            Commands::Definition {
                command: DefinitionCommands::Update { id, file },
            } => {
                assert_eq!(id, "3f2a");
                assert_eq!(file, "def.json");
            }
            _ => panic!("expected definition update"),
        }

        assert!(matches!(
            parse(&["storage", "update", "ab", "-f", "s3.json"]),
            Commands::Storage {
                command: StorageCommands::Update { .. }
            }
        ));
        assert!(matches!(
            parse(&["notification", "update", "cd", "-f", "tg.json"]),
            Commands::Notification {
                command: NotificationCommands::Update { .. }
            }
        ));
    }

    #[test]
    fn test_notification_test_command() {
        match parse(&["notification", "test", "cd12"]) {
            Commands::Notification {
                command: NotificationCommands::Test { id },
            } => assert_eq!(id, "cd12"),
            _ => panic!("expected notification test"),
        }
    }

    #[test]
    fn test_update_requires_file() {
        let result = Cli::try_parse_from(["drill", "storage", "update", "ab"]);
        assert!(result.is_err());
    }
}
