//! Storekeep CLI - Database migrations and maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! sk-cli migrate
//!
//! # Remove expired entries from the token blocklist
//! sk-cli blocklist purge
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `blocklist purge` - Purge revocations of already-expired tokens

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sk-cli")]
#[command(author, version, about = "Storekeep CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Maintain the token blocklist
    Blocklist {
        #[command(subcommand)]
        action: BlocklistAction,
    },
}

#[derive(Subcommand)]
enum BlocklistAction {
    /// Delete revocations of tokens that are past their expiry
    Purge,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Blocklist { action } => match action {
            BlocklistAction::Purge => {
                commands::blocklist::purge().await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_blocklist_purge() {
        let cli = Cli::try_parse_from(["sk-cli", "blocklist", "purge"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Blocklist {
                action: BlocklistAction::Purge
            })
        ));
    }
}
