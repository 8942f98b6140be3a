mod commands;
mod providers;
mod render;
mod webhook;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use notion_gcal_core::config::AppConfig;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "notion-gcal")]
#[command(about = "Mirror a Notion database into Google Calendar")]
struct Cli {
    /// Config file (default: <config dir>/notion-gcal/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync pass
    Run {
        /// Sync even if nothing changed, and allow deleting every event
        #[arg(long)]
        force: bool,

        /// Show what would change without touching the calendar
        #[arg(long)]
        dry_run: bool,
    },
    /// Listen for Notion webhooks and sync on each notification
    Serve,
    /// Show the mapping state and pending changes
    Status,
    /// Delete every synced event and forget the mapping
    Reset {
        /// Skip the confirmation
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> Result<ExitCode> {
    let config = AppConfig::load(cli.config.as_deref())?;
    config.validate()?;

    match cli.command {
        Commands::Run { force, dry_run } => commands::run::run(&config, force, dry_run).await,
        Commands::Serve => commands::serve::run(&config).await,
        Commands::Status => commands::status::run(&config).await,
        Commands::Reset { yes } => commands::reset::run(&config, yes).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run_flags() {
        let cli = Cli::try_parse_from(["notion-gcal", "run", "--force", "--dry-run"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Run {
                force: true,
                dry_run: true
            }
        ));
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_config_flag_is_global() {
        let cli = Cli::try_parse_from(["notion-gcal", "status", "--config", "/tmp/c.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }

    #[test]
    fn test_reset_needs_no_flag_to_parse() {
        let cli = Cli::try_parse_from(["notion-gcal", "reset"]).unwrap();
        assert!(matches!(cli.command, Commands::Reset { yes: false }));
    }
}
