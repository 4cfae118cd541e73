//! Marquee CLI entry point.

use anyhow::Result;
use clap::Parser;
use marquee::cli::{commands, Cli, Commands};
use marquee::config::Settings;
use marquee::logging;
use std::path::PathBuf;
use tracing::{info_span, Instrument};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli
        .config
        .as_deref()
        .map(Settings::expand_path)
        .unwrap_or_else(Settings::default_config_path);
    let settings = Settings::load_from(Some(&config_path))?;

    logging::init(&settings.logger, cli.verbose);

    let span = info_span!("host", logger = %settings.logger.name);
    run(cli.command, settings, config_path).instrument(span).await
}

async fn run(command: Commands, settings: Settings, config_path: PathBuf) -> Result<()> {
    match command {
        Commands::Tools => {
            commands::run_tools(settings).await?;
        }

        Commands::Ask { question, model } => {
            commands::run_ask(&question, model, settings).await?;
        }

        Commands::Chat { model } => {
            commands::run_chat(model, settings).await?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings, &config_path)?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, settings, config_path)?;
        }
    }

    Ok(())
}
