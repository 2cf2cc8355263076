use anyhow::{Context, Result};
use clap::Parser;
use jsproc_config::{ConfigLoader, JsprocConfig, LogLevel};
use jsproc_logging::init_logging_from_config;
use std::path::PathBuf;
use tracing::{debug, info, warn};

mod cli;
mod commands;

use cli::{Cli, Commands, ConfigCommands};

/// Load configuration from file or use defaults
fn load_config(config_path: Option<&PathBuf>) -> Result<JsprocConfig> {
    let loader = ConfigLoader::new();

    match config_path {
        Some(path) => {
            if path.exists() {
                loader
                    .from_file(path)
                    .with_context(|| format!("Failed to load configuration from {:?}", path))
            } else {
                warn!("Configuration file not found: {:?}. Using defaults.", path);
                loader
                    .from_env()
                    .context("Failed to load configuration from environment")
            }
        }
        None => loader
            .from_env()
            .context("Failed to load configuration from environment"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_ref())?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level
            .parse::<LogLevel>()
            .map_err(|e| anyhow::anyhow!("Invalid --log-level: {}", e))?;
    }
    init_logging_from_config(&config.logging)?;

    debug!("jsproc starting");

    match cli.command {
        Commands::Run {
            script,
            workspace,
            read_only,
        } => {
            let code = commands::run::run_script(&script, &workspace, read_only, config.process).await?;
            info!(exit_code = code, "jsproc finished");
            std::process::exit(code);
        }
        Commands::Config { config_cmd } => match config_cmd {
            ConfigCommands::Sample => commands::config::sample(),
            ConfigCommands::Validate { config_file } => commands::config::validate(&config_file),
        },
    }
}
