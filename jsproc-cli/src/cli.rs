//! CLI argument parsing definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a script file as a process and exit with its exit code
    Run {
        /// Path to the script
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        /// Workspace identity exposed as `process.workspace`
        #[arg(long, value_name = "ID", default_value = "default")]
        workspace: String,

        /// Grant read access only
        #[arg(long)]
        read_only: bool,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print a sample configuration file
    Sample,

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        #[arg(value_name = "PATH")]
        config_file: PathBuf,
    },
}
