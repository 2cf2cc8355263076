//! `jsproc config` subcommands

use anyhow::{Context, Result};
use jsproc_config::{ConfigLoader, JsprocConfig};
use std::path::Path;
use tracing::info;

/// Print a sample configuration with every default spelled out
pub fn sample() -> Result<()> {
    print!("{}", JsprocConfig::generate_sample());
    Ok(())
}

/// Load and validate a configuration file
pub fn validate(path: &Path) -> Result<()> {
    ConfigLoader::new()
        .from_file(path)
        .with_context(|| format!("Invalid configuration file {:?}", path))?;

    info!("Configuration file {:?} is valid", path);
    println!("{}: ok", path.display());
    Ok(())
}
