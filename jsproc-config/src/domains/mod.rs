//! One module per configuration domain

pub mod logging;
pub mod process;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Top-level `jsproc.yaml` document; every section is optional
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct JsprocConfig {
    pub process: process::ProcessConfig,
    pub logging: logging::LoggingConfig,
}

impl JsprocConfig {
    pub fn validate_all(&self) -> ConfigResult<()> {
        let domains: [&dyn Validatable; 2] = [&self.process, &self.logging];
        domains.iter().try_for_each(|domain| domain.validate())
    }

    /// The defaults rendered as YAML, as printed by `jsproc config sample`
    pub fn generate_sample() -> String {
        serde_yaml::to_string(&JsprocConfig::default())
            .unwrap_or_else(|e| format!("# could not render sample configuration: {}\n", e))
    }
}
