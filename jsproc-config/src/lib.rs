//! Configuration for jsproc processes and the `jsproc` binary
//!
//! A YAML file is split into domains (`process`, `logging`). Each domain
//! validates itself, and `JSPROC_*` environment variables override file values.

pub mod domains;
pub mod error;
pub mod loader;
pub mod validation;

pub use domains::logging::{LogFormat, LogLevel, LoggingConfig};
pub use domains::process::ProcessConfig;
pub use domains::utils::serde_duration;
pub use domains::JsprocConfig;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;
