//! `tracing` setup shared by the jsproc crates and the `jsproc` binary

pub mod init;
pub mod severity;

pub use init::{init_logging_from_config, init_test_tracing};
pub use jsproc_config::{LogFormat, LogLevel, LoggingConfig};
pub use severity::ErrorSeverity;

#[doc(hidden)]
pub use tracing;

/// Emit an event at the level of an [`ErrorSeverity`]
///
/// `tracing` macros need a constant level, so this expands to one call per level.
#[macro_export]
macro_rules! log_with_severity {
    ($severity:expr, $($arg:tt)+) => {{
        let level = $crate::ErrorSeverity::as_level(&$severity);
        if level == $crate::tracing::Level::INFO {
            $crate::tracing::info!($($arg)+)
        } else if level == $crate::tracing::Level::WARN {
            $crate::tracing::warn!($($arg)+)
        } else {
            $crate::tracing::error!($($arg)+)
        }
    }};
}
