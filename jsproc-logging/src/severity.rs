//! How serious a failure is, used to choose its log level

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Info,
    /// Caller mistakes, such as calling into a process that already exited
    Low,
    #[default]
    Medium,
    /// The process cannot continue
    High,
    Critical,
}

impl ErrorSeverity {
    /// Whether the failure ends the process it happened in
    pub fn is_terminal(&self) -> bool {
        *self >= ErrorSeverity::High
    }

    pub fn as_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Info => tracing::Level::INFO,
            ErrorSeverity::Low | ErrorSeverity::Medium => tracing::Level::WARN,
            ErrorSeverity::High | ErrorSeverity::Critical => tracing::Level::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_threshold() {
        assert!(ErrorSeverity::High.is_terminal());
        assert!(ErrorSeverity::Critical.is_terminal());
        assert!(!ErrorSeverity::Medium.is_terminal());
        assert_eq!(ErrorSeverity::default(), ErrorSeverity::Medium);
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(ErrorSeverity::Low.as_level(), tracing::Level::WARN);
        assert_eq!(ErrorSeverity::High.as_level(), tracing::Level::ERROR);
        assert_eq!(serde_yaml::to_string(&ErrorSeverity::High).unwrap().trim(), "high");
    }
}
