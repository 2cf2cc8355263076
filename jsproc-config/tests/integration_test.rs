//! Integration tests for jsproc-config

use jsproc_config::*;
use std::io::Write;
use std::time::Duration;
use temp_env::{with_vars, with_vars_unset};

/// Variables other tests set; file-based tests clear them so they run serialised
const OVERRIDDEN: [&str; 7] = [
    "JSPROC_LOG_LEVEL",
    "JSPROC_LOG_FORMAT",
    "JSPROC_STRICT_PRESERVERS",
    "JSPROC_START_TIMEOUT",
    "JSPROC_THREAD_NAME_PREFIX",
    "JSPROC_ENABLE_TIMERS",
    "JSPROC_EXIT_TIMEOUT",
];

#[test]
fn test_default_config_validation() {
    let config = JsprocConfig::default();
    assert!(config.validate_all().is_ok());
}

#[test]
fn test_config_loader_from_env() {
    let vars = vec![
        ("JSPROC_LOG_LEVEL", Some("debug")),
        ("JSPROC_STRICT_PRESERVERS", Some("true")),
        ("JSPROC_START_TIMEOUT", Some("30")),
        ("JSPROC_THREAD_NAME_PREFIX", Some("worker")),
    ];

    with_vars(vars, || {
        let loader = ConfigLoader::new();
        let config = loader.from_env().unwrap();

        assert_eq!(config.logging.level, LogLevel::Debug);
        assert!(config.process.strict_preservers);
        assert_eq!(config.process.start_timeout, Duration::from_secs(30));
        assert_eq!(config.process.thread_name_prefix, "worker");
    });
}

#[test]
fn test_config_loader_rejects_bad_env_value() {
    with_vars(vec![("JSPROC_ENABLE_TIMERS", Some("sometimes"))], || {
        let result = ConfigLoader::new().from_env();
        assert!(matches!(result, Err(ConfigError::EnvError(_))));
    });
}

#[test]
fn test_fractional_timeout_from_env() {
    with_vars(vec![("JSPROC_EXIT_TIMEOUT", Some("0.5"))], || {
        let config = ConfigLoader::new().from_env().unwrap();
        assert_eq!(config.process.exit_timeout, Duration::from_millis(500));
    });

    with_vars(vec![("JSPROC_EXIT_TIMEOUT", Some("-1"))], || {
        assert!(matches!(ConfigLoader::new().from_env(), Err(ConfigError::EnvError(_))));
    });
}

#[test]
fn test_custom_prefix() {
    with_vars(vec![("APP_LOG_FORMAT", Some("json"))], || {
        let config = ConfigLoader::with_prefix("APP").from_env().unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
    });
}

#[test]
fn test_yaml_config_serialization() {
    let config = JsprocConfig::default();
    let yaml = serde_yaml::to_string(&config).unwrap();

    // Parse it back
    let parsed: JsprocConfig = serde_yaml::from_str(&yaml).unwrap();
    assert!(parsed.validate_all().is_ok());
}

#[test]
fn test_config_from_file() {
    let yaml = r#"
process:
  thread_name_prefix: "app-js"
  enable_console: false
  strict_preservers: true
  bootstrap_script: "globalThis.VERSION = '1.0.0';"
  exit_timeout: 120

logging:
  level: warn
  format: json
  directives:
    - "jsproc_runtime=debug"
"#;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    let config = with_vars_unset(OVERRIDDEN, || ConfigLoader::new().from_file(file.path()).unwrap());

    assert_eq!(config.process.thread_name_prefix, "app-js");
    assert!(!config.process.enable_console);
    assert!(config.process.enable_timers);
    assert!(config.process.strict_preservers);
    assert_eq!(
        config.process.bootstrap_script.as_deref(),
        Some("globalThis.VERSION = '1.0.0';")
    );
    assert_eq!(config.process.exit_timeout, Duration::from_secs(120));
    assert_eq!(config.logging.level, LogLevel::Warn);
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.logging.filter_expression(), "warn,jsproc_runtime=debug");
}

#[test]
fn test_invalid_file_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"process:\n  thread_name_prefix: \"\"\n").unwrap();

    let result = with_vars_unset(OVERRIDDEN, || ConfigLoader::new().from_file(file.path()));
    assert!(matches!(result, Err(ConfigError::DomainError { .. })));
}

#[test]
fn test_malformed_yaml_reports_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"process: [unclosed\n").unwrap();

    let result = with_vars_unset(OVERRIDDEN, || ConfigLoader::new().from_file(file.path()));
    match result {
        Err(ConfigError::ParseError { path, .. }) => assert_eq!(path, file.path()),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_missing_file() {
    let result = ConfigLoader::new().load(Some("/nonexistent/jsproc.yaml"));
    assert!(matches!(result, Err(ConfigError::FileReadError(_))));
}

#[test]
fn test_generate_sample() {
    let sample = JsprocConfig::generate_sample();
    assert!(sample.contains("process:"));
    assert!(sample.contains("logging:"));
}
