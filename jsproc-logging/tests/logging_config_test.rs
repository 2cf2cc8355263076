use jsproc_logging::{init_logging_from_config, log_with_severity, ErrorSeverity, LogFormat, LogLevel, LoggingConfig};

#[test]
fn test_yaml_logging_section() {
    let config: LoggingConfig = serde_yaml::from_str(
        r#"
level: debug
format: json
directives:
  - "jsproc_runtime=trace"
include_location: true
"#,
    )
    .unwrap();

    assert_eq!(config.level, LogLevel::Debug);
    assert_eq!(config.format, LogFormat::Json);
    assert!(config.include_location);
    assert!(config.thread_ids);
    assert_eq!(config.filter_expression(), "debug,jsproc_runtime=trace");

    assert!(init_logging_from_config(&config).is_ok());

    log_with_severity!(ErrorSeverity::Critical, severity = ?ErrorSeverity::Critical, "severity routed");
    log_with_severity!(ErrorSeverity::Info, "informational");
}

#[test]
fn test_empty_logging_section() {
    let config: LoggingConfig = serde_yaml::from_str("{}").unwrap();

    assert_eq!(config.level, LogLevel::Info);
    assert_eq!(config.format, LogFormat::Text);
    assert!(config.directives.is_empty());
}
