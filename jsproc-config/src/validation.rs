//! Validation shared by the configuration domains

use crate::error::{ConfigError, ConfigResult};

/// A configuration domain that can check its own values
pub trait Validatable {
    fn validate(&self) -> ConfigResult<()>;

    /// Name reported in [`ConfigError::DomainError`]
    fn domain_name(&self) -> &'static str;

    fn validation_error(&self, message: impl Into<String>) -> ConfigError
    where
        Self: Sized,
    {
        domain_error(self.domain_name(), message)
    }
}

fn domain_error(domain: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::DomainError {
        domain: domain.to_string(),
        message: message.into(),
    }
}

/// Reject zero and negative values
pub fn validate_positive<T>(value: T, field_name: &str, domain: &str) -> ConfigResult<()>
where
    T: PartialOrd + Default + std::fmt::Display,
{
    if value > T::default() {
        Ok(())
    } else {
        Err(domain_error(
            domain,
            format!("{} must be greater than 0, got {}", field_name, value),
        ))
    }
}

/// Non-empty, and limited to `[A-Za-z0-9._-]` so it can be used in thread names
pub fn validate_identifier(value: &str, field_name: &str, domain: &str) -> ConfigResult<()> {
    if value.is_empty() {
        return Err(domain_error(domain, format!("{} cannot be empty", field_name)));
    }

    match value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        Some(bad) => Err(domain_error(
            domain,
            format!("{} contains invalid character '{}'", field_name, bad),
        )),
        None => Ok(()),
    }
}
