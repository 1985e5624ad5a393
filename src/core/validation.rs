//! Validation utilities for CLI arguments and configuration values

use std::fmt;
use std::net::SocketAddr;

/// A rejected argument or configuration value
///
/// Always user-actionable: the message says which value is wrong and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

impl crate::core::error_handling::ContextualError for ValidationError {
    fn is_user_actionable(&self) -> bool {
        true
    }

    fn user_message(&self) -> Option<&str> {
        Some(&self.message)
    }
}

/// Validate positive integer value
pub fn validate_positive_int(value: &str) -> Result<u64, String> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err("Value must be greater than 0".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("'{}' is not a valid positive integer", value)),
    }
}

/// Require a strictly positive setting
pub fn require_positive(name: &str, value: u64) -> Result<u64, ValidationError> {
    if value == 0 {
        return Err(ValidationError::new(format!(
            "{name} must be greater than 0"
        )));
    }
    Ok(value)
}

/// Validate a `host:port` listen address
pub fn validate_bind_address(value: &str) -> Result<SocketAddr, ValidationError> {
    value.trim().parse::<SocketAddr>().map_err(|e| {
        ValidationError::new(format!(
            "Invalid bind address '{value}': {e} (expected host:port, e.g. 127.0.0.1:7878)"
        ))
    })
}

/// Validate a client-supplied identifier (venue, user or connection id)
///
/// Identifiers are opaque but must be non-empty, without surrounding
/// whitespace or control characters.
pub fn validate_identifier(kind: &str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new(format!("{kind} cannot be empty")));
    }
    if value.trim() != value {
        return Err(ValidationError::new(format!(
            "{kind} '{value}' has leading or trailing whitespace"
        )));
    }
    if value.chars().any(char::is_control) {
        return Err(ValidationError::new(format!(
            "{kind} contains control characters"
        )));
    }
    Ok(())
}
