//! Configuration validation

use crate::schema::RawConfig;
use thiserror::Error;

/// Accepted range for `command_timeout_seconds`
pub const COMMAND_TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 1..=60;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("command_timeout_seconds must be between {min} and {max}, got {value}")]
    CommandTimeoutOutOfRange { value: u64, min: u64, max: u64 },

    #[error("Notification config error: {0}")]
    NotificationError(String),

    #[error("Service config error: {0}")]
    ServiceError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(seconds) = config.service.command_timeout_seconds {
        if !COMMAND_TIMEOUT_RANGE.contains(&seconds) {
            errors.push(ValidationError::CommandTimeoutOutOfRange {
                value: seconds,
                min: *COMMAND_TIMEOUT_RANGE.start(),
                max: *COMMAND_TIMEOUT_RANGE.end(),
            });
        }
    }

    if let Some(path) = &config.service.socket_path {
        if path.as_os_str().is_empty() {
            errors.push(ValidationError::ServiceError(
                "socket_path cannot be empty".into(),
            ));
        }
    }

    if let Some(path) = &config.service.data_dir {
        if path.as_os_str().is_empty() {
            errors.push(ValidationError::ServiceError(
                "data_dir cannot be empty".into(),
            ));
        }
    }

    if let Some(title) = &config.notifications.title {
        if title.trim().is_empty() {
            errors.push(ValidationError::NotificationError(
                "title cannot be empty".into(),
            ));
        }
    }

    errors
}
