//! Error types shared across curfew crates

use thiserror::Error;

/// Error type for the value parsers in this crate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CurfewError {
    /// Display text is matched by clients, keep it stable.
    #[error("Invalid time format")]
    InvalidTimeFormat { value: String },
}

impl CurfewError {
    pub fn invalid_time(value: impl Into<String>) -> Self {
        Self::InvalidTimeFormat {
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CurfewError>;
