//! Core errors

use curfew_host_api::SHUTDOWN_FAILED_HINT;
use curfew_store::StoreError;
use thiserror::Error;

/// Errors from scheduler operations. Display strings reach UIs verbatim.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Time and at least one day must be selected")]
    Validation,

    #[error("Invalid time format")]
    InvalidTimeFormat { value: String },

    #[error("No valid days selected")]
    NoValidDays,

    #[error("Cannot update: shutdown is not active")]
    NotActive,

    #[error("{}", SHUTDOWN_FAILED_HINT)]
    ShutdownFailed,

    #[error("Failed to save schedule: {0}")]
    Store(#[from] StoreError),
}

pub type CoreResult<T> = Result<T, CoreError>;
