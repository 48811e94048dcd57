//! Host capability traits

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Message shown when neither shutdown attempt succeeded
pub const SHUTDOWN_FAILED_HINT: &str =
    "Shutdown failed. You may need to configure passwordless sudo for shutdown command.";

/// Errors from host operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Spawn failed for '{program}': {message}")]
    SpawnFailed { program: String, message: String },

    #[error("'{command}' timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("'{command}' exited with {status}")]
    CommandFailed { command: String, status: String },

    #[error("{}", SHUTDOWN_FAILED_HINT)]
    ShutdownFailed,
}

pub type HostResult<T> = Result<T, HostError>;

/// Powers the machine off, and cancels a pending OS-level shutdown
#[async_trait]
pub trait ShutdownExecutor: Send + Sync {
    /// Shut the machine down now. Fails with [`HostError::ShutdownFailed`]
    /// when every attempt for the platform failed.
    async fn execute_shutdown(&self) -> HostResult<()>;

    /// Best-effort cancel of an OS shutdown already in progress. Failures
    /// are logged by the implementation and never returned.
    async fn cancel_os_shutdown(&self);
}

/// Shows a desktop notification
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Dispatch a notification. Always non-fatal: implementations log and
    /// swallow delivery failures.
    async fn dispatch_notification(&self, title: &str, message: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_failed_message_is_stable() {
        assert_eq!(
            HostError::ShutdownFailed.to_string(),
            "Shutdown failed. You may need to configure passwordless sudo for shutdown command."
        );
    }

    #[test]
    fn timeout_message_names_command() {
        let err = HostError::Timeout {
            command: "shutdown -h now".into(),
            timeout: Duration::from_secs(5),
        };
        assert_eq!(err.to_string(), "'shutdown -h now' timed out after 5s");
    }
}
