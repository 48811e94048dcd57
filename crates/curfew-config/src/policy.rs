//! Validated service configuration

use crate::schema::{RawConfig, RawNotificationConfig, RawServiceConfig};
use curfew_util::{default_data_dir, default_socket_path};
use std::path::PathBuf;
use std::time::Duration;

/// Default OS command timeout
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Default reminder notification title
pub const DEFAULT_NOTIFICATION_TITLE: &str = "Shutdown Reminder";

/// Validated configuration ready for use by the service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
    pub command_timeout: Duration,
    pub restore_on_start: bool,
    pub deactivate_on_exit: bool,
    pub notifications: NotificationConfig,
}

impl ServiceConfig {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let RawServiceConfig {
            socket_path,
            data_dir,
            command_timeout_seconds,
            restore_on_start,
            deactivate_on_exit,
        } = raw.service;

        Self {
            socket_path: socket_path.unwrap_or_else(default_socket_path),
            data_dir: data_dir.unwrap_or_else(default_data_dir),
            command_timeout: command_timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_COMMAND_TIMEOUT),
            restore_on_start: restore_on_start.unwrap_or(true),
            deactivate_on_exit: deactivate_on_exit.unwrap_or(true),
            notifications: NotificationConfig::from_raw(raw.notifications),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            data_dir: default_data_dir(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            restore_on_start: true,
            deactivate_on_exit: true,
            notifications: NotificationConfig::default(),
        }
    }
}

/// Reminder notification settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub title: String,
}

impl NotificationConfig {
    fn from_raw(raw: RawNotificationConfig) -> Self {
        Self {
            enabled: raw.enabled.unwrap_or(true),
            title: raw
                .title
                .unwrap_or_else(|| DEFAULT_NOTIFICATION_TITLE.to_string()),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: DEFAULT_NOTIFICATION_TITLE.to_string(),
        }
    }
}
