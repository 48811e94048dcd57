//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Service settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Reminder notification settings
    #[serde(default)]
    pub notifications: RawNotificationConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// IPC socket path (default: $XDG_RUNTIME_DIR/curfew/curfewd.sock)
    pub socket_path: Option<PathBuf>,

    /// Directory holding shutdown-state.json
    pub data_dir: Option<PathBuf>,

    /// Upper bound for each OS command invocation
    pub command_timeout_seconds: Option<u64>,

    /// Re-arm a persisted active schedule at startup
    pub restore_on_start: Option<bool>,

    /// Disarm the schedule when the service exits
    pub deactivate_on_exit: Option<bool>,
}

/// Reminder notification settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawNotificationConfig {
    pub enabled: Option<bool>,

    /// Notification title
    pub title: Option<String>,
}
