//! Shared types for the curfew API

use serde::{Deserialize, Serialize};

/// A schedule as submitted by a client.
///
/// Every field is optional on the wire so that a missing time or day list
/// reaches the scheduler and is rejected with the same message a UI would
/// show, instead of failing JSON decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Shutdown time, `HH:MM` 24-hour local time
    #[serde(default)]
    pub time: Option<String>,

    /// Weekday names, case-insensitive
    #[serde(default)]
    pub days: Option<Vec<String>>,

    /// Reminder times, `HH:MM` each
    #[serde(default)]
    pub reminders: Option<Vec<String>>,
}

impl ScheduleConfig {
    pub fn new(time: impl Into<String>, days: &[&str]) -> Self {
        Self {
            time: Some(time.into()),
            days: Some(days.iter().map(|d| d.to_string()).collect()),
            reminders: None,
        }
    }

    pub fn with_reminders(mut self, reminders: &[&str]) -> Self {
        self.reminders = Some(reminders.iter().map(|r| r.to_string()).collect());
        self
    }
}

/// The persisted schedule record (`shutdown-state.json`).
///
/// Inactive records carry only `active: false`; the schedule fields are
/// dropped on deactivation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleState {
    pub active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminders: Option<Vec<String>>,
}

impl ScheduleState {
    /// The minimal `{active: false}` record
    pub fn inactive() -> Self {
        Self::default()
    }

    /// Active record echoing the caller's input; omitted reminders become `[]`
    pub fn active(time: String, days: Vec<String>, reminders: Option<Vec<String>>) -> Self {
        Self {
            active: true,
            time: Some(time),
            days: Some(days),
            reminders: Some(reminders.unwrap_or_default()),
        }
    }

    /// The config that would re-create this schedule, if it is active
    pub fn to_config(&self) -> Option<ScheduleConfig> {
        if !self.active {
            return None;
        }
        Some(ScheduleConfig {
            time: self.time.clone(),
            days: self.days.clone(),
            reminders: Some(self.reminders.clone().unwrap_or_default()),
        })
    }
}

/// The `{success, message}` answer UIs expect for mutating commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub success: bool,
    pub message: String,
}

impl CommandOutcome {
    pub const ACTIVATED: &'static str = "Shutdown scheduled successfully!";
    pub const UPDATED: &'static str = "Shutdown schedule updated successfully!";
    pub const DEACTIVATED: &'static str = "Shutdown deactivated successfully!";

    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    pub fn activate_failed(error: impl std::fmt::Display) -> Self {
        Self::failed(format!("Failed to activate: {}", error))
    }

    pub fn update_failed(error: impl std::fmt::Display) -> Self {
        Self::failed(format!("Failed to update: {}", error))
    }
}

/// Operating system family the service runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Linux,
    Macos,
    Windows,
}

impl Platform {
    /// The platform this binary was built for. Unknown Unix flavours are
    /// treated as Linux.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::Macos
        } else {
            Platform::Linux
        }
    }
}

/// Service health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub live: bool,
    pub ready: bool,
    pub store_ok: bool,
    pub platform: Platform,
    pub live_triggers: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_state_serializes_minimal() {
        let json = serde_json::to_string(&ScheduleState::inactive()).unwrap();
        assert_eq!(json, r#"{"active":false}"#);
    }

    #[test]
    fn active_state_defaults_reminders_to_empty() {
        let state = ScheduleState::active("22:00".into(), vec!["monday".into()], None);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"active": true, "time": "22:00", "days": ["monday"], "reminders": []})
        );
    }

    #[test]
    fn config_accepts_missing_fields() {
        let config: ScheduleConfig = serde_json::from_str(r#"{"days":["monday"]}"#).unwrap();
        assert!(config.time.is_none());
        assert_eq!(config.days, Some(vec!["monday".to_string()]));
        assert!(config.reminders.is_none());
    }

    #[test]
    fn to_config_round_trips_active_state() {
        let state = ScheduleState::active(
            "23:00".into(),
            vec!["friday".into()],
            Some(vec!["22:30".into()]),
        );
        let config = state.to_config().unwrap();
        assert_eq!(config, ScheduleConfig::new("23:00", &["friday"]).with_reminders(&["22:30"]));
        assert!(ScheduleState::inactive().to_config().is_none());
    }

    #[test]
    fn outcome_messages() {
        assert_eq!(
            CommandOutcome::update_failed("Cannot update: shutdown is not active").message,
            "Failed to update: Cannot update: shutdown is not active"
        );
        assert!(CommandOutcome::ok(CommandOutcome::ACTIVATED).success);
    }
}
