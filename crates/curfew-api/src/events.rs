//! Event types for curfewd -> client streaming

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::{ScheduleState, API_VERSION};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Local>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: curfew_util::now(),
            payload,
        }
    }
}

/// All possible events from the service to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Persisted schedule after any change
    StateChanged(ScheduleState),

    /// A reminder notification was dispatched
    ReminderIssued { title: String, message: String },

    /// The shutdown trigger fired and the OS command is being run
    ShutdownStarted { time: String },

    /// Both shutdown attempts failed
    ShutdownFailed { message: String },

    /// Service is shutting down
    ServiceStopping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_changed_round_trip() {
        let event = Event::new(EventPayload::StateChanged(ScheduleState::inactive()));
        let json = serde_json::to_string(&event).unwrap();
        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            parsed.payload,
            EventPayload::StateChanged(ScheduleState { active: false, .. })
        ));
    }
}
