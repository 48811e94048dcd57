//! Core events emitted by the scheduler

use curfew_api::ScheduleState;
use curfew_util::WallClock;

/// Events emitted by the scheduler and its triggers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// The persisted schedule changed
    StateChanged(ScheduleState),

    /// A reminder notification was dispatched
    ReminderIssued { title: String, message: String },

    /// The shutdown trigger fired
    ShutdownStarted { time: WallClock },

    /// Every shutdown attempt failed
    ShutdownFailed { message: String },
}
