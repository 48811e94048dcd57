//! Reminder text and the reminder trigger action

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Days, Local};
use curfew_host_api::NotificationSender;
use curfew_util::{weekday_display_name, Clock, DaysOfWeek, WallClock};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use crate::{next_occurrence, resolve_local, CoreEvent, TriggerAction, MAX_SLEEP_SLICE};

/// Describe the upcoming shutdown relative to `now`, e.g.
/// `System will shut down today at 22:00 (in 15 minutes)`.
///
/// With an empty `days` mask a passed time is assumed to recur tomorrow.
pub fn compute_reminder_message(
    shutdown_time: WallClock,
    days: DaysOfWeek,
    now: DateTime<Local>,
) -> String {
    let today = now.date_naive();
    let candidate = resolve_local(today, shutdown_time).unwrap_or(now);

    let target = if candidate >= now {
        candidate
    } else if !days.is_empty() {
        next_occurrence(shutdown_time, days, now).unwrap_or(candidate + chrono::Duration::days(7))
    } else {
        today
            .checked_add_days(Days::new(1))
            .and_then(|tomorrow| resolve_local(tomorrow, shutdown_time))
            .unwrap_or(candidate + chrono::Duration::days(1))
    };

    let when = match (target.date_naive() - today).num_days() {
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        _ => format!("on {}", weekday_display_name(target.weekday())),
    };

    let mut message = format!("System will shut down {} at {}", when, shutdown_time);
    if let Some(gap) = describe_gap(target - now) {
        message.push_str(&format!(" (in {})", gap));
    }
    message
}

/// "6 days 23 hours", "1 hour 5 minutes"; minutes are dropped once the gap
/// reaches a day. `None` for a gap under one minute.
fn describe_gap(gap: chrono::Duration) -> Option<String> {
    let total_minutes = gap.num_minutes().max(0);
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes / 60) % 24;
    let minutes = total_minutes % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(plural(days, "day"));
    }
    if hours > 0 {
        parts.push(plural(hours, "hour"));
    }
    if minutes > 0 && days == 0 {
        parts.push(plural(minutes, "minute"));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{} {}", n, unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

/// Shows the reminder notification for an upcoming shutdown
pub struct ReminderAction {
    reminder_time: WallClock,
    shutdown_time: WallClock,
    days: DaysOfWeek,
    title: String,
    notifier: Arc<dyn NotificationSender>,
    clock: Arc<dyn Clock>,
    events: Option<mpsc::UnboundedSender<CoreEvent>>,
}

impl ReminderAction {
    pub fn new(
        reminder_time: WallClock,
        shutdown_time: WallClock,
        days: DaysOfWeek,
        title: impl Into<String>,
        notifier: Arc<dyn NotificationSender>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reminder_time,
            shutdown_time,
            days,
            title: title.into(),
            notifier,
            clock,
            events: None,
        }
    }

    pub fn with_events(mut self, events: Option<mpsc::UnboundedSender<CoreEvent>>) -> Self {
        self.events = events;
        self
    }

    /// Instant the reminder text is measured from. Timer wake-ups land a
    /// little after the slot, so an on-time fire uses the slot itself; a
    /// fire more than one sleep slice late uses the current time.
    fn reference_time(&self, scheduled_for: DateTime<Local>) -> DateTime<Local> {
        let now = self.clock.now();
        let late_by = now - scheduled_for;
        let tolerance =
            chrono::Duration::from_std(MAX_SLEEP_SLICE).unwrap_or_else(|_| chrono::Duration::zero());
        if late_by >= chrono::Duration::zero() && late_by < tolerance {
            scheduled_for
        } else {
            now
        }
    }
}

#[async_trait]
impl TriggerAction for ReminderAction {
    fn label(&self) -> String {
        format!("reminder@{}", self.reminder_time)
    }

    async fn fire(&self, scheduled_for: DateTime<Local>) {
        let message =
            compute_reminder_message(self.shutdown_time, self.days, self.reference_time(scheduled_for));
        info!(%message, "Issuing shutdown reminder");

        self.notifier
            .dispatch_notification(&self.title, &message)
            .await;

        if let Some(tx) = &self.events {
            let _ = tx.send(CoreEvent::ReminderIssued {
                title: self.title.clone(),
                message,
            });
        }
    }
}
