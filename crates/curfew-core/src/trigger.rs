//! Weekly wall-clock triggers
//!
//! Each trigger is one tokio task. It computes the next local instant that
//! matches its time and weekday mask, sleeps towards it in bounded slices
//! (re-reading the clock each time so wall-clock jumps are noticed), and
//! invokes its action.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Days, Local, LocalResult, NaiveDate, TimeZone};
use curfew_util::{format_datetime_full, Clock, DaysOfWeek, WallClock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{CoreError, CoreResult};

/// Longest single sleep between clock checks
pub const MAX_SLEEP_SLICE: Duration = Duration::from_secs(30);

/// Work done when a trigger fires
#[async_trait]
pub trait TriggerAction: Send + Sync + 'static {
    /// Name used in logs
    fn label(&self) -> String {
        "trigger".into()
    }

    /// Called once per occurrence with the instant it was scheduled for
    async fn fire(&self, scheduled_for: DateTime<Local>);
}

/// Resolve a local date and wall-clock time to an instant.
///
/// Ambiguous times (clocks going back) resolve to the earlier instant.
/// Times skipped by a forward jump resolve to one hour later.
pub fn resolve_local(date: NaiveDate, time: WallClock) -> Option<DateTime<Local>> {
    let naive = date.and_time(time.to_naive_time());
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(at) => Some(at),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => Local
            .from_local_datetime(&(naive + chrono::Duration::hours(1)))
            .earliest(),
    }
}

/// First instant strictly after `after` falling on one of `days` at `time`
pub fn next_occurrence(
    time: WallClock,
    days: DaysOfWeek,
    after: DateTime<Local>,
) -> Option<DateTime<Local>> {
    let today = after.date_naive();
    // 0..=7 so that a passed slot today wraps to the same weekday next week
    for offset in 0..=7u64 {
        let date = today.checked_add_days(Days::new(offset))?;
        if !days.contains(date.weekday()) {
            continue;
        }
        if let Some(at) = resolve_local(date, time) {
            if at > after {
                return Some(at);
            }
        }
    }
    None
}

/// A recurring weekly trigger. Dropping it aborts the task; [`stop`] also
/// waits out an in-flight fire.
///
/// [`stop`]: WeeklyTrigger::stop
pub struct WeeklyTrigger {
    label: String,
    time: WallClock,
    days: DaysOfWeek,
    // Held for the whole of each fire. `true` once stopped.
    gate: Arc<Mutex<bool>>,
    task: JoinHandle<()>,
}

impl WeeklyTrigger {
    /// Arm a trigger firing `action` at `time` on each day in `days`
    pub fn start(
        time: WallClock,
        days: DaysOfWeek,
        action: Arc<dyn TriggerAction>,
        clock: Arc<dyn Clock>,
    ) -> CoreResult<Self> {
        let time = WallClock::new(time.hour, time.minute).ok_or_else(|| {
            CoreError::InvalidTimeFormat {
                value: format!("{}:{}", time.hour, time.minute),
            }
        })?;
        if days.is_empty() {
            return Err(CoreError::NoValidDays);
        }

        let label = action.label();
        let gate = Arc::new(Mutex::new(false));
        let task = tokio::spawn(run_trigger(time, days, action, clock, gate.clone()));

        info!(trigger = %label, %time, days = %days, "Trigger started");

        Ok(Self {
            label,
            time,
            days,
            gate,
            task,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn time(&self) -> WallClock {
        self.time
    }

    pub fn days(&self) -> DaysOfWeek {
        self.days
    }

    /// Next instant this trigger would fire after `now`
    pub fn next_fire_after(&self, now: DateTime<Local>) -> Option<DateTime<Local>> {
        next_occurrence(self.time, self.days, now)
    }

    /// Stop the trigger. Once this returns the action will not be invoked
    /// again; a fire already running is allowed to finish first.
    pub async fn stop(self) {
        {
            let mut stopped = self.gate.lock().await;
            *stopped = true;
        }
        self.task.abort();
        debug!(trigger = %self.label, "Trigger stopped");
    }
}

impl Drop for WeeklyTrigger {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_trigger(
    time: WallClock,
    days: DaysOfWeek,
    action: Arc<dyn TriggerAction>,
    clock: Arc<dyn Clock>,
    gate: Arc<Mutex<bool>>,
) {
    let label = action.label();
    let mut after = clock.now();

    loop {
        let Some(target) = next_occurrence(time, days, after) else {
            warn!(trigger = %label, "No future occurrence, trigger idle");
            return;
        };
        debug!(trigger = %label, at = %format_datetime_full(&target), "Next fire scheduled");

        loop {
            let now = clock.now();
            if now >= target {
                break;
            }
            let remaining = (target - now).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(remaining.min(MAX_SLEEP_SLICE)).await;
        }

        {
            let stopped = gate.lock().await;
            if *stopped {
                return;
            }
            info!(trigger = %label, at = %format_datetime_full(&target), "Trigger fired");
            action.fire(target).await;
        }

        // A late wake-up fires once, then resumes from the present
        after = target.max(clock.now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TokioClock;
    use chrono::Weekday;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn wall(h: u8, m: u8) -> WallClock {
        WallClock::new(h, m).unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        fired: StdMutex<Vec<DateTime<Local>>>,
        // Simulated work per fire
        busy_for: Option<Duration>,
        completed: AtomicUsize,
    }

    impl Recorder {
        fn fired(&self) -> Vec<DateTime<Local>> {
            self.fired.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TriggerAction for Recorder {
        async fn fire(&self, scheduled_for: DateTime<Local>) {
            self.fired.lock().unwrap().push(scheduled_for);
            if let Some(busy) = self.busy_for {
                tokio::time::sleep(busy).await;
            }
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn next_occurrence_later_today() {
        // 2025-12-29 is a Monday
        let now = local(2025, 12, 29, 21, 45);
        assert_eq!(now.weekday(), Weekday::Mon);

        let next = next_occurrence(wall(22, 0), DaysOfWeek::new(DaysOfWeek::MONDAY), now);
        assert_eq!(next, Some(local(2025, 12, 29, 22, 0)));
    }

    #[test]
    fn next_occurrence_wraps_a_week() {
        let now = local(2025, 12, 29, 22, 5);
        let next = next_occurrence(wall(22, 0), DaysOfWeek::new(DaysOfWeek::MONDAY), now);
        assert_eq!(next, Some(local(2026, 1, 5, 22, 0)));
    }

    #[test]
    fn next_occurrence_is_strictly_after() {
        let now = local(2025, 12, 29, 22, 0);
        let days = DaysOfWeek::new(DaysOfWeek::MONDAY | DaysOfWeek::WEDNESDAY);
        assert_eq!(
            next_occurrence(wall(22, 0), days, now),
            Some(local(2025, 12, 31, 22, 0))
        );
    }

    #[test]
    fn next_occurrence_needs_days() {
        let now = local(2025, 12, 29, 12, 0);
        assert!(next_occurrence(wall(22, 0), DaysOfWeek::NONE, now).is_none());
    }

    #[tokio::test]
    async fn start_rejects_bad_input() {
        let clock: Arc<dyn Clock> = Arc::new(TokioClock::starting_at(local(2025, 12, 29, 12, 0)));
        let action: Arc<dyn TriggerAction> = Arc::new(Recorder::default());

        let bad_time = WallClock { hour: 24, minute: 0 };
        assert!(matches!(
            WeeklyTrigger::start(bad_time, DaysOfWeek::ALL_DAYS, action.clone(), clock.clone()),
            Err(CoreError::InvalidTimeFormat { .. })
        ));
        assert!(matches!(
            WeeklyTrigger::start(wall(22, 0), DaysOfWeek::NONE, action, clock),
            Err(CoreError::NoValidDays)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn fires_at_scheduled_instant() {
        let clock = Arc::new(TokioClock::starting_at(local(2025, 12, 29, 21, 59)));
        let recorder = Arc::new(Recorder::default());
        let trigger = WeeklyTrigger::start(
            wall(22, 0),
            DaysOfWeek::new(DaysOfWeek::MONDAY),
            recorder.clone(),
            clock,
        )
        .unwrap();

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(recorder.fired().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(recorder.fired(), vec![local(2025, 12, 29, 22, 0)]);

        trigger.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn recurs_on_each_scheduled_day() {
        let clock = Arc::new(TokioClock::starting_at(local(2025, 12, 29, 21, 0)));
        let recorder = Arc::new(Recorder::default());
        let trigger = WeeklyTrigger::start(
            wall(22, 0),
            DaysOfWeek::new(DaysOfWeek::MONDAY | DaysOfWeek::WEDNESDAY),
            recorder.clone(),
            clock,
        )
        .unwrap();

        // Through the following Monday
        tokio::time::sleep(Duration::from_secs(7 * 24 * 3600 + 3600 + 60)).await;
        assert_eq!(
            recorder.fired(),
            vec![
                local(2025, 12, 29, 22, 0),
                local(2025, 12, 31, 22, 0),
                local(2026, 1, 5, 22, 0),
            ]
        );

        trigger.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_trigger_never_fires() {
        let clock = Arc::new(TokioClock::starting_at(local(2025, 12, 29, 21, 59)));
        let recorder = Arc::new(Recorder::default());
        let trigger = WeeklyTrigger::start(
            wall(22, 0),
            DaysOfWeek::ALL_DAYS,
            recorder.clone(),
            clock,
        )
        .unwrap();

        tokio::time::sleep(Duration::from_secs(30)).await;
        trigger.stop().await;

        tokio::time::sleep(Duration::from_secs(3 * 24 * 3600)).await;
        assert!(recorder.fired().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_waits_for_in_flight_fire() {
        let clock = Arc::new(TokioClock::starting_at(local(2025, 12, 29, 21, 59)));
        let recorder = Arc::new(Recorder {
            busy_for: Some(Duration::from_secs(10)),
            ..Default::default()
        });
        let trigger = WeeklyTrigger::start(
            wall(22, 0),
            DaysOfWeek::ALL_DAYS,
            recorder.clone(),
            clock,
        )
        .unwrap();

        // Fire begins at +60s and is busy until +70s
        tokio::time::sleep(Duration::from_secs(65)).await;
        assert_eq!(recorder.fired().len(), 1);
        assert_eq!(recorder.completed.load(Ordering::SeqCst), 0);

        trigger.stop().await;
        assert_eq!(recorder.completed.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(2 * 24 * 3600)).await;
        assert_eq!(recorder.fired().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_trigger_aborts_it() {
        let clock = Arc::new(TokioClock::starting_at(local(2025, 12, 29, 21, 59)));
        let recorder = Arc::new(Recorder::default());
        let trigger = WeeklyTrigger::start(
            wall(22, 0),
            DaysOfWeek::ALL_DAYS,
            recorder.clone(),
            clock,
        )
        .unwrap();
        assert_eq!(
            trigger.next_fire_after(local(2025, 12, 29, 21, 59)),
            Some(local(2025, 12, 29, 22, 0))
        );

        drop(trigger);
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert!(recorder.fired().is_empty());
    }
}
