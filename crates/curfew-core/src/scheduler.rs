//! The shutdown scheduler state machine
//!
//! Owns the live triggers and is the only writer of the persisted schedule.
//! States are `Inactive` and `Active`; the persisted record is the source
//! of truth for which one we are in.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use curfew_api::{ScheduleConfig, ScheduleState};
use curfew_host_api::{NotificationSender, ShutdownExecutor};
use curfew_store::StateStore;
use curfew_util::{Clock, DaysOfWeek, WallClock};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{CoreError, CoreEvent, CoreResult, ReminderAction, TriggerAction, WeeklyTrigger};

/// A validated schedule, ready to be armed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulePlan {
    pub time: WallClock,
    pub days: DaysOfWeek,
    /// Parsed reminder times, input order, duplicates removed
    pub reminders: Vec<WallClock>,
}

impl SchedulePlan {
    /// Validate a client-supplied schedule.
    ///
    /// Unknown weekday names and unparseable reminders are logged and
    /// skipped; a bad shutdown time or an empty effective day set is fatal.
    pub fn from_config(config: &ScheduleConfig) -> CoreResult<Self> {
        let time_str = config
            .time
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(CoreError::Validation)?;
        let day_names = config
            .days
            .as_deref()
            .filter(|d| !d.is_empty())
            .ok_or(CoreError::Validation)?;

        let time = WallClock::parse(time_str).map_err(|_| CoreError::InvalidTimeFormat {
            value: time_str.to_string(),
        })?;

        let (days, unknown) = DaysOfWeek::from_names(day_names);
        if !unknown.is_empty() {
            warn!(?unknown, "Ignoring unrecognized days");
        }
        if days.is_empty() {
            return Err(CoreError::NoValidDays);
        }

        let mut reminders = Vec::new();
        for raw in config.reminders.as_deref().unwrap_or_default() {
            match WallClock::parse(raw) {
                Ok(at) if !reminders.contains(&at) => reminders.push(at),
                Ok(_) => debug!(reminder = %raw, "Duplicate reminder skipped"),
                Err(_) => warn!(reminder = %raw, "Invalid reminder time skipped"),
            }
        }

        Ok(Self {
            time,
            days,
            reminders,
        })
    }
}

/// Scheduler settings taken from the service configuration
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub notification_title: String,
    /// When false, reminders are persisted but never armed
    pub reminders_enabled: bool,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            notification_title: "Shutdown Reminder".into(),
            reminders_enabled: true,
        }
    }
}

/// Powers the machine off when the shutdown trigger fires
pub struct ShutdownAction {
    time: WallClock,
    executor: Arc<dyn ShutdownExecutor>,
    events: Option<mpsc::UnboundedSender<CoreEvent>>,
}

impl ShutdownAction {
    pub fn new(
        time: WallClock,
        executor: Arc<dyn ShutdownExecutor>,
        events: Option<mpsc::UnboundedSender<CoreEvent>>,
    ) -> Self {
        Self {
            time,
            executor,
            events,
        }
    }

    fn emit(&self, event: CoreEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

#[async_trait]
impl TriggerAction for ShutdownAction {
    fn label(&self) -> String {
        format!("shutdown@{}", self.time)
    }

    async fn fire(&self, _scheduled_for: DateTime<Local>) {
        warn!(time = %self.time, "Executing scheduled shutdown");
        self.emit(CoreEvent::ShutdownStarted { time: self.time });

        if let Err(e) = self.executor.execute_shutdown().await {
            let failure = CoreError::ShutdownFailed;
            error!(error = %e, "{}", failure);
            self.emit(CoreEvent::ShutdownFailed {
                message: failure.to_string(),
            });
        }
    }
}

/// The shutdown scheduler
pub struct ShutdownScheduler {
    store: Arc<dyn StateStore>,
    shutdown: Arc<dyn ShutdownExecutor>,
    notifier: Arc<dyn NotificationSender>,
    clock: Arc<dyn Clock>,
    options: SchedulerOptions,
    events: Option<mpsc::UnboundedSender<CoreEvent>>,
    triggers: Vec<WeeklyTrigger>,
}

impl ShutdownScheduler {
    pub fn new(
        store: Arc<dyn StateStore>,
        shutdown: Arc<dyn ShutdownExecutor>,
        notifier: Arc<dyn NotificationSender>,
        clock: Arc<dyn Clock>,
        options: SchedulerOptions,
    ) -> Self {
        info!(
            reminders_enabled = options.reminders_enabled,
            "Shutdown scheduler initialized"
        );

        Self {
            store,
            shutdown,
            notifier,
            clock,
            options,
            events: None,
            triggers: Vec::new(),
        }
    }

    /// Send [`CoreEvent`]s to `tx`
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<CoreEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Arm `config`, replacing any existing schedule.
    ///
    /// Nothing changes unless the config validates and persists.
    pub async fn activate(&mut self, config: ScheduleConfig) -> CoreResult<()> {
        let plan = SchedulePlan::from_config(&config)?;

        let state = ScheduleState::active(
            config.time.unwrap_or_default(),
            config.days.unwrap_or_default(),
            config.reminders,
        );
        self.store.save_state(&state)?;

        self.teardown().await;
        self.triggers = self.arm(&plan)?;

        info!(
            time = %plan.time,
            days = %plan.days,
            reminders = plan.reminders.len(),
            triggers = self.triggers.len(),
            "Shutdown scheduled"
        );
        self.emit(CoreEvent::StateChanged(state));
        Ok(())
    }

    /// Replace the armed schedule. Fails with [`CoreError::NotActive`] when
    /// nothing is scheduled.
    pub async fn update(&mut self, config: ScheduleConfig) -> CoreResult<()> {
        if !self.is_active() {
            return Err(CoreError::NotActive);
        }
        self.activate(config).await
    }

    /// Disarm everything and persist `{active: false}`. Idempotent; never
    /// fails. No trigger fires after this returns.
    pub async fn deactivate(&mut self) {
        let stopped = self.triggers.len();
        self.teardown().await;

        let state = ScheduleState::inactive();
        if let Err(e) = self.store.save_state(&state) {
            error!(error = %e, "Failed to persist deactivation");
        }

        info!(stopped, "Shutdown deactivated");
        self.emit(CoreEvent::StateChanged(state));
    }

    /// The persisted schedule. Missing or unreadable records read as
    /// inactive.
    pub fn get_state(&self) -> ScheduleState {
        match self.store.load_state() {
            Ok(Some(state)) => state,
            Ok(None) => ScheduleState::inactive(),
            Err(e) => {
                warn!(error = %e, "Failed to read schedule, treating as inactive");
                ScheduleState::inactive()
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.get_state().active
    }

    /// Re-arm a persisted active schedule. Returns whether one was restored.
    /// A saved schedule that no longer validates is replaced by
    /// `{active: false}` and its error returned.
    pub async fn restore_saved(&mut self) -> CoreResult<bool> {
        let Some(config) = self.get_state().to_config() else {
            debug!("No active schedule to restore");
            return Ok(false);
        };

        match self.activate(config).await {
            Ok(()) => {
                info!("Restored saved schedule");
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "Saved schedule could not be restored, deactivating");
                let state = ScheduleState::inactive();
                if let Err(store_err) = self.store.save_state(&state) {
                    error!(error = %store_err, "Failed to persist deactivation");
                }
                self.emit(CoreEvent::StateChanged(state));
                Err(e)
            }
        }
    }

    /// Stop every trigger without touching the persisted schedule
    pub async fn release(&mut self) {
        let count = self.triggers.len();
        for trigger in self.triggers.drain(..) {
            trigger.stop().await;
        }
        debug!(count, "Triggers released");
    }

    pub fn live_trigger_count(&self) -> usize {
        self.triggers.len()
    }

    /// Next instant the shutdown trigger will fire, if armed
    pub fn next_shutdown(&self) -> Option<DateTime<Local>> {
        // The shutdown trigger is always armed first
        self.triggers
            .first()
            .and_then(|t| t.next_fire_after(self.clock.now()))
    }

    pub fn is_store_healthy(&self) -> bool {
        self.store.is_healthy()
    }

    async fn teardown(&mut self) {
        self.release().await;
        self.shutdown.cancel_os_shutdown().await;
    }

    fn arm(&self, plan: &SchedulePlan) -> CoreResult<Vec<WeeklyTrigger>> {
        let mut triggers = Vec::with_capacity(1 + plan.reminders.len());

        let shutdown = ShutdownAction::new(plan.time, self.shutdown.clone(), self.events.clone());
        triggers.push(WeeklyTrigger::start(
            plan.time,
            plan.days,
            Arc::new(shutdown),
            self.clock.clone(),
        )?);

        if !self.options.reminders_enabled {
            if !plan.reminders.is_empty() {
                info!(count = plan.reminders.len(), "Reminders disabled, not arming");
            }
            return Ok(triggers);
        }

        for &reminder in &plan.reminders {
            let action = ReminderAction::new(
                reminder,
                plan.time,
                plan.days,
                self.options.notification_title.clone(),
                self.notifier.clone(),
                self.clock.clone(),
            )
            .with_events(self.events.clone());
            triggers.push(WeeklyTrigger::start(
                reminder,
                plan.days,
                Arc::new(action),
                self.clock.clone(),
            )?);
        }

        Ok(triggers)
    }

    fn emit(&self, event: CoreEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TokioClock;
    use chrono::TimeZone;
    use curfew_host_api::{MockCall, MockHost};
    use curfew_store::MemoryStore;
    use std::time::Duration;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        host: MockHost,
        scheduler: ShutdownScheduler,
        events: mpsc::UnboundedReceiver<CoreEvent>,
    }

    // Monday 2025-12-29 21:00
    fn fixture() -> Fixture {
        fixture_with(SchedulerOptions::default(), MemoryStore::new())
    }

    fn fixture_with(options: SchedulerOptions, store: MemoryStore) -> Fixture {
        let store = Arc::new(store);
        let host = MockHost::new();
        let clock = Arc::new(TokioClock::starting_at(at(2025, 12, 29, 21, 0)));
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = ShutdownScheduler::new(
            store.clone(),
            Arc::new(host.clone()),
            Arc::new(host.clone()),
            clock,
            options,
        )
        .with_events(tx);
        Fixture {
            store,
            host,
            scheduler,
            events: rx,
        }
    }

    #[test]
    fn plan_validation_errors() {
        let missing_time = ScheduleConfig {
            days: Some(vec!["monday".into()]),
            ..Default::default()
        };
        assert!(matches!(
            SchedulePlan::from_config(&missing_time),
            Err(CoreError::Validation)
        ));
        assert!(matches!(
            SchedulePlan::from_config(&ScheduleConfig::new("22:00", &[])),
            Err(CoreError::Validation)
        ));
        assert!(matches!(
            SchedulePlan::from_config(&ScheduleConfig::new("25:00", &["monday"])),
            Err(CoreError::InvalidTimeFormat { .. })
        ));
        assert!(matches!(
            SchedulePlan::from_config(&ScheduleConfig::new("22:00", &["funday"])),
            Err(CoreError::NoValidDays)
        ));
    }

    #[test]
    fn plan_skips_bad_days_and_reminders() {
        let config = ScheduleConfig::new("22:00", &["Monday", "funday", "FRIDAY"])
            .with_reminders(&["21:30", "nope", "21:30", "21:45"]);
        let plan = SchedulePlan::from_config(&config).unwrap();

        assert_eq!(
            plan.days,
            DaysOfWeek::new(DaysOfWeek::MONDAY | DaysOfWeek::FRIDAY)
        );
        assert_eq!(
            plan.reminders,
            vec![WallClock::new(21, 30).unwrap(), WallClock::new(21, 45).unwrap()]
        );
    }

    #[tokio::test]
    async fn activate_persists_input_verbatim() {
        let mut f = fixture();
        f.scheduler
            .activate(ScheduleConfig::new("22:00", &["Monday", "funday"]))
            .await
            .unwrap();

        assert_eq!(
            f.scheduler.get_state(),
            ScheduleState::active(
                "22:00".into(),
                vec!["Monday".into(), "funday".into()],
                Some(vec![])
            )
        );
        assert_eq!(f.scheduler.live_trigger_count(), 1);
        assert_eq!(
            f.events.recv().await,
            Some(CoreEvent::StateChanged(f.scheduler.get_state()))
        );
    }

    #[tokio::test]
    async fn failed_activation_changes_nothing() {
        let mut f = fixture();
        f.scheduler
            .activate(ScheduleConfig::new("22:00", &["monday"]).with_reminders(&["21:30"]))
            .await
            .unwrap();
        let before = f.scheduler.get_state();

        let err = f
            .scheduler
            .activate(ScheduleConfig::new("22:60", &["friday"]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid time format");
        assert_eq!(f.scheduler.get_state(), before);
        assert_eq!(f.scheduler.live_trigger_count(), 2);
    }

    #[tokio::test]
    async fn store_failure_keeps_previous_schedule() {
        let mut f = fixture();
        f.scheduler
            .activate(ScheduleConfig::new("22:00", &["monday"]))
            .await
            .unwrap();

        f.store.set_fail_writes(true);
        let err = f
            .scheduler
            .activate(ScheduleConfig::new("23:00", &["friday"]))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Store(_)));
        assert_eq!(f.scheduler.get_state().time.as_deref(), Some("22:00"));
        assert_eq!(f.scheduler.live_trigger_count(), 1);
    }

    #[tokio::test]
    async fn update_requires_active_schedule() {
        let mut f = fixture();
        let err = f
            .scheduler
            .update(ScheduleConfig::new("22:00", &["monday"]))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotActive));
        assert!(f.store.load_state().unwrap().is_none());
        assert_eq!(f.scheduler.live_trigger_count(), 0);
    }

    #[tokio::test]
    async fn update_replaces_schedule() {
        let mut f = fixture();
        f.scheduler
            .activate(ScheduleConfig::new("22:00", &["monday"]))
            .await
            .unwrap();
        f.scheduler
            .update(ScheduleConfig::new("23:00", &["tuesday"]).with_reminders(&["22:45"]))
            .await
            .unwrap();

        let state = f.scheduler.get_state();
        assert_eq!(state.time.as_deref(), Some("23:00"));
        assert_eq!(state.days, Some(vec!["tuesday".to_string()]));
        assert_eq!(f.scheduler.live_trigger_count(), 2);
    }

    #[tokio::test]
    async fn deactivate_is_idempotent_and_lossy() {
        let mut f = fixture();
        f.scheduler
            .activate(ScheduleConfig::new("22:00", &["monday"]).with_reminders(&["21:30"]))
            .await
            .unwrap();

        f.scheduler.deactivate().await;
        f.scheduler.deactivate().await;

        assert_eq!(f.scheduler.get_state(), ScheduleState::inactive());
        assert_eq!(f.scheduler.live_trigger_count(), 0);
        // activate + two deactivations each cancel a pending OS shutdown
        assert_eq!(f.host.cancel_count(), 3);
    }

    #[tokio::test]
    async fn deactivate_survives_store_failure() {
        let mut f = fixture();
        f.scheduler
            .activate(ScheduleConfig::new("22:00", &["monday"]))
            .await
            .unwrap();
        f.store.set_fail_writes(true);

        f.scheduler.deactivate().await;
        assert_eq!(f.scheduler.live_trigger_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reminders_and_shutdown_fire_in_order() {
        let mut f = fixture();
        f.scheduler
            .activate(ScheduleConfig::new("22:00", &["monday"]).with_reminders(&["21:45"]))
            .await
            .unwrap();
        assert_eq!(f.scheduler.next_shutdown(), Some(at(2025, 12, 29, 22, 0)));

        tokio::time::sleep(Duration::from_secs(3600 + 60)).await;

        assert_eq!(
            f.host.calls(),
            vec![
                MockCall::CancelShutdown,
                MockCall::Notify {
                    title: "Shutdown Reminder".into(),
                    message: "System will shut down today at 22:00 (in 15 minutes)".into(),
                },
                MockCall::Shutdown,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_failure_is_reported() {
        let mut f = fixture();
        f.host.set_fail_shutdown(true);
        f.scheduler
            .activate(ScheduleConfig::new("21:30", &["monday"]))
            .await
            .unwrap();
        let _ = f.events.recv().await; // state_changed

        tokio::time::sleep(Duration::from_secs(31 * 60)).await;

        assert!(matches!(
            f.events.recv().await,
            Some(CoreEvent::ShutdownStarted { .. })
        ));
        match f.events.recv().await {
            Some(CoreEvent::ShutdownFailed { message }) => assert_eq!(
                message,
                "Shutdown failed. You may need to configure passwordless sudo for shutdown command."
            ),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_fires_after_deactivate() {
        let mut f = fixture();
        f.scheduler
            .activate(ScheduleConfig::new("21:01", &["monday"]).with_reminders(&["21:00"]))
            .await
            .unwrap();
        f.scheduler.deactivate().await;

        tokio::time::sleep(Duration::from_secs(8 * 24 * 3600)).await;
        assert_eq!(f.host.shutdown_count(), 0);
        assert!(f.host.notifications().is_empty());
    }

    #[tokio::test]
    async fn disabled_reminders_are_not_armed() {
        let options = SchedulerOptions {
            reminders_enabled: false,
            ..Default::default()
        };
        let mut f = fixture_with(options, MemoryStore::new());
        f.scheduler
            .activate(ScheduleConfig::new("22:00", &["monday"]).with_reminders(&["21:30"]))
            .await
            .unwrap();

        assert_eq!(f.scheduler.live_trigger_count(), 1);
        assert_eq!(
            f.scheduler.get_state().reminders,
            Some(vec!["21:30".to_string()])
        );
    }

    #[tokio::test]
    async fn restore_rearms_saved_schedule() {
        let saved = ScheduleState::active(
            "22:00".into(),
            vec!["monday".into()],
            Some(vec!["21:30".into()]),
        );
        let mut f = fixture_with(SchedulerOptions::default(), MemoryStore::with_state(saved.clone()));

        assert!(f.scheduler.restore_saved().await.unwrap());
        assert_eq!(f.scheduler.get_state(), saved);
        assert_eq!(f.scheduler.live_trigger_count(), 2);
    }

    #[tokio::test]
    async fn restore_resets_invalid_saved_schedule() {
        let saved = ScheduleState::active("bogus".into(), vec!["monday".into()], None);
        let mut f = fixture_with(SchedulerOptions::default(), MemoryStore::with_state(saved));

        assert!(f.scheduler.restore_saved().await.is_err());
        assert_eq!(f.scheduler.get_state(), ScheduleState::inactive());
        assert_eq!(f.scheduler.live_trigger_count(), 0);
    }

    #[tokio::test]
    async fn restore_without_saved_schedule() {
        let mut f = fixture();
        assert!(!f.scheduler.restore_saved().await.unwrap());
        assert!(f.store.load_state().unwrap().is_none());
    }

    #[tokio::test]
    async fn release_keeps_persisted_state() {
        let mut f = fixture();
        f.scheduler
            .activate(ScheduleConfig::new("22:00", &["monday"]))
            .await
            .unwrap();
        f.scheduler.release().await;

        assert_eq!(f.scheduler.live_trigger_count(), 0);
        assert!(f.scheduler.is_active());
    }
}
