//! Mock host implementations for testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use crate::{
    CommandOutput, CommandRunner, CommandSpec, ExitStatus, HostError, HostResult,
    NotificationSender, ShutdownExecutor,
};

/// A call recorded by [`MockHost`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Shutdown,
    CancelShutdown,
    Notify { title: String, message: String },
}

/// Mock host for unit/integration testing. Records every call instead of
/// touching the machine.
#[derive(Clone, Default)]
pub struct MockHost {
    calls: Arc<Mutex<Vec<MockCall>>>,
    changed: Arc<Notify>,

    /// Configure shutdown to fail
    pub fail_shutdown: Arc<Mutex<bool>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_shutdown(&self, fail: bool) {
        *self.fail_shutdown.lock().unwrap_or_else(|e| e.into_inner()) = fail;
    }

    /// All calls in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn shutdown_count(&self) -> usize {
        self.count(|c| matches!(c, MockCall::Shutdown))
    }

    pub fn cancel_count(&self) -> usize {
        self.count(|c| matches!(c, MockCall::CancelShutdown))
    }

    /// `(title, message)` of every notification
    pub fn notifications(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Notify { title, message } => Some((title, message)),
                _ => None,
            })
            .collect()
    }

    /// Wait until the number of recorded calls reaches `n`
    pub async fn wait_for_calls(&self, n: usize) {
        loop {
            let notified = self.changed.notified();
            if self.calls().len() >= n {
                return;
            }
            notified.await;
        }
    }

    fn count(&self, pred: impl Fn(&MockCall) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: MockCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
        self.changed.notify_waiters();
    }
}

#[async_trait]
impl ShutdownExecutor for MockHost {
    async fn execute_shutdown(&self) -> HostResult<()> {
        self.record(MockCall::Shutdown);
        if *self.fail_shutdown.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(HostError::ShutdownFailed);
        }
        Ok(())
    }

    async fn cancel_os_shutdown(&self) {
        self.record(MockCall::CancelShutdown);
    }
}

#[async_trait]
impl NotificationSender for MockHost {
    async fn dispatch_notification(&self, title: &str, message: &str) {
        self.record(MockCall::Notify {
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}

/// What a [`ScriptedRunner`] does for a command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedOutcome {
    Exit(i32),
    SpawnError,
    Timeout,
}

/// Command runner that answers from a script keyed by the full command
/// line. Unscripted commands exit 0.
#[derive(Clone, Default)]
pub struct ScriptedRunner {
    script: Arc<Mutex<HashMap<String, ScriptedOutcome>>>,
    calls: Arc<Mutex<Vec<CommandSpec>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the outcome for a command line such as `"shutdown -h now"`
    pub fn on(self, command_line: &str, outcome: ScriptedOutcome) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(command_line.to_string(), outcome);
        self
    }

    /// Every command run so far
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Every command run so far, rendered as command lines
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(|c| c.to_string()).collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> HostResult<CommandOutput> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(spec.clone());

        let line = spec.to_string();
        let outcome = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&line)
            .cloned();

        match outcome {
            None => Ok(CommandOutput::with_status(ExitStatus::success())),
            Some(ScriptedOutcome::Exit(code)) => {
                Ok(CommandOutput::with_status(ExitStatus::with_code(code)))
            }
            Some(ScriptedOutcome::SpawnError) => Err(HostError::SpawnFailed {
                program: spec.program.clone(),
                message: "scripted spawn failure".into(),
            }),
            Some(ScriptedOutcome::Timeout) => Err(HostError::Timeout {
                command: line,
                timeout: Duration::from_secs(5),
            }),
        }
    }
}
