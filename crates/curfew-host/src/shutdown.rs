//! OS shutdown executors

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

use curfew_host_api::{CommandRunner, CommandSpec, HostError, HostResult, ShutdownExecutor};

async fn cancel_best_effort(runner: &dyn CommandRunner, spec: CommandSpec) {
    match runner.run_checked(&spec).await {
        Ok(_) => info!(command = %spec, "Cancelled pending OS shutdown"),
        // Usually means nothing was pending
        Err(e) => warn!(command = %spec, error = %e, "Shutdown cancel failed"),
    }
}

/// Linux: plain `shutdown`, then a non-interactive sudo retry
pub struct LinuxShutdown {
    runner: Arc<dyn CommandRunner>,
}

impl LinuxShutdown {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ShutdownExecutor for LinuxShutdown {
    async fn execute_shutdown(&self) -> HostResult<()> {
        let direct = CommandSpec::from_line("shutdown -h now");
        let err = match self.runner.run_checked(&direct).await {
            Ok(_) => {
                info!(command = %direct, "Shutdown initiated");
                return Ok(());
            }
            Err(e) => e,
        };
        warn!(command = %direct, error = %err, "Shutdown failed, retrying with sudo");

        let elevated = CommandSpec::from_line("sudo -n shutdown -h now");
        match self.runner.run_checked(&elevated).await {
            Ok(_) => {
                info!(command = %elevated, "Shutdown initiated");
                Ok(())
            }
            Err(e) => {
                error!(command = %elevated, error = %e, "Shutdown failed");
                Err(HostError::ShutdownFailed)
            }
        }
    }

    async fn cancel_os_shutdown(&self) {
        cancel_best_effort(self.runner.as_ref(), CommandSpec::from_line("shutdown -c")).await;
    }
}

/// macOS: `shutdown` always needs root, so only the sudo form is tried
pub struct MacosShutdown {
    runner: Arc<dyn CommandRunner>,
}

impl MacosShutdown {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ShutdownExecutor for MacosShutdown {
    async fn execute_shutdown(&self) -> HostResult<()> {
        let spec = CommandSpec::from_line("sudo -n shutdown -h now");
        match self.runner.run_checked(&spec).await {
            Ok(_) => {
                info!(command = %spec, "Shutdown initiated");
                Ok(())
            }
            Err(e) => {
                error!(command = %spec, error = %e, "Shutdown failed");
                Err(HostError::ShutdownFailed)
            }
        }
    }

    async fn cancel_os_shutdown(&self) {
        cancel_best_effort(
            self.runner.as_ref(),
            CommandSpec::from_line("sudo -n killall shutdown"),
        )
        .await;
    }
}

/// Windows: `shutdown.exe` with a zero delay
pub struct WindowsShutdown {
    runner: Arc<dyn CommandRunner>,
}

impl WindowsShutdown {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ShutdownExecutor for WindowsShutdown {
    async fn execute_shutdown(&self) -> HostResult<()> {
        let spec = CommandSpec::from_line("shutdown /s /t 0");
        match self.runner.run_checked(&spec).await {
            Ok(_) => {
                info!(command = %spec, "Shutdown initiated");
                Ok(())
            }
            Err(e) => {
                error!(command = %spec, error = %e, "Shutdown failed");
                Err(HostError::ShutdownFailed)
            }
        }
    }

    async fn cancel_os_shutdown(&self) {
        cancel_best_effort(self.runner.as_ref(), CommandSpec::from_line("shutdown /a")).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curfew_host_api::{ScriptedOutcome, ScriptedRunner};

    #[tokio::test]
    async fn linux_succeeds_without_sudo() {
        let runner = ScriptedRunner::new();
        let exec = LinuxShutdown::new(Arc::new(runner.clone()));

        exec.execute_shutdown().await.unwrap();
        assert_eq!(runner.command_lines(), vec!["shutdown -h now"]);
    }

    #[tokio::test]
    async fn linux_falls_back_to_sudo() {
        let runner = ScriptedRunner::new().on("shutdown -h now", ScriptedOutcome::Exit(1));
        let exec = LinuxShutdown::new(Arc::new(runner.clone()));

        exec.execute_shutdown().await.unwrap();
        assert_eq!(
            runner.command_lines(),
            vec!["shutdown -h now", "sudo -n shutdown -h now"]
        );
    }

    #[tokio::test]
    async fn linux_reports_hint_when_both_fail() {
        let runner = ScriptedRunner::new()
            .on("shutdown -h now", ScriptedOutcome::Timeout)
            .on("sudo -n shutdown -h now", ScriptedOutcome::Exit(1));
        let exec = LinuxShutdown::new(Arc::new(runner));

        let err = exec.execute_shutdown().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Shutdown failed. You may need to configure passwordless sudo for shutdown command."
        );
    }

    #[tokio::test]
    async fn macos_uses_sudo_directly() {
        let runner = ScriptedRunner::new();
        let exec = MacosShutdown::new(Arc::new(runner.clone()));

        exec.execute_shutdown().await.unwrap();
        assert_eq!(runner.command_lines(), vec!["sudo -n shutdown -h now"]);
    }

    #[tokio::test]
    async fn windows_has_no_fallback() {
        let runner = ScriptedRunner::new().on("shutdown /s /t 0", ScriptedOutcome::SpawnError);
        let exec = WindowsShutdown::new(Arc::new(runner.clone()));

        assert!(matches!(
            exec.execute_shutdown().await,
            Err(HostError::ShutdownFailed)
        ));
        assert_eq!(runner.command_lines(), vec!["shutdown /s /t 0"]);
    }

    #[tokio::test]
    async fn cancel_failures_are_swallowed() {
        let runner = ScriptedRunner::new()
            .on("shutdown -c", ScriptedOutcome::Exit(1))
            .on("sudo -n killall shutdown", ScriptedOutcome::SpawnError)
            .on("shutdown /a", ScriptedOutcome::Timeout);
        let shared: Arc<dyn CommandRunner> = Arc::new(runner.clone());

        LinuxShutdown::new(shared.clone()).cancel_os_shutdown().await;
        MacosShutdown::new(shared.clone()).cancel_os_shutdown().await;
        WindowsShutdown::new(shared).cancel_os_shutdown().await;

        assert_eq!(
            runner.command_lines(),
            vec!["shutdown -c", "sudo -n killall shutdown", "shutdown /a"]
        );
    }
}
