//! Platform selection

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use curfew_api::Platform;
use curfew_host_api::{CommandRunner, NotificationSender, ShutdownExecutor};

use crate::{
    LinuxNotifier, LinuxShutdown, MacosNotifier, MacosShutdown, SystemRunner, WindowsNotifier,
    WindowsShutdown,
};

/// Shutdown executor and notifier for one platform
#[derive(Clone)]
pub struct PlatformHost {
    pub platform: Platform,
    pub shutdown: Arc<dyn ShutdownExecutor>,
    pub notifier: Arc<dyn NotificationSender>,
}

impl PlatformHost {
    /// Build the adapters for `platform`, all sharing `runner`
    pub fn new(platform: Platform, runner: Arc<dyn CommandRunner>) -> Self {
        let (shutdown, notifier): (Arc<dyn ShutdownExecutor>, Arc<dyn NotificationSender>) =
            match platform {
                Platform::Linux => (
                    Arc::new(LinuxShutdown::new(runner.clone())),
                    Arc::new(LinuxNotifier::new(runner)),
                ),
                Platform::Macos => (
                    Arc::new(MacosShutdown::new(runner.clone())),
                    Arc::new(MacosNotifier::new(runner)),
                ),
                Platform::Windows => (
                    Arc::new(WindowsShutdown::new(runner.clone())),
                    Arc::new(WindowsNotifier::new(runner)),
                ),
            };

        Self {
            platform,
            shutdown,
            notifier,
        }
    }

    /// Adapters for the running OS, invoking real commands
    pub fn current(command_timeout: Duration) -> Self {
        let platform = Platform::current();
        info!(?platform, timeout = ?command_timeout, "Host adapters selected");
        Self::new(platform, Arc::new(SystemRunner::new(command_timeout)))
    }
}
