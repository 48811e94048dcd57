//! Process invocation

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use curfew_host_api::{CommandOutput, CommandRunner, CommandSpec, ExitStatus, HostError, HostResult};

/// Runs commands with tokio, killing any that outlive the timeout
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> HostResult<CommandOutput> {
        debug!(command = %spec, "Running command");

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(HostError::SpawnFailed {
                    program: spec.program.clone(),
                    message: e.to_string(),
                });
            }
            Err(_) => {
                return Err(HostError::Timeout {
                    command: spec.to_string(),
                    timeout: self.timeout,
                });
            }
        };

        let status = convert_status(output.status);
        debug!(command = %spec, status = %status, "Command finished");

        Ok(CommandOutput {
            status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

fn convert_status(status: std::process::ExitStatus) -> ExitStatus {
    if let Some(code) = status.code() {
        return ExitStatus::with_code(code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return ExitStatus::signaled(signal);
        }
    }

    ExitStatus {
        code: None,
        signal: None,
    }
}
