//! curfewctl - Command-line client for curfewd
//!
//! Talks to the service over its Unix socket. Mutating commands print the
//! service's `{success, message}` outcome and exit non-zero on failure.

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use curfew_api::{
    Command, CommandOutcome, Event, EventPayload, HealthStatus, ResponsePayload, ResponseResult,
    ScheduleConfig, ScheduleState,
};
use curfew_ipc::IpcClient;
use curfew_util::{default_socket_path, format_clock_time};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// curfewctl - Control the weekly shutdown schedule
#[derive(Parser, Debug)]
#[command(name = "curfewctl")]
#[command(about = "Control the curfewd weekly shutdown schedule", long_about = None)]
struct Args {
    /// Socket path for curfewd connection (or set CURFEW_SOCKET env var)
    #[arg(short, long, env = "CURFEW_SOCKET")]
    socket: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: CtlCommand,
}

#[derive(Subcommand, Debug)]
enum CtlCommand {
    /// Show the saved schedule
    Status,
    /// Schedule a weekly shutdown, replacing any existing schedule
    Activate(ScheduleArgs),
    /// Change the active schedule
    Update(ScheduleArgs),
    /// Cancel the schedule
    Deactivate,
    /// Print events (state changes, reminders, shutdowns) as they happen
    Watch,
    /// Show service health
    Health,
    /// Check that the service is reachable
    Ping,
}

#[derive(ClapArgs, Debug)]
struct ScheduleArgs {
    /// Shutdown time, HH:MM (24-hour)
    #[arg(short, long)]
    time: String,

    /// Day of the week; repeat for several days
    #[arg(short, long = "day", required = true)]
    days: Vec<String>,

    /// Reminder time, HH:MM; repeat for several reminders
    #[arg(short, long = "reminder")]
    reminders: Vec<String>,
}

impl ScheduleArgs {
    fn into_config(self) -> ScheduleConfig {
        ScheduleConfig {
            time: Some(self.time),
            days: Some(self.days),
            reminders: Some(self.reminders),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let socket_path = args.socket.unwrap_or_else(default_socket_path);
    debug!(socket_path = %socket_path.display(), "Connecting to curfewd");

    let mut client = IpcClient::connect(&socket_path)
        .await
        .with_context(|| format!("Failed to connect to curfewd at {:?}", socket_path))?;

    let command = match args.command {
        CtlCommand::Status => Command::GetState,
        CtlCommand::Activate(schedule) => Command::Activate {
            config: schedule.into_config(),
        },
        CtlCommand::Update(schedule) => Command::Update {
            config: schedule.into_config(),
        },
        CtlCommand::Deactivate => Command::Deactivate,
        CtlCommand::Health => Command::GetHealth,
        CtlCommand::Ping => Command::Ping,
        CtlCommand::Watch => return watch(client).await,
    };

    let response = client.send(command).await.context("Request failed")?;
    let payload = match response.result {
        ResponseResult::Ok(payload) => payload,
        ResponseResult::Err(e) => bail!("curfewd rejected the request ({:?}): {}", e.code, e.message),
    };

    match payload {
        ResponsePayload::State(state) => println!("{}", describe_state(&state)),
        ResponsePayload::Outcome(outcome) => report_outcome(&outcome)?,
        ResponsePayload::Health(health) => println!("{}", describe_health(&health)),
        ResponsePayload::Pong => println!("pong"),
        other => debug!(?other, "Unexpected response"),
    }

    Ok(())
}

async fn watch(client: IpcClient) -> Result<()> {
    let mut events = client
        .subscribe()
        .await
        .context("Failed to subscribe to events")?;

    loop {
        let event = events.next().await.context("Event stream ended")?;
        let stopping = matches!(event.payload, EventPayload::ServiceStopping);
        println!("{}", describe_event(&event));
        if stopping {
            return Ok(());
        }
    }
}

fn report_outcome(outcome: &CommandOutcome) -> Result<()> {
    if outcome.success {
        println!("{}", outcome.message);
        Ok(())
    } else {
        bail!("{}", outcome.message)
    }
}

fn describe_state(state: &ScheduleState) -> String {
    if !state.active {
        return "Shutdown schedule: inactive".to_string();
    }

    let mut text = format!(
        "Shutdown schedule: active\n  time: {}\n  days: {}",
        state.time.as_deref().unwrap_or("?"),
        state.days.as_deref().unwrap_or_default().join(", ")
    );
    let reminders = state.reminders.as_deref().unwrap_or_default();
    if reminders.is_empty() {
        text.push_str("\n  reminders: none");
    } else {
        text.push_str(&format!("\n  reminders: {}", reminders.join(", ")));
    }
    text
}

fn describe_health(health: &HealthStatus) -> String {
    format!(
        "live: {}\nready: {}\nstore: {}\nplatform: {:?}\ntriggers: {}",
        health.live,
        health.ready,
        if health.store_ok { "ok" } else { "failing" },
        health.platform,
        health.live_triggers
    )
}

fn describe_event(event: &Event) -> String {
    let at = format_clock_time(&event.timestamp);
    let what = match &event.payload {
        EventPayload::StateChanged(state) => {
            if state.active {
                format!(
                    "schedule set: {} on {}",
                    state.time.as_deref().unwrap_or("?"),
                    state.days.as_deref().unwrap_or_default().join(", ")
                )
            } else {
                "schedule cleared".to_string()
            }
        }
        EventPayload::ReminderIssued { title, message } => format!("{}: {}", title, message),
        EventPayload::ShutdownStarted { time } => format!("shutting down (scheduled {})", time),
        EventPayload::ShutdownFailed { message } => format!("shutdown failed: {}", message),
        EventPayload::ServiceStopping => "curfewd is stopping".to_string(),
    };
    format!("[{}] {}", at, what)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_inactive_state() {
        assert_eq!(
            describe_state(&ScheduleState::inactive()),
            "Shutdown schedule: inactive"
        );
    }

    #[test]
    fn test_describe_active_state() {
        let state = ScheduleState::active(
            "22:00".into(),
            vec!["monday".into(), "friday".into()],
            Some(vec!["21:30".into()]),
        );
        assert_eq!(
            describe_state(&state),
            "Shutdown schedule: active\n  time: 22:00\n  days: monday, friday\n  reminders: 21:30"
        );
    }

    #[test]
    fn test_schedule_args_keep_input() {
        let args = Args::try_parse_from([
            "curfewctl",
            "activate",
            "--time",
            "22:00",
            "--day",
            "Monday",
            "--day",
            "wednesday",
            "--reminder",
            "21:45",
        ])
        .unwrap();

        let CtlCommand::Activate(schedule) = args.command else {
            panic!("expected activate");
        };
        assert_eq!(
            schedule.into_config(),
            ScheduleConfig::new("22:00", &["Monday", "wednesday"]).with_reminders(&["21:45"])
        );
    }

    #[test]
    fn test_activate_requires_a_day() {
        assert!(Args::try_parse_from(["curfewctl", "activate", "--time", "22:00"]).is_err());
    }

    #[test]
    fn test_failed_outcome_is_an_error() {
        let err = report_outcome(&CommandOutcome::failed("Failed to activate: Invalid time format"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to activate: Invalid time format");
        assert!(report_outcome(&CommandOutcome::ok(CommandOutcome::DEACTIVATED)).is_ok());
    }

    #[test]
    fn test_describe_reminder_event() {
        let event = Event::new(EventPayload::ReminderIssued {
            title: "Shutdown Reminder".into(),
            message: "System will shut down today at 22:00 (in 15 minutes)".into(),
        });
        assert!(describe_event(&event).ends_with(
            "Shutdown Reminder: System will shut down today at 22:00 (in 15 minutes)"
        ));
    }
}
