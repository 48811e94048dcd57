//! curfewd - The curfew background service
//!
//! This is the main entry point for the curfewd service.
//! It wires together all the components:
//! - Configuration loading
//! - State store
//! - Platform host adapters (shutdown, notifications)
//! - Shutdown scheduler
//! - IPC server

use anyhow::{Context, Result};
use clap::Parser;
use curfew_api::{
    Command, CommandOutcome, ErrorCode, ErrorInfo, Event, EventPayload, HealthStatus, Platform,
    Response, ResponsePayload, API_VERSION,
};
use curfew_config::{load_config, ServiceConfig};
use curfew_core::{CoreEvent, SchedulerOptions, ShutdownScheduler};
use curfew_host::PlatformHost;
use curfew_ipc::{IpcServer, ServerMessage};
use curfew_store::JsonFileStore;
use curfew_util::{default_config_path, format_datetime_full, ClientId, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// curfewd - Weekly timed shutdown service
#[derive(Parser, Debug)]
#[command(name = "curfewd")]
#[command(about = "Weekly timed shutdown service with reminders", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/curfew/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set CURFEW_SOCKET env var)
    #[arg(short, long, env = "CURFEW_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set CURFEW_DATA_DIR env var)
    #[arg(short, long, env = "CURFEW_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Start without any visible UI (accepted for autostart entries)
    #[arg(long)]
    hidden: bool,
}

/// Main service state
struct Service {
    config: ServiceConfig,
    scheduler: ShutdownScheduler,
    core_events: mpsc::UnboundedReceiver<CoreEvent>,
    platform: Platform,
    ipc: Arc<IpcServer>,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let config = load_config(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(config_path = %args.config.display(), "Configuration loaded");

        let socket_path = args
            .socket
            .clone()
            .unwrap_or_else(|| config.socket_path.clone());

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| config.data_dir.clone());

        let store = JsonFileStore::open(&data_dir)
            .with_context(|| format!("Failed to open state store in {:?}", data_dir))?;
        info!(path = %store.path().display(), "Store initialized");

        let host = PlatformHost::current(config.command_timeout);

        let (event_tx, core_events) = mpsc::unbounded_channel();
        let scheduler = ShutdownScheduler::new(
            Arc::new(store),
            host.shutdown.clone(),
            host.notifier.clone(),
            Arc::new(SystemClock),
            SchedulerOptions {
                notification_title: config.notifications.title.clone(),
                reminders_enabled: config.notifications.enabled,
            },
        )
        .with_events(event_tx);

        let mut ipc = IpcServer::new(&socket_path);
        ipc.start().await?;

        info!(socket_path = %socket_path.display(), "IPC server started");

        Ok(Self {
            config,
            scheduler,
            core_events,
            platform: host.platform,
            ipc: Arc::new(ipc),
        })
    }

    async fn run(self) -> Result<()> {
        let Service {
            config,
            mut scheduler,
            mut core_events,
            platform,
            ipc,
        } = self;

        if config.restore_on_start {
            match scheduler.restore_saved().await {
                Ok(true) => {
                    if let Some(next) = scheduler.next_shutdown() {
                        info!(next = %format_datetime_full(&next), "Saved schedule restored");
                    }
                }
                Ok(false) => debug!("Nothing to restore"),
                Err(e) => warn!(error = %e, "Saved schedule was invalid and has been cleared"),
            }
        }

        let mut ipc_messages = ipc
            .take_message_receiver()
            .await
            .context("IPC message receiver already taken")?;

        let scheduler = Arc::new(Mutex::new(scheduler));

        let ipc_accept = ipc.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        let mut sigterm = signal(SignalKind::terminate())
            .context("Failed to create SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt())
            .context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup())
            .context("Failed to create SIGHUP handler")?;

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                Some(event) = core_events.recv() => {
                    handle_core_event(&ipc, event);
                }

                Some(msg) = ipc_messages.recv() => {
                    handle_ipc_message(&scheduler, &ipc, platform, msg).await;
                }
            }
        }

        info!("Shutting down curfewd");
        ipc.broadcast_event(Event::new(EventPayload::ServiceStopping));

        {
            let mut scheduler = scheduler.lock().await;
            if config.deactivate_on_exit {
                scheduler.deactivate().await;
            } else {
                scheduler.release().await;
            }
        }

        // Forward whatever the teardown emitted
        while let Ok(event) = core_events.try_recv() {
            handle_core_event(&ipc, event);
        }

        ipc.shutdown();
        info!("Shutdown complete");
        Ok(())
    }
}

fn handle_core_event(ipc: &IpcServer, event: CoreEvent) {
    let payload = match event {
        CoreEvent::StateChanged(state) => {
            debug!(active = state.active, "Broadcasting state change");
            EventPayload::StateChanged(state)
        }
        CoreEvent::ReminderIssued { title, message } => {
            EventPayload::ReminderIssued { title, message }
        }
        CoreEvent::ShutdownStarted { time } => EventPayload::ShutdownStarted {
            time: time.to_string(),
        },
        CoreEvent::ShutdownFailed { message } => EventPayload::ShutdownFailed { message },
    };
    ipc.broadcast_event(Event::new(payload));
}

async fn handle_ipc_message(
    scheduler: &Mutex<ShutdownScheduler>,
    ipc: &IpcServer,
    platform: Platform,
    msg: ServerMessage,
) {
    match msg {
        ServerMessage::Request { client_id, request } => {
            let response = if request.api_version != API_VERSION {
                Response::error(
                    request.request_id,
                    ErrorInfo::new(
                        ErrorCode::UnsupportedVersion,
                        format!(
                            "API version {} not supported (expected {})",
                            request.api_version, API_VERSION
                        ),
                    ),
                )
            } else {
                handle_command(
                    scheduler,
                    platform,
                    &client_id,
                    request.request_id,
                    request.command,
                )
                .await
            };

            if let Err(e) = ipc.send_response(&client_id, response).await {
                debug!(client_id = %client_id, error = %e, "Failed to send response");
            }
        }

        ServerMessage::ClientConnected { client_id, info } => {
            info!(client_id = %client_id, uid = ?info.uid, "Client connected");
        }

        ServerMessage::ClientDisconnected { client_id } => {
            debug!(client_id = %client_id, "Client disconnected");
        }
    }
}

async fn handle_command(
    scheduler: &Mutex<ShutdownScheduler>,
    platform: Platform,
    client_id: &ClientId,
    request_id: u64,
    command: Command,
) -> Response {
    match command {
        Command::GetState => {
            let state = scheduler.lock().await.get_state();
            Response::success(request_id, ResponsePayload::State(state))
        }

        Command::Activate { config } => {
            let outcome = match scheduler.lock().await.activate(config).await {
                Ok(()) => CommandOutcome::ok(CommandOutcome::ACTIVATED),
                Err(e) => {
                    warn!(client_id = %client_id, error = %e, "Activation rejected");
                    CommandOutcome::activate_failed(e)
                }
            };
            Response::success(request_id, ResponsePayload::Outcome(outcome))
        }

        Command::Update { config } => {
            let outcome = match scheduler.lock().await.update(config).await {
                Ok(()) => CommandOutcome::ok(CommandOutcome::UPDATED),
                Err(e) => {
                    warn!(client_id = %client_id, error = %e, "Update rejected");
                    CommandOutcome::update_failed(e)
                }
            };
            Response::success(request_id, ResponsePayload::Outcome(outcome))
        }

        Command::Deactivate => {
            scheduler.lock().await.deactivate().await;
            Response::success(
                request_id,
                ResponsePayload::Outcome(CommandOutcome::ok(CommandOutcome::DEACTIVATED)),
            )
        }

        Command::SubscribeEvents => Response::success(
            request_id,
            ResponsePayload::Subscribed {
                client_id: client_id.clone(),
            },
        ),

        Command::UnsubscribeEvents => Response::success(request_id, ResponsePayload::Unsubscribed),

        Command::GetHealth => {
            let scheduler = scheduler.lock().await;
            let health = HealthStatus {
                live: true,
                ready: true,
                store_ok: scheduler.is_store_healthy(),
                platform,
                live_triggers: scheduler.live_trigger_count(),
            };
            Response::success(request_id, ResponsePayload::Health(health))
        }

        Command::Ping => Response::success(request_id, ResponsePayload::Pong),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        hidden = args.hidden,
        "curfewd starting"
    );
    if curfew_util::is_mock_time_active() {
        warn!("Mock time is active, schedules follow the mocked clock");
    }

    let service = Service::new(&args).await?;
    service.run().await
}
