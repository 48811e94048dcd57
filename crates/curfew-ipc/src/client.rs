//! IPC client implementation

use curfew_api::{Command, Event, Request, Response, ResponseResult};
use std::collections::VecDeque;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::debug;

use crate::{IpcError, IpcResult};

/// IPC Client for connecting to curfewd
pub struct IpcClient {
    reader: BufReader<tokio::net::unix::OwnedReadHalf>,
    writer: tokio::net::unix::OwnedWriteHalf,
    next_request_id: u64,
    // Events that arrived while waiting for a response
    pending_events: VecDeque<Event>,
}

impl IpcClient {
    /// Connect to curfewd
    pub async fn connect(socket_path: impl AsRef<Path>) -> IpcResult<Self> {
        let stream = UnixStream::connect(socket_path).await?;
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            next_request_id: 1,
            pending_events: VecDeque::new(),
        })
    }

    /// Send a command and wait for response
    pub async fn send(&mut self, command: Command) -> IpcResult<Response> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let request = Request::new(request_id, command);
        let mut json = serde_json::to_string(&request)?;
        json.push('\n');

        self.writer.write_all(json.as_bytes()).await?;

        loop {
            let line = read_message(&mut self.reader).await?;

            if let Ok(response) = serde_json::from_str::<Response>(&line) {
                if response.request_id == request_id {
                    return Ok(response);
                }
                debug!(request_id = response.request_id, "Skipping stale response");
                continue;
            }

            match serde_json::from_str::<Event>(&line) {
                Ok(event) => self.pending_events.push_back(event),
                Err(_) => return Err(IpcError::InvalidMessage(line)),
            }
        }
    }

    /// Subscribe to events and consume this client to return an event stream
    pub async fn subscribe(mut self) -> IpcResult<EventStream> {
        let response = self.send(Command::SubscribeEvents).await?;

        if let ResponseResult::Err(e) = response.result {
            return Err(IpcError::ServerError(e.message));
        }

        Ok(EventStream {
            reader: self.reader,
            pending: self.pending_events,
            _writer: self.writer,
        })
    }
}

/// Stream of events from curfewd
pub struct EventStream {
    reader: BufReader<tokio::net::unix::OwnedReadHalf>,
    pending: VecDeque<Event>,
    // Kept so the server does not see a half-closed connection
    _writer: tokio::net::unix::OwnedWriteHalf,
}

impl EventStream {
    /// Wait for the next event
    pub async fn next(&mut self) -> IpcResult<Event> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(event);
        }

        let line = read_message(&mut self.reader).await?;
        let event: Event = serde_json::from_str(&line)?;
        Ok(event)
    }
}

async fn read_message(reader: &mut BufReader<tokio::net::unix::OwnedReadHalf>) -> IpcResult<String> {
    let mut line = String::new();
    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(IpcError::ConnectionClosed);
        }
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }
}

// Client round trips are exercised by the server tests
