//! Protocol types for curfewd IPC
//!
//! This crate defines the stable API between curfewd and clients:
//! - Schedule configuration and the persisted schedule record
//! - Commands (requests from clients)
//! - Responses
//! - Events (service -> clients)
//! - Versioning

mod commands;
mod events;
mod types;

pub use commands::*;
pub use events::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
