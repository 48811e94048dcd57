//! Core scheduling engine for curfewd
//!
//! This crate is the heart of curfewd, containing:
//! - The shutdown scheduler state machine (Inactive <-> Active)
//! - Weekly wall-clock triggers with a hard stop guarantee
//! - Reminder message computation
//! - Core events consumed by the service loop

mod clock;
mod error;
mod events;
mod reminder;
mod scheduler;
mod trigger;

pub use clock::*;
pub use error::*;
pub use events::*;
pub use reminder::*;
pub use scheduler::*;
pub use trigger::*;
