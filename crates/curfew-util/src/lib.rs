//! Shared utilities for curfew
//!
//! This crate provides:
//! - ID types (ClientId)
//! - Time utilities (wall-clock time of day, weekday masks, clocks)
//! - Error types
//! - Default paths for socket, data, and config locations

mod error;
mod ids;
mod paths;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
