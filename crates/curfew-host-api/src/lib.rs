//! Host capability traits for curfewd
//!
//! This crate defines the interface between the scheduling core and the
//! platform-specific code that powers the machine off and shows
//! notifications. It contains no platform code itself.

mod command;
mod mock;
mod traits;

pub use command::*;
pub use mock::*;
pub use traits::*;
