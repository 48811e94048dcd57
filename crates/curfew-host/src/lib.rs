//! Platform host adapters for curfewd
//!
//! Provides:
//! - A tokio-based command runner with a bounded timeout
//! - Shutdown executors for Linux, macOS and Windows
//! - Notification senders for Linux, macOS and Windows
//! - Platform selection

mod notify;
mod platform;
mod process;
mod shutdown;

pub use notify::*;
pub use platform::*;
pub use process::*;
pub use shutdown::*;
