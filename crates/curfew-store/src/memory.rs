//! In-memory store

use curfew_api::ScheduleState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::{StateStore, StoreError, StoreResult};

/// Keeps the record in memory. Writes can be made to fail for testing
/// error paths.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<Option<ScheduleState>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing record
    pub fn with_state(state: ScheduleState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl StateStore for MemoryStore {
    fn load_state(&self) -> StoreResult<Option<ScheduleState>> {
        Ok(self.state.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save_state(&self, state: &ScheduleState) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("write disabled")));
        }
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = Some(state.clone());
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        !self.fail_writes.load(Ordering::SeqCst)
    }
}
