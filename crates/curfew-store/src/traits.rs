//! Store trait definitions

use curfew_api::ScheduleState;

use crate::StoreResult;

/// Persistence for the single schedule record
pub trait StateStore: Send + Sync {
    /// Load the persisted record. `Ok(None)` when nothing has been written yet.
    fn load_state(&self) -> StoreResult<Option<ScheduleState>>;

    /// Overwrite the persisted record
    fn save_state(&self, state: &ScheduleState) -> StoreResult<()>;

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
