//! JSON file store

use curfew_api::ScheduleState;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::{StateStore, StoreResult};

/// File name of the persisted record inside the data directory
pub const STATE_FILE_NAME: &str = "shutdown-state.json";

/// Stores the schedule as a pretty-printed JSON document.
///
/// Writes go to a temp file in the same directory and are renamed over the
/// target, so readers never observe a half-written record.
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes writers within the process
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open a store rooted at `data_dir`, creating the directory if needed
    pub fn open(data_dir: impl AsRef<Path>) -> StoreResult<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join(STATE_FILE_NAME);
        debug!(path = %path.display(), "State store opened");
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Full path of the state document
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_file_name(format!(".{}.tmp", STATE_FILE_NAME))
    }
}

impl StateStore for JsonFileStore {
    fn load_state(&self) -> StoreResult<Option<ScheduleState>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let state: ScheduleState = serde_json::from_str(&content)?;
        Ok(Some(state))
    }

    fn save_state(&self, state: &ScheduleState) -> StoreResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let json = serde_json::to_string_pretty(state)?;
        let tmp_path = self.temp_path();
        std::fs::write(&tmp_path, json.as_bytes())?;

        if let Ok(file) = std::fs::File::open(&tmp_path) {
            if let Err(e) = file.sync_all() {
                warn!(error = %e, "Failed to sync state file");
            }
        }

        std::fs::rename(&tmp_path, &self.path)?;
        debug!(active = state.active, "State saved");
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        self.path.parent().map(|dir| dir.is_dir()).unwrap_or(false)
    }
}
