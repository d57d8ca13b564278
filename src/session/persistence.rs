// Session persistence - one JSON record written with temp file + rename
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::state::{SessionState, SESSION_VERSION};
use crate::error::{LibraryError, LibraryResult};

/// File-backed store for the playback session record
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Session store at the conventional location inside `app_dir`
    pub fn in_dir(app_dir: &Path) -> Self {
        Self::new(app_dir.join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted record. A missing, unreadable or incompatible
    /// file means there is nothing to resume.
    pub fn load(&self) -> SessionState {
        if !self.path.exists() {
            debug!("No session file at {:?}", self.path);
            return SessionState::default();
        }

        let parsed = fs::read_to_string(&self.path)
            .map_err(|e| e.to_string())
            .and_then(|content| {
                serde_json::from_str::<SessionState>(&content).map_err(|e| e.to_string())
            });

        match parsed {
            Ok(state) if state.version == SESSION_VERSION => state,
            Ok(state) => {
                warn!(
                    "Ignoring session record with unsupported version {}",
                    state.version
                );
                SessionState::default()
            }
            Err(e) => {
                warn!("Ignoring unreadable session file {:?}: {}", self.path, e);
                SessionState::default()
            }
        }
    }

    /// Persist the whole record atomically
    pub fn save(&self, state: &SessionState) -> LibraryResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| LibraryError::SessionPersistence(e.to_string()))?;
        }

        let content = serde_json::to_string(state)
            .map_err(|e| LibraryError::SessionPersistence(e.to_string()))?;

        let temp_path = self.path.with_extension("tmp");

        {
            let mut file = File::create(&temp_path).map_err(|e| {
                LibraryError::SessionPersistence(format!("Failed to create temp file: {}", e))
            })?;
            file.write_all(content.as_bytes()).map_err(|e| {
                LibraryError::SessionPersistence(format!("Failed to write: {}", e))
            })?;
            file.sync_all().map_err(|e| {
                LibraryError::SessionPersistence(format!("Failed to sync: {}", e))
            })?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            LibraryError::SessionPersistence(format!("Failed to rename: {}", e))
        })?;

        debug!(
            "Saved session: entry {:?} at {:.3}s",
            state.current_entry_id, state.playback_position_seconds
        );
        Ok(())
    }
}
