// Application state management
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::warn;

use crate::error::{LibraryError, LibraryResult};
use crate::library::AudioStore;
use crate::playback::PlaybackController;
use crate::session::SessionStore;
use crate::settings::AppSettings;

pub struct AppState {
    pub app_dir: PathBuf,
    pub settings: AppSettings,
    // The first open result is kept for the process lifetime, failures
    // included, so a broken store is reported the same way every time.
    store: OnceCell<Result<AudioStore, LibraryError>>,
    controller: OnceCell<Arc<Mutex<PlaybackController>>>,
}

impl AppState {
    pub fn new(app_dir: PathBuf, settings: AppSettings) -> Self {
        Self {
            app_dir,
            settings,
            store: OnceCell::new(),
            controller: OnceCell::new(),
        }
    }

    /// State for `app_dir`, reading its settings file when present
    pub fn load(app_dir: &Path) -> Result<Self, String> {
        let settings = AppSettings::load(app_dir)?;
        Ok(Self::new(app_dir.to_path_buf(), settings))
    }

    /// The audio store, opened on first use
    pub fn store(&self) -> LibraryResult<AudioStore> {
        self.store
            .get_or_init(|| AudioStore::open(&self.settings.database_path(&self.app_dir)))
            .clone()
    }

    /// The playback controller, created on first use with the previous
    /// session restored
    pub fn controller(&self) -> LibraryResult<Arc<Mutex<PlaybackController>>> {
        self.controller
            .get_or_try_init(|| {
                let mut controller = PlaybackController::new(
                    self.store()?,
                    SessionStore::in_dir(&self.app_dir),
                    &self.settings.playback,
                );
                if let Err(e) = controller.resume_if_available() {
                    warn!("Could not restore previous session: {}", e);
                }
                Ok(Arc::new(Mutex::new(controller)))
            })
            .cloned()
    }
}
