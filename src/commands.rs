// Command handlers for the presentation layer
//
// Every command suspends the caller until the underlying store work is done
// and reports failures as user-visible text.
use serde::Serialize;
use std::path::PathBuf;

use crate::db::models::AudioEntry;
use crate::error::{LibraryError, LibraryResult};
use crate::library::scanner::DirectoryScanner;
use crate::playback::{PlaybackController, PlaybackState};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct AudioSummary {
    pub id: i64,
    pub size: usize,
    pub date_added: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NowPlaying {
    pub entry_id: i64,
    pub index: Option<usize>,
    /// Token for `resolve_handle`, valid until the selection changes
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub state: PlaybackState,
    pub now_playing: Option<NowPlaying>,
    pub position_seconds: f64,
}

#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
    pub imported: Vec<i64>,
    pub failed: Vec<(String, String)>,
}

fn to_message(err: LibraryError) -> String {
    err.to_string()
}

fn now_playing(controller: &PlaybackController) -> LibraryResult<Option<NowPlaying>> {
    let Some(handle) = controller.current_handle() else {
        return Ok(None);
    };
    Ok(Some(NowPlaying {
        entry_id: handle.entry_id(),
        index: controller.locate_current()?,
        token: handle.token().to_string(),
    }))
}

/// Run store work on the blocking pool
async fn with_store<T, F>(state: &AppState, f: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce(crate::library::AudioStore) -> LibraryResult<T> + Send + 'static,
{
    let store = state.store().map_err(to_message)?;
    tokio::task::spawn_blocking(move || f(store).map_err(to_message))
        .await
        .map_err(|e| format!("Task join error: {}", e))?
}

/// Run controller work on the blocking pool
async fn with_controller<T, F>(state: &AppState, f: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce(&mut PlaybackController) -> LibraryResult<T> + Send + 'static,
{
    let controller = state.controller().map_err(to_message)?;
    tokio::task::spawn_blocking(move || {
        let mut controller = controller.lock();
        f(&mut controller).map_err(to_message)
    })
    .await
    .map_err(|e| format!("Task join error: {}", e))?
}

// ===== Library Commands =====

pub async fn import_audio(state: &AppState, bytes: Vec<u8>) -> Result<i64, String> {
    with_store(state, move |store| store.add(&bytes)).await
}

pub async fn import_file(state: &AppState, path: PathBuf) -> Result<i64, String> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    import_audio(state, bytes).await
}

/// Import every supported audio file under `directory`. Files that fail
/// are reported and skipped.
pub async fn import_directory(state: &AppState, directory: PathBuf) -> Result<ImportReport, String> {
    let extensions = state.settings.library.supported_extensions.clone();
    let files = tokio::task::spawn_blocking(move || DirectoryScanner::scan(&directory, &extensions))
        .await
        .map_err(|e| format!("Task join error: {}", e))?
        .map_err(|e| format!("Failed to scan directory: {}", e))?;

    let mut report = ImportReport::default();
    for path in files {
        match import_file(state, path.clone()).await {
            Ok(id) => report.imported.push(id),
            Err(e) => report.failed.push((path.display().to_string(), e)),
        }
    }

    Ok(report)
}

pub async fn get_all_audio(state: &AppState) -> Result<Vec<AudioEntry>, String> {
    with_store(state, |store| store.list_all()).await
}

pub async fn list_audio(state: &AppState) -> Result<Vec<AudioSummary>, String> {
    let entries = get_all_audio(state).await?;
    Ok(entries
        .into_iter()
        .map(|entry| AudioSummary {
            id: entry.id,
            size: entry.data.len(),
            date_added: entry.date_added,
        })
        .collect())
}

pub async fn delete_audio(state: &AppState, id: i64) -> Result<bool, String> {
    with_store(state, move |store| store.delete(id)).await
}

// ===== Playback Commands =====

/// Select an entry by id. Returns `None` if no such entry exists.
pub async fn play_audio(state: &AppState, id: i64) -> Result<Option<NowPlaying>, String> {
    let store = state.store().map_err(to_message)?;
    with_controller(state, move |controller| {
        let Some(entry) = store.get(id)? else {
            return Ok(None);
        };
        let index = store
            .list_ids()?
            .iter()
            .position(|&other| other == id)
            .unwrap_or_default();
        controller.play(&entry, index)?;
        now_playing(controller)
    })
    .await
}

pub async fn next_audio(state: &AppState) -> Result<Option<NowPlaying>, String> {
    with_controller(state, |controller| {
        match controller.advance()? {
            Some(_) => now_playing(controller),
            None => Ok(None),
        }
    })
    .await
}

pub async fn audio_ended(state: &AppState) -> Result<Option<NowPlaying>, String> {
    with_controller(state, |controller| {
        match controller.on_ended()? {
            Some(_) => now_playing(controller),
            None => Ok(None),
        }
    })
    .await
}

/// Metadata of the selected entry is ready; returns the one-time seek target
pub async fn metadata_loaded(state: &AppState) -> Result<Option<f64>, String> {
    with_controller(state, |controller| Ok(controller.on_metadata_loaded())).await
}

pub async fn record_position(state: &AppState, seconds: f64) -> Result<(), String> {
    with_controller(state, move |controller| controller.record_position(seconds)).await
}

pub async fn time_update(state: &AppState, seconds: f64) -> Result<(), String> {
    with_controller(state, move |controller| controller.on_time_update(seconds)).await
}

pub async fn pause(state: &AppState) -> Result<(), String> {
    with_controller(state, |controller| controller.pause()).await
}

pub async fn resume_playback(state: &AppState) -> Result<(), String> {
    with_controller(state, |controller| {
        controller.resume();
        Ok(())
    })
    .await
}

pub async fn get_session(state: &AppState) -> Result<SessionStatus, String> {
    with_controller(state, |controller| {
        Ok(SessionStatus {
            state: controller.state(),
            now_playing: now_playing(controller)?,
            position_seconds: controller.session().playback_position_seconds,
        })
    })
    .await
}

/// Bytes behind a live handle token
pub async fn resolve_handle(state: &AppState, token: String) -> Result<Option<Vec<u8>>, String> {
    with_controller(state, move |controller| {
        Ok(controller.registry().resolve(&token).map(|bytes| bytes.to_vec()))
    })
    .await
}
