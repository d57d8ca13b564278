// Playback session controller
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::handle::{HandleRegistry, TransientHandle};
use crate::db::models::AudioEntry;
use crate::error::LibraryResult;
use crate::library::AudioStore;
use crate::session::state::sanitize_position;
use crate::session::{SessionState, SessionStore};
use crate::settings::PlaybackSettings;

/// Where the session is in its lifecycle.
///
/// `Idle` only exists before anything has been selected. `Ended` always
/// moves on to the next entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    Selected,
    Playing,
    Paused,
    Ended,
}

/// Tracks the selected entry, its resumable offset and circular advance
pub struct PlaybackController {
    store: AudioStore,
    sessions: SessionStore,
    registry: HandleRegistry,
    save_interval: Duration,
    state: PlaybackState,
    /// In-memory copy of the persisted record; the position may run ahead
    /// of disk between throttled saves
    session: SessionState,
    dirty: bool,
    last_saved: Option<Instant>,
    current_index: Option<usize>,
    current_handle: Option<TransientHandle>,
    pending_seek: Option<f64>,
}

impl PlaybackController {
    pub fn new(store: AudioStore, sessions: SessionStore, settings: &PlaybackSettings) -> Self {
        let session = sessions.load();
        Self {
            store,
            sessions,
            registry: HandleRegistry::new(),
            save_interval: Duration::from_millis(settings.position_save_interval_ms),
            state: PlaybackState::Idle,
            session,
            dirty: false,
            last_saved: None,
            current_index: None,
            current_handle: None,
            pending_seek: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn current_entry_id(&self) -> Option<i64> {
        self.current_handle.as_ref().map(TransientHandle::entry_id)
    }

    /// Index of the current entry at the time it was selected
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Index of the current entry in today's library order. Differs from
    /// `current_index` once earlier entries are deleted.
    pub fn locate_current(&self) -> LibraryResult<Option<usize>> {
        let Some(id) = self.current_entry_id() else {
            return Ok(None);
        };
        Ok(self.store.list_ids()?.iter().position(|&other| other == id))
    }

    pub fn current_handle(&self) -> Option<&TransientHandle> {
        self.current_handle.as_ref()
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    /// Produce a playable handle for an entry. The caller owns it; dropping
    /// it revokes the token.
    pub fn derive_playable_handle(&self, entry: &AudioEntry) -> TransientHandle {
        self.registry.derive(entry)
    }

    /// Select `entry` (at `index` in list order) for playback.
    ///
    /// The reference is on disk when this returns. Re-selecting the
    /// remembered entry keeps its offset as the pending seek; any other
    /// entry starts from zero.
    pub fn play(&mut self, entry: &AudioEntry, index: usize) -> LibraryResult<&TransientHandle> {
        let resumed = self.session.current_entry_id == Some(entry.id);
        self.select(entry, index, resumed)
    }

    fn select(
        &mut self,
        entry: &AudioEntry,
        index: usize,
        resumed: bool,
    ) -> LibraryResult<&TransientHandle> {
        let mut next = self.session.clone();
        if !resumed {
            next.current_entry_id = Some(entry.id);
            next.playback_position_seconds = 0.0;
        }
        self.sessions.save(&next)?;
        self.session = next;
        self.dirty = false;
        self.last_saved = Some(Instant::now());

        self.pending_seek = if resumed {
            self.session.resume_position()
        } else {
            None
        };

        // Release the superseded handle before handing out a new one
        self.current_handle = None;
        let handle = self.registry.derive(entry);
        self.current_index = Some(index);
        self.state = PlaybackState::Selected;

        info!(
            "Selected entry {} at index {} (resume at {:?})",
            entry.id, index, self.pending_seek
        );
        Ok(self.current_handle.insert(handle))
    }

    /// The selected entry's metadata is available. Returns the offset to
    /// seek to, at most once per selection.
    pub fn on_metadata_loaded(&mut self) -> Option<f64> {
        if self.state == PlaybackState::Selected {
            self.state = PlaybackState::Playing;
        }
        let seek = self.pending_seek.take();
        if let Some(seconds) = seek {
            debug!("Applying resume seek to {:.3}s", seconds);
        }
        seek
    }

    /// Persist a playback offset now. Last write wins; seeks backwards are
    /// fine.
    pub fn record_position(&mut self, seconds: f64) -> LibraryResult<()> {
        if !self.set_position(seconds) {
            return Ok(());
        }
        self.save_session(Instant::now())
    }

    /// Periodic position report while playing. Saved at most once per
    /// configured interval.
    pub fn on_time_update(&mut self, seconds: f64) -> LibraryResult<()> {
        self.on_time_update_at(seconds, Instant::now())
    }

    pub(crate) fn on_time_update_at(&mut self, seconds: f64, now: Instant) -> LibraryResult<()> {
        if !self.set_position(seconds) {
            return Ok(());
        }
        let due = self
            .last_saved
            .map_or(true, |last| now.saturating_duration_since(last) >= self.save_interval);
        if due {
            self.save_session(now)?;
        }
        Ok(())
    }

    /// Write out any position held back by the throttle
    pub fn flush(&mut self) -> LibraryResult<()> {
        if self.dirty {
            self.save_session(Instant::now())?;
        }
        Ok(())
    }

    pub fn pause(&mut self) -> LibraryResult<()> {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
        self.flush()
    }

    /// Start or continue playback of the selected entry
    pub fn resume(&mut self) {
        if matches!(self.state, PlaybackState::Paused | PlaybackState::Selected) {
            self.state = PlaybackState::Playing;
        }
    }

    /// Restore the persisted session on start. Returns the entry that was
    /// playing, or `None` when there is nothing to resume. The stored offset
    /// is applied later by `on_metadata_loaded`.
    pub fn resume_if_available(&mut self) -> LibraryResult<Option<AudioEntry>> {
        self.session = self.sessions.load();
        self.dirty = false;

        let Some(id) = self.session.current_entry_id else {
            debug!("No previous session to resume");
            return Ok(None);
        };

        let Some(entry) = self.store.get(id)? else {
            warn!("Remembered entry {} no longer exists, nothing to resume", id);
            self.session = SessionState::default();
            return Ok(None);
        };

        let index = self.store.list_ids()?.iter().position(|&other| other == id);

        self.current_handle = Some(self.registry.derive(&entry));
        self.current_index = index;
        self.pending_seek = self.session.resume_position();
        self.state = PlaybackState::Selected;

        info!("Resuming entry {} (seek {:?})", id, self.pending_seek);
        Ok(Some(entry))
    }

    /// Select the entry after the current one, wrapping to the first.
    /// Does nothing on an empty library.
    pub fn advance(&mut self) -> LibraryResult<Option<AudioEntry>> {
        let ids = self.store.list_ids()?;
        if ids.is_empty() {
            debug!("Advance requested on an empty library");
            return Ok(None);
        }

        // The first id after the current one is its successor even when
        // the current entry has since been deleted
        let next_index = match self.session.current_entry_id {
            Some(current) => ids.iter().position(|&id| id > current).unwrap_or(0),
            None => 0,
        };

        let Some(entry) = self.store.get(ids[next_index])? else {
            warn!("Entry {} vanished during advance", ids[next_index]);
            return Ok(None);
        };

        // A new pass over an entry starts from the beginning, even when
        // the library holds a single entry
        self.select(&entry, next_index, false)?;
        Ok(Some(entry))
    }

    /// Natural end of the current entry.
    ///
    /// If the library has become empty there is nothing to move on to and
    /// the controller stays `Ended`. A failed advance leaves the previous
    /// state and handle in place.
    pub fn on_ended(&mut self) -> LibraryResult<Option<AudioEntry>> {
        let previous = self.state;
        self.state = PlaybackState::Ended;
        match self.advance() {
            Ok(Some(entry)) => Ok(Some(entry)),
            Ok(None) => {
                self.current_handle = None;
                Ok(None)
            }
            Err(e) => {
                self.state = previous;
                Err(e)
            }
        }
    }

    fn set_position(&mut self, seconds: f64) -> bool {
        let Some(seconds) = sanitize_position(seconds) else {
            warn!("Ignoring invalid playback position {}", seconds);
            return false;
        };
        if self.session.current_entry_id.is_none() {
            debug!("Position reported with nothing selected");
            return false;
        }
        self.session.playback_position_seconds = seconds;
        self.dirty = true;
        true
    }

    fn save_session(&mut self, now: Instant) -> LibraryResult<()> {
        self.sessions.save(&self.session)?;
        self.dirty = false;
        self.last_saved = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        store: AudioStore,
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let store = AudioStore::open(&dir.path().join("audio.db")).unwrap();
            Self { store, dir }
        }

        fn with_entries(payloads: &[&[u8]]) -> Self {
            let fixture = Self::new();
            for payload in payloads {
                fixture.store.add(payload).unwrap();
            }
            fixture
        }

        /// A controller as a fresh process would build it
        fn controller(&self) -> PlaybackController {
            PlaybackController::new(
                self.store.clone(),
                SessionStore::in_dir(self.dir.path()),
                &PlaybackSettings::default(),
            )
        }

        fn entry(&self, id: i64) -> AudioEntry {
            self.store.get(id).unwrap().unwrap()
        }
    }

    #[test]
    fn test_two_entry_scenario_wraps() {
        let fixture = Fixture::with_entries(&[&[0x01, 0x02], &[0x03, 0x04]]);
        let mut controller = fixture.controller();

        let handle = controller.play(&fixture.entry(1), 0).unwrap();
        assert_eq!(handle.bytes(), &[0x01, 0x02]);

        let next = controller.advance().unwrap().unwrap();
        assert_eq!(next.id, 2);
        assert_eq!(controller.current_index(), Some(1));

        let wrapped = controller.advance().unwrap().unwrap();
        assert_eq!(wrapped.id, 1);
        assert_eq!(controller.current_index(), Some(0));
    }

    #[test]
    fn test_advance_is_modular_over_library() {
        let fixture = Fixture::with_entries(&[&[1], &[2], &[3], &[4], &[5]]);
        let mut controller = fixture.controller();
        controller.play(&fixture.entry(3), 2).unwrap();

        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(controller.advance().unwrap().unwrap().id);
        }

        assert_eq!(seen, vec![4, 5, 1, 2, 3, 4]);
    }

    #[test]
    fn test_advance_single_entry_repeats() {
        let fixture = Fixture::with_entries(&[&[7]]);
        let mut controller = fixture.controller();
        controller.play(&fixture.entry(1), 0).unwrap();
        controller.record_position(30.0).unwrap();

        for _ in 0..3 {
            assert_eq!(controller.advance().unwrap().unwrap().id, 1);
            assert_eq!(controller.on_metadata_loaded(), None);
            assert_eq!(controller.session().playback_position_seconds, 0.0);
        }
    }

    #[test]
    fn test_advance_on_empty_library_is_noop() {
        let fixture = Fixture::new();
        let mut controller = fixture.controller();

        assert_eq!(controller.advance().unwrap(), None);
        assert_eq!(controller.state(), PlaybackState::Idle);
        assert!(controller.current_handle().is_none());
    }

    #[test]
    fn test_advance_from_idle_selects_first() {
        let fixture = Fixture::with_entries(&[&[1], &[2]]);
        let mut controller = fixture.controller();

        assert_eq!(controller.advance().unwrap().unwrap().id, 1);
        assert_eq!(controller.state(), PlaybackState::Selected);
    }

    #[test]
    fn test_advance_after_current_deleted_moves_to_successor() {
        let fixture = Fixture::with_entries(&[&[1], &[2], &[3]]);
        let mut controller = fixture.controller();
        controller.play(&fixture.entry(2), 1).unwrap();
        fixture.store.delete(2).unwrap();

        assert_eq!(controller.advance().unwrap().unwrap().id, 3);
    }

    #[test]
    fn test_position_survives_restart() {
        let fixture = Fixture::with_entries(&[&[1], &[2]]);
        {
            let mut controller = fixture.controller();
            controller.play(&fixture.entry(2), 1).unwrap();
            controller.on_metadata_loaded();
            controller.record_position(42.75).unwrap();
        }

        let mut restarted = fixture.controller();
        let entry = restarted.resume_if_available().unwrap().unwrap();

        assert_eq!(entry.id, 2);
        assert_eq!(restarted.current_index(), Some(1));
        assert_eq!(restarted.state(), PlaybackState::Selected);
        assert_eq!(restarted.on_metadata_loaded(), Some(42.75));
        // applied once only
        assert_eq!(restarted.on_metadata_loaded(), None);
        assert_eq!(restarted.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_zero_position_does_not_seek() {
        let fixture = Fixture::with_entries(&[&[1]]);
        {
            let mut controller = fixture.controller();
            controller.play(&fixture.entry(1), 0).unwrap();
            controller.record_position(15.0).unwrap();
            controller.record_position(0.0).unwrap();
        }

        let mut restarted = fixture.controller();
        assert!(restarted.resume_if_available().unwrap().is_some());
        assert_eq!(restarted.on_metadata_loaded(), None);
    }

    #[test]
    fn test_resume_with_deleted_entry_is_nothing() {
        let fixture = Fixture::with_entries(&[&[1]]);
        {
            let mut controller = fixture.controller();
            controller.play(&fixture.entry(1), 0).unwrap();
            controller.record_position(9.0).unwrap();
        }
        fixture.store.delete(1).unwrap();

        let mut restarted = fixture.controller();

        assert_eq!(restarted.resume_if_available().unwrap(), None);
        assert_eq!(restarted.state(), PlaybackState::Idle);
        assert_eq!(restarted.on_metadata_loaded(), None);
    }

    #[test]
    fn test_resume_with_deleted_entry_forgets_reference() {
        let fixture = Fixture::with_entries(&[&[1], &[2], &[3]]);
        {
            let mut controller = fixture.controller();
            controller.play(&fixture.entry(2), 1).unwrap();
            controller.record_position(9.0).unwrap();
        }
        fixture.store.delete(2).unwrap();
        let sessions = SessionStore::in_dir(fixture.dir.path());

        let mut restarted = fixture.controller();
        assert_eq!(restarted.resume_if_available().unwrap(), None);
        assert_eq!(restarted.session().current_entry_id, None);
        assert_eq!(restarted.session().playback_position_seconds, 0.0);

        restarted.record_position(33.0).unwrap();
        assert_eq!(sessions.load().playback_position_seconds, 9.0);

        assert_eq!(restarted.advance().unwrap().unwrap().id, 1);
    }

    #[test]
    fn test_locate_current_follows_deletes() {
        let fixture = Fixture::with_entries(&[&[1], &[2], &[3]]);
        let mut controller = fixture.controller();
        assert_eq!(controller.locate_current().unwrap(), None);

        controller.play(&fixture.entry(3), 2).unwrap();
        fixture.store.delete(1).unwrap();

        assert_eq!(controller.current_index(), Some(2));
        assert_eq!(controller.locate_current().unwrap(), Some(1));
    }

    #[test]
    fn test_ended_on_emptied_library_stays_ended() {
        let fixture = Fixture::with_entries(&[&[1]]);
        let mut controller = fixture.controller();
        controller.play(&fixture.entry(1), 0).unwrap();
        controller.on_metadata_loaded();
        fixture.store.delete(1).unwrap();

        assert_eq!(controller.on_ended().unwrap(), None);
        assert_eq!(controller.state(), PlaybackState::Ended);
        assert!(controller.current_handle().is_none());
        assert_eq!(controller.registry().live_count(), 0);
    }

    #[test]
    fn test_failed_advance_on_end_keeps_playing_state() {
        let fixture = Fixture::with_entries(&[&[1], &[2]]);
        let mut controller = fixture.controller();
        controller.play(&fixture.entry(1), 0).unwrap();
        controller.on_metadata_loaded();

        // a directory in place of the session file makes the save fail
        let session_path = SessionStore::in_dir(fixture.dir.path()).path().to_path_buf();
        std::fs::remove_file(&session_path).unwrap();
        std::fs::create_dir(&session_path).unwrap();
        std::fs::write(session_path.join("keep"), b"x").unwrap();

        let result = controller.on_ended();

        assert!(matches!(result, Err(crate::error::LibraryError::SessionPersistence(_))));
        assert_eq!(controller.state(), PlaybackState::Playing);
        assert_eq!(controller.current_entry_id(), Some(1));
    }

    #[test]
    fn test_replaying_remembered_entry_restores_offset() {
        let fixture = Fixture::with_entries(&[&[1], &[2]]);
        let mut controller = fixture.controller();
        controller.play(&fixture.entry(1), 0).unwrap();
        controller.record_position(12.0).unwrap();

        controller.play(&fixture.entry(1), 0).unwrap();
        assert_eq!(controller.on_metadata_loaded(), Some(12.0));

        controller.play(&fixture.entry(2), 1).unwrap();
        assert_eq!(controller.on_metadata_loaded(), None);
        assert_eq!(controller.session().playback_position_seconds, 0.0);
    }

    #[test]
    fn test_seeks_backwards_overwrite() {
        let fixture = Fixture::with_entries(&[&[1]]);
        let mut controller = fixture.controller();
        controller.play(&fixture.entry(1), 0).unwrap();

        controller.record_position(80.0).unwrap();
        controller.record_position(5.5).unwrap();
        controller.record_position(f64::NAN).unwrap();

        let stored = SessionStore::in_dir(fixture.dir.path()).load();
        assert_eq!(stored.playback_position_seconds, 5.5);
    }

    #[test]
    fn test_position_ignored_before_selection() {
        let fixture = Fixture::with_entries(&[&[1]]);
        let mut controller = fixture.controller();

        controller.record_position(10.0).unwrap();

        assert!(!SessionStore::in_dir(fixture.dir.path()).path().exists());
    }

    #[test]
    fn test_play_persists_reference_immediately() {
        let fixture = Fixture::with_entries(&[&[1], &[2]]);
        let mut controller = fixture.controller();

        controller.play(&fixture.entry(2), 1).unwrap();

        let stored = SessionStore::in_dir(fixture.dir.path()).load();
        assert_eq!(stored.current_entry_id, Some(2));
        assert_eq!(stored.playback_position_seconds, 0.0);
    }

    #[test]
    fn test_time_updates_are_throttled() {
        let fixture = Fixture::with_entries(&[&[1]]);
        let mut controller = fixture.controller();
        controller.play(&fixture.entry(1), 0).unwrap();
        let sessions = SessionStore::in_dir(fixture.dir.path());
        let start = Instant::now() + Duration::from_secs(5);

        controller.on_time_update_at(1.0, start).unwrap();
        assert_eq!(sessions.load().playback_position_seconds, 1.0);

        controller
            .on_time_update_at(1.2, start + Duration::from_millis(200))
            .unwrap();
        assert_eq!(sessions.load().playback_position_seconds, 1.0);
        assert_eq!(controller.session().playback_position_seconds, 1.2);

        controller
            .on_time_update_at(2.1, start + Duration::from_millis(1100))
            .unwrap();
        assert_eq!(sessions.load().playback_position_seconds, 2.1);

        controller
            .on_time_update_at(2.3, start + Duration::from_millis(1200))
            .unwrap();
        controller.pause().unwrap();
        assert_eq!(sessions.load().playback_position_seconds, 2.3);
    }

    #[test]
    fn test_handles_released_on_selection_change() {
        let fixture = Fixture::with_entries(&[&[1], &[2], &[3]]);
        let mut controller = fixture.controller();

        let first_token = controller.play(&fixture.entry(1), 0).unwrap().token().to_string();
        controller.advance().unwrap();
        controller.advance().unwrap();

        assert_eq!(controller.registry().live_count(), 1);
        assert!(controller.registry().resolve(&first_token).is_none());

        let current = controller.current_handle().unwrap().token().to_string();
        assert_eq!(controller.registry().resolve(&current).as_deref(), Some(&[3u8][..]));
    }

    #[test]
    fn test_state_machine_transitions() {
        let fixture = Fixture::with_entries(&[&[1], &[2]]);
        let mut controller = fixture.controller();
        assert_eq!(controller.state(), PlaybackState::Idle);

        controller.play(&fixture.entry(1), 0).unwrap();
        assert_eq!(controller.state(), PlaybackState::Selected);

        controller.on_metadata_loaded();
        assert_eq!(controller.state(), PlaybackState::Playing);

        controller.pause().unwrap();
        assert_eq!(controller.state(), PlaybackState::Paused);

        controller.resume();
        assert_eq!(controller.state(), PlaybackState::Playing);

        let next = controller.on_ended().unwrap().unwrap();
        assert_eq!(next.id, 2);
        assert_eq!(controller.state(), PlaybackState::Selected);
        assert_eq!(controller.current_entry_id(), Some(2));
    }

    #[test]
    fn test_derived_handle_is_caller_owned() {
        let fixture = Fixture::with_entries(&[&[4, 2]]);
        let controller = fixture.controller();

        let handle = controller.derive_playable_handle(&fixture.entry(1));
        assert_eq!(controller.registry().live_count(), 1);

        handle.release();
        assert_eq!(controller.registry().live_count(), 0);
    }
}
