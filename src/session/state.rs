use serde::{Deserialize, Serialize};

/// Current version of the persisted session record
pub const SESSION_VERSION: u32 = 1;

/// Last selected entry and playback offset, persisted as one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub version: u32,
    /// Entry selected for playback, `None` until something is played
    #[serde(default)]
    pub current_entry_id: Option<i64>,
    #[serde(default)]
    pub playback_position_seconds: f64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            version: SESSION_VERSION,
            current_entry_id: None,
            playback_position_seconds: 0.0,
        }
    }
}

impl SessionState {
    /// Offset to seek to on resume. Zero means start from the beginning,
    /// so it never produces a seek.
    pub fn resume_position(&self) -> Option<f64> {
        self.current_entry_id?;
        (self.playback_position_seconds > 0.0).then_some(self.playback_position_seconds)
    }
}

/// Normalize a reported playback offset. Non-finite values are rejected,
/// negatives clamp to the start.
pub fn sanitize_position(seconds: f64) -> Option<f64> {
    seconds.is_finite().then(|| seconds.max(0.0))
}
