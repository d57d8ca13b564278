// Playback module
// Now-playing selection, resumable position and auto-advance

pub mod controller;
pub mod handle;

pub use controller::{PlaybackController, PlaybackState};
pub use handle::{HandleRegistry, TransientHandle};
