// Settings module
// Persisted application configuration

pub mod settings;

pub use settings::{AppSettings, LibrarySettings, PlaybackSettings};
