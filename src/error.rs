// Library error types
use thiserror::Error;

/// Failures surfaced by the audio store and the playback session.
///
/// Every variant is local to the call that produced it. After a
/// `WriteFailed` or `ReadFailed` the store handle stays usable and the
/// caller may retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LibraryError {
    /// The store could not be opened or created
    #[error("Audio storage unavailable: {0}")]
    StorageUnavailable(String),
    /// A single write (add/update/delete) did not commit
    #[error("Failed to write audio entry: {0}")]
    WriteFailed(String),
    /// A read did not complete
    #[error("Failed to read audio entries: {0}")]
    ReadFailed(String),
    /// The session record could not be persisted
    #[error("Failed to persist session state: {0}")]
    SessionPersistence(String),
}

impl LibraryError {
    pub(crate) fn write(err: impl std::fmt::Display) -> Self {
        Self::WriteFailed(err.to_string())
    }

    pub(crate) fn read(err: impl std::fmt::Display) -> Self {
        Self::ReadFailed(err.to_string())
    }
}

pub type LibraryResult<T> = Result<T, LibraryError>;
