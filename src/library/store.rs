use std::path::Path;

use tracing::{debug, info};

use crate::db::connection::DatabaseConnection;
use crate::db::models::AudioEntry;
use crate::db::operations::DbOperations;
use crate::error::{LibraryError, LibraryResult};

/// Durable collection of imported audio blobs.
///
/// Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct AudioStore {
    db: DatabaseConnection,
}

impl AudioStore {
    /// Open the store at `db_path`, creating the database and schema on
    /// first run. Opening an existing store leaves its entries untouched.
    pub fn open(db_path: &Path) -> LibraryResult<Self> {
        let db = DatabaseConnection::new(db_path)
            .map_err(|e| LibraryError::StorageUnavailable(format!("{:#}", e)))?;

        info!("Opened audio store at {:?}", db_path);
        Ok(Self { db })
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            db: DatabaseConnection::in_memory().expect("in-memory database"),
        }
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Append a new entry and return its id
    pub fn add(&self, bytes: &[u8]) -> LibraryResult<i64> {
        let date_added = chrono::Utc::now().timestamp();
        let id = DbOperations::insert_audio(&self.db, bytes, date_added)
            .map_err(LibraryError::write)?;

        debug!("Added audio entry {} ({} bytes)", id, bytes.len());
        Ok(id)
    }

    /// Every persisted entry, oldest first
    pub fn list_all(&self) -> LibraryResult<Vec<AudioEntry>> {
        DbOperations::get_all_audio(&self.db).map_err(LibraryError::read)
    }

    /// Entry ids, oldest first
    pub fn list_ids(&self) -> LibraryResult<Vec<i64>> {
        DbOperations::get_audio_ids(&self.db).map_err(LibraryError::read)
    }

    pub fn get(&self, id: i64) -> LibraryResult<Option<AudioEntry>> {
        DbOperations::get_audio_by_id(&self.db, id).map_err(LibraryError::read)
    }

    pub fn count(&self) -> LibraryResult<usize> {
        DbOperations::count_audio(&self.db).map_err(LibraryError::read)
    }

    /// Replace an entry's bytes. Returns false for an unknown id.
    pub fn update(&self, id: i64, bytes: &[u8]) -> LibraryResult<bool> {
        let updated = DbOperations::update_audio(&self.db, id, bytes)
            .map_err(LibraryError::write)?;
        debug!("Update audio entry {}: {}", id, updated);
        Ok(updated)
    }

    /// Remove an entry. Returns false for an unknown id.
    pub fn delete(&self, id: i64) -> LibraryResult<bool> {
        let deleted = DbOperations::delete_audio(&self.db, id)
            .map_err(LibraryError::write)?;
        debug!("Delete audio entry {}: {}", id, deleted);
        Ok(deleted)
    }
}
