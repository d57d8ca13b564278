use rusqlite::{params, OptionalExtension};
use crate::db::connection::DatabaseConnection;
use crate::db::models::AudioEntry;

/// Database operations for the audio collection.
///
/// Each call runs in its own transaction and touches only the rows it names.
pub struct DbOperations;

impl DbOperations {
    /// Insert a new audio blob and return its assigned id
    pub fn insert_audio(
        db: &DatabaseConnection,
        data: &[u8],
        date_added: i64,
    ) -> Result<i64, anyhow::Error> {
        let conn = db.get_connection();
        let mut conn = conn.lock();

        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO audios (data, date_added) VALUES (?1, ?2)",
            params![data, date_added],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(id)
    }

    /// Get all audio entries in insertion order
    pub fn get_all_audio(
        db: &DatabaseConnection,
    ) -> Result<Vec<AudioEntry>, anyhow::Error> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let mut stmt = conn.prepare(
            "SELECT id, data, date_added FROM audios ORDER BY id ASC"
        )?;

        let entries = stmt.query_map([], |row| {
            Ok(AudioEntry {
                id: row.get(0)?,
                data: row.get(1)?,
                date_added: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Get the ids of all entries in insertion order, without loading blobs
    pub fn get_audio_ids(
        db: &DatabaseConnection,
    ) -> Result<Vec<i64>, anyhow::Error> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let mut stmt = conn.prepare("SELECT id FROM audios ORDER BY id ASC")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;

        Ok(ids)
    }

    /// Get a single entry by id
    pub fn get_audio_by_id(
        db: &DatabaseConnection,
        id: i64,
    ) -> Result<Option<AudioEntry>, anyhow::Error> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let entry = conn
            .query_row(
                "SELECT id, data, date_added FROM audios WHERE id = ?1",
                params![id],
                |row| {
                    Ok(AudioEntry {
                        id: row.get(0)?,
                        data: row.get(1)?,
                        date_added: row.get(2)?,
                    })
                },
            )
            .optional()?;

        Ok(entry)
    }

    /// Replace the bytes of an entry. Returns false if the id is unknown.
    pub fn update_audio(
        db: &DatabaseConnection,
        id: i64,
        data: &[u8],
    ) -> Result<bool, anyhow::Error> {
        let conn = db.get_connection();
        let mut conn = conn.lock();

        let tx = conn.transaction()?;
        let changed = tx.execute(
            "UPDATE audios SET data = ?1 WHERE id = ?2",
            params![data, id],
        )?;
        tx.commit()?;

        Ok(changed > 0)
    }

    /// Delete an entry. Returns false if the id is unknown.
    pub fn delete_audio(
        db: &DatabaseConnection,
        id: i64,
    ) -> Result<bool, anyhow::Error> {
        let conn = db.get_connection();
        let mut conn = conn.lock();

        let tx = conn.transaction()?;
        let changed = tx.execute("DELETE FROM audios WHERE id = ?1", params![id])?;
        tx.commit()?;

        Ok(changed > 0)
    }

    /// Count entries
    pub fn count_audio(
        db: &DatabaseConnection,
    ) -> Result<usize, anyhow::Error> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM audios", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_fetch() {
        let db = DatabaseConnection::in_memory().unwrap();

        let id = DbOperations::insert_audio(&db, &[0xde, 0xad], 42).unwrap();
        let entry = DbOperations::get_audio_by_id(&db, id).unwrap().unwrap();

        assert_eq!(entry.data, vec![0xde, 0xad]);
        assert_eq!(entry.date_added, 42);
        assert!(DbOperations::get_audio_by_id(&db, id + 1).unwrap().is_none());
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let db = DatabaseConnection::in_memory().unwrap();

        let first = DbOperations::insert_audio(&db, &[1], 0).unwrap();
        let second = DbOperations::insert_audio(&db, &[2], 0).unwrap();
        assert!(DbOperations::delete_audio(&db, second).unwrap());

        let third = DbOperations::insert_audio(&db, &[3], 0).unwrap();
        assert!(third > second);
        assert_eq!(DbOperations::get_audio_ids(&db).unwrap(), vec![first, third]);
    }

    #[test]
    fn test_update_and_delete_unknown_id() {
        let db = DatabaseConnection::in_memory().unwrap();

        assert!(!DbOperations::update_audio(&db, 7, &[1]).unwrap());
        assert!(!DbOperations::delete_audio(&db, 7).unwrap());
        assert_eq!(DbOperations::count_audio(&db).unwrap(), 0);
    }

    #[test]
    fn test_empty_blob_round_trips() {
        let db = DatabaseConnection::in_memory().unwrap();

        let id = DbOperations::insert_audio(&db, &[], 0).unwrap();
        let all = DbOperations::get_all_audio(&db).unwrap();

        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, id);
        assert!(all[0].data.is_empty());
    }
}
