// Database migrations
use anyhow::{bail, Result};
use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, info};

/// Schema version written to `PRAGMA user_version`
pub const SCHEMA_VERSION: i64 = 1;

pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    // Take the write lock before looking at the version so two openers
    // cannot both decide to initialize.
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let version: i64 = tx.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version > SCHEMA_VERSION {
        bail!(
            "database schema version {} is newer than supported version {}",
            version,
            SCHEMA_VERSION
        );
    }

    if version == 0 {
        initialize_schema(&tx)?;
        tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        info!("Initialized audio store schema v{}", SCHEMA_VERSION);
    } else {
        debug!("Audio store schema already at v{}", version);
    }

    tx.commit()?;
    Ok(())
}

/// Create the audio collection. Only runs on a fresh database.
fn initialize_schema(conn: &Connection) -> Result<()> {
    // AUTOINCREMENT keeps ids from being reused after deletes
    conn.execute(
        "CREATE TABLE IF NOT EXISTS audios (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            data BLOB NOT NULL,
            date_added INTEGER NOT NULL
        )",
        [],
    )?;

    Ok(())
}
