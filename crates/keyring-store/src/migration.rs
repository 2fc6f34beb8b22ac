//! SQLite schema.
//!
//! The key store and the user directory share one database file, so either
//! may open it first. The schema version lives in `PRAGMA user_version`;
//! `MIGRATIONS[n]` takes the schema from version `n` to `n + 1`.

use rusqlite::Connection;
use tracing::debug;

use crate::error::{Result, StoreError};

const MIGRATIONS: &[&str] = &[
    // 1: key store records and personal keyrings.
    r#"
    CREATE TABLE collection_keys (
        collection_id TEXT PRIMARY KEY,
        fingerprint BLOB NOT NULL,        -- keyed Blake3 of the secret
        record BLOB NOT NULL,             -- CBOR EncryptedPayload under the store master key
        created_at INTEGER NOT NULL
    );

    CREATE TABLE principal_keyrings (
        email TEXT PRIMARY KEY,
        keyring BLOB NOT NULL,            -- CBOR SealedKeyring
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );
    "#,
];

/// Schema version this build writes.
pub const SCHEMA_VERSION: u32 = MIGRATIONS.len() as u32;

/// Bring the schema of `conn` up to [`SCHEMA_VERSION`].
///
/// Runs on every open. Refuses databases written by a newer build.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    let found: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if found > SCHEMA_VERSION {
        return Err(StoreError::Migration(format!(
            "schema version {} is newer than {}",
            found, SCHEMA_VERSION
        )));
    }
    if found == SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for sql in &MIGRATIONS[found as usize..] {
        tx.execute_batch(sql)?;
    }
    tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    tx.commit()?;

    debug!(from = found, to = SCHEMA_VERSION, "schema migrated");
    Ok(())
}

/// Milliseconds since the Unix epoch, for row timestamps.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
