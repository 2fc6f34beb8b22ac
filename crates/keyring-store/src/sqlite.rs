//! SQLite implementations of the storage traits.
//!
//! The primary storage backend. Uses rusqlite with bundled SQLite behind a
//! mutex; every operation is a short synchronous transaction.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use keyring_core::{
    CollectionId, Email, EncryptedPayload, EncryptionKey, Fingerprint, Principal, SealedKeyring,
    Secret,
};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{KeyStore, UserDirectory, WriteResult};

fn open_connection(path: impl AsRef<Path>) -> Result<Arc<Mutex<Connection>>> {
    let mut conn = Connection::open(path)?;
    migration::migrate(&mut conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

fn open_memory_connection() -> Result<Arc<Mutex<Connection>>> {
    let mut conn = Connection::open_in_memory()?;
    migration::migrate(&mut conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock().map_err(|e| {
        StoreError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
            Some(format!("mutex poisoned: {}", e)),
        ))
    })
}

fn fingerprint_from_blob(bytes: Vec<u8>) -> Result<Fingerprint> {
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| StoreError::InvalidData(format!("fingerprint of {} bytes", b.len())))?;
    Ok(Fingerprint::from_bytes(bytes))
}

/// SQLite-backed durable key store.
///
/// Secrets are encrypted at rest under a store master key. The fingerprint
/// column lets writes detect conflicts without decrypting.
pub struct SqliteKeyStore {
    conn: Arc<Mutex<Connection>>,
    master: EncryptionKey,
}

impl SqliteKeyStore {
    /// Open a key store database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>, master: EncryptionKey) -> Result<Self> {
        Ok(Self {
            conn: open_connection(path)?,
            master,
        })
    }

    /// Open an in-memory key store. Useful for testing.
    pub fn open_memory(master: EncryptionKey) -> Result<Self> {
        Ok(Self {
            conn: open_memory_connection()?,
            master,
        })
    }
}

impl KeyStore for SqliteKeyStore {
    fn exists(&self, collection: &CollectionId) -> Result<bool> {
        let conn = lock(&self.conn)?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM collection_keys WHERE collection_id = ?1",
                params![collection.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn read(&self, collection: &CollectionId) -> Result<Option<Secret>> {
        let conn = lock(&self.conn)?;
        let record: Option<Vec<u8>> = conn
            .query_row(
                "SELECT record FROM collection_keys WHERE collection_id = ?1",
                params![collection.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(record) = record else {
            return Ok(None);
        };

        let payload = EncryptedPayload::from_bytes(&record)?;
        let bytes = payload.open(&self.master)?;
        let secret = Secret::new(bytes).map_err(|e| StoreError::InvalidData(e.to_string()))?;
        Ok(Some(secret))
    }

    fn write(&self, collection: &CollectionId, secret: &Secret) -> Result<WriteResult> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;

        let existing: Option<Vec<u8>> = tx
            .query_row(
                "SELECT fingerprint FROM collection_keys WHERE collection_id = ?1",
                params![collection.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let fingerprint = secret.fingerprint();
        if let Some(existing) = existing {
            let existing = fingerprint_from_blob(existing)?;
            return Ok(if existing == fingerprint {
                WriteResult::AlreadyExists
            } else {
                WriteResult::Conflict { existing }
            });
        }

        let record = EncryptedPayload::seal(&self.master, secret.expose())?.to_bytes()?;
        tx.execute(
            "INSERT INTO collection_keys (collection_id, fingerprint, record, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                collection.as_str(),
                fingerprint.as_bytes().as_slice(),
                record,
                now_millis()
            ],
        )?;
        tx.commit()?;

        Ok(WriteResult::Written)
    }

    fn delete(&self, collection: &CollectionId) -> Result<bool> {
        let conn = lock(&self.conn)?;
        let deleted = conn.execute(
            "DELETE FROM collection_keys WHERE collection_id = ?1",
            params![collection.as_str()],
        )?;
        Ok(deleted > 0)
    }

    fn ids(&self) -> Result<BTreeSet<CollectionId>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare("SELECT collection_id FROM collection_keys")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut ids = BTreeSet::new();
        for id in rows {
            let id = CollectionId::new(id?).map_err(|e| StoreError::InvalidData(e.to_string()))?;
            ids.insert(id);
        }
        Ok(ids)
    }
}

/// SQLite-backed user directory: one sealed keyring blob per principal.
pub struct SqliteUserDirectory {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserDirectory {
    /// Open a directory database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            conn: open_connection(path)?,
        })
    }

    /// Open an in-memory directory. Useful for testing.
    pub fn open_memory() -> Result<Self> {
        Ok(Self {
            conn: open_memory_connection()?,
        })
    }

    /// Load, modify and store one keyring in a single transaction.
    fn mutate<F>(&self, email: &Email, f: F) -> Result<()>
    where
        F: FnOnce(&mut SealedKeyring) -> Result<()>,
    {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;

        let blob: Vec<u8> = tx
            .query_row(
                "SELECT keyring FROM principal_keyrings WHERE email = ?1",
                params![email.as_str()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::PrincipalNotFound(email.to_string()))?;

        let mut keyring = SealedKeyring::from_bytes(&blob)?;
        f(&mut keyring)?;

        tx.execute(
            "UPDATE principal_keyrings SET keyring = ?1, updated_at = ?2 WHERE email = ?3",
            params![keyring.to_bytes()?, now_millis(), email.as_str()],
        )?;
        tx.commit()?;
        Ok(())
    }
}

fn row_to_principal(email: String, blob: Vec<u8>) -> Result<Principal> {
    let email = Email::new(email).map_err(|e| StoreError::InvalidData(e.to_string()))?;
    let sealed = SealedKeyring::from_bytes(&blob)?;
    Ok(Principal::from_record(email, sealed))
}

impl UserDirectory for SqliteUserDirectory {
    fn list(&self) -> Result<Vec<Principal>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare("SELECT email, keyring FROM principal_keyrings ORDER BY email")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(email, blob)| row_to_principal(email, blob))
            .collect()
    }

    fn get(&self, email: &Email) -> Result<Option<Principal>> {
        let conn = lock(&self.conn)?;
        let blob: Option<Vec<u8>> = conn
            .query_row(
                "SELECT keyring FROM principal_keyrings WHERE email = ?1",
                params![email.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        blob.map(|blob| row_to_principal(email.to_string(), blob))
            .transpose()
    }

    fn register(&self, principal: &Principal) -> Result<()> {
        let conn = lock(&self.conn)?;
        let now = now_millis();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO principal_keyrings (email, keyring, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![
                principal.email.as_str(),
                principal.keyring.sealed().to_bytes()?,
                now
            ],
        )?;

        if inserted == 0 {
            return Err(StoreError::PrincipalExists(principal.email.to_string()));
        }
        Ok(())
    }

    fn add_key_to_keyring(
        &self,
        email: &Email,
        collection: &CollectionId,
        secret: &Secret,
    ) -> Result<()> {
        self.mutate(email, |keyring| Ok(keyring.insert(collection, secret)?))
    }

    fn remove_key_from_keyring(&self, email: &Email, collection: &CollectionId) -> Result<()> {
        self.mutate(email, |keyring| {
            keyring.remove(collection);
            Ok(())
        })
    }

    fn update_keyring(&self, principal: &Principal) -> Result<()> {
        self.mutate(&principal.email, |keyring| {
            *keyring = principal.keyring.sealed().clone();
            Ok(())
        })
    }
}
