//! Durable key-value store for the session user, cached contacts, and the recognition log.
//!
//! Backed by a single SQLite table. Every read fails soft: a missing or
//! malformed record yields an empty result. Every write fails soft: the
//! failure is logged and swallowed. Only opening the store can fail.

use crate::types::{Contact, RecognitionLog, StoredUser};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

pub const KEY_USER: &str = "memwar_user";
pub const KEY_TOKEN: &str = "memwar_token";
pub const KEY_CONTACTS: &str = "memwar_contacts";
pub const KEY_RECOGNITION_LOGS: &str = "recognition_logs";

/// Default cap on stored recognition log entries.
pub const DEFAULT_LOG_RETENTION: usize = 500;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to create store directory {path}: {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub struct Store {
    conn: Mutex<Connection>,
    /// Maximum recognition log entries kept; 0 keeps everything.
    log_retention: usize,
}

impl Store {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                    path: parent.display().to_string(),
                    source,
                })?;
            }
        }
        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "opened local store");
        Self::init(conn)
    }

    /// Open a throwaway store that lives only as long as the handle.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            log_retention: DEFAULT_LOG_RETENTION,
        })
    }

    pub fn with_log_retention(mut self, entries: usize) -> Self {
        self.log_retention = entries;
        self
    }

    fn lock(&self) -> Option<MutexGuard<'_, Connection>> {
        match self.conn.lock() {
            Ok(guard) => Some(guard),
            Err(_) => {
                tracing::error!("store connection lock poisoned");
                None
            }
        }
    }

    fn get_raw(&self, key: &str) -> Option<String> {
        let conn = self.lock()?;
        conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
            row.get::<_, String>(0)
        })
        .optional()
        .unwrap_or_else(|e| {
            tracing::error!(key, error = %e, "error reading from storage");
            None
        })
    }

    fn set_raw(&self, key: &str, value: &str) {
        let Some(conn) = self.lock() else { return };
        if let Err(e) = conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        ) {
            tracing::error!(key, error = %e, "error writing to storage");
        }
    }

    fn remove(&self, key: &str) {
        let Some(conn) = self.lock() else { return };
        if let Err(e) = conn.execute("DELETE FROM kv WHERE key = ?1", params![key]) {
            tracing::error!(key, error = %e, "error removing from storage");
        }
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(key, error = %e, "malformed record in storage");
                None
            }
        }
    }

    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.set_raw(key, &raw),
            Err(e) => tracing::error!(key, error = %e, "error encoding record for storage"),
        }
    }

    // --- session user ---

    pub fn get_user(&self) -> Option<StoredUser> {
        self.get_json(KEY_USER)
    }

    pub fn set_user(&self, user: &StoredUser) {
        self.set_json(KEY_USER, user);
    }

    pub fn remove_user(&self) {
        self.remove(KEY_USER);
    }

    pub fn get_token(&self) -> Option<String> {
        self.get_raw(KEY_TOKEN)
    }

    pub fn set_token(&self, token: &str) {
        self.set_raw(KEY_TOKEN, token);
    }

    pub fn remove_token(&self) {
        self.remove(KEY_TOKEN);
    }

    /// A stored user is the only authentication signal; the token is optional.
    pub fn is_authenticated(&self) -> bool {
        self.get_user().is_some()
    }

    pub fn clear_auth(&self) {
        self.remove_user();
        self.remove_token();
    }

    // --- contacts ---

    /// Whether a contact collection has ever been persisted (even an empty one).
    pub fn has_contacts(&self) -> bool {
        self.get_raw(KEY_CONTACTS).is_some()
    }

    /// Cached contacts, with absent memory scores normalized to 0.
    pub fn get_contacts(&self) -> Vec<Contact> {
        self.get_json::<Vec<Contact>>(KEY_CONTACTS)
            .unwrap_or_default()
            .into_iter()
            .map(|mut c| {
                c.memory_score = Some(c.score());
                c
            })
            .collect()
    }

    pub fn set_contacts(&self, contacts: &[Contact]) {
        self.set_json(KEY_CONTACTS, contacts);
    }

    pub fn increment_memory_score(&self, contact_id: &str) {
        self.adjust_memory_score(contact_id, 1);
    }

    pub fn decrement_memory_score(&self, contact_id: &str) {
        self.adjust_memory_score(contact_id, -1);
    }

    // Read-modify-write without a transaction: concurrent writers can lose a delta.
    fn adjust_memory_score(&self, contact_id: &str, delta: i64) {
        let mut contacts = self.get_contacts();
        let mut found = false;
        for contact in contacts.iter_mut().filter(|c| c.id == contact_id) {
            contact.memory_score = Some(contact.score() + delta);
            found = true;
        }
        if !found {
            tracing::debug!(contact_id, delta, "memory score change for unknown contact");
        }
        self.set_contacts(&contacts);
    }

    // --- recognition log ---

    /// Recognition log, newest first.
    pub fn get_recognition_logs(&self) -> Vec<RecognitionLog> {
        self.get_json(KEY_RECOGNITION_LOGS).unwrap_or_default()
    }

    pub fn add_recognition_log(&self, log: RecognitionLog) {
        let mut logs = self.get_recognition_logs();
        logs.insert(0, log);
        if self.log_retention > 0 && logs.len() > self.log_retention {
            let dropped = logs.len() - self.log_retention;
            logs.truncate(self.log_retention);
            tracing::debug!(dropped, "recognition log trimmed to retention limit");
        }
        self.set_json(KEY_RECOGNITION_LOGS, &logs);
    }

    pub fn clear_recognition_logs(&self) {
        self.remove(KEY_RECOGNITION_LOGS);
    }

    /// Wipe every record. Used on logout.
    pub fn clear_all(&self) {
        let Some(conn) = self.lock() else { return };
        if let Err(e) = conn.execute("DELETE FROM kv", []) {
            tracing::error!(error = %e, "error clearing storage");
        }
    }
}
