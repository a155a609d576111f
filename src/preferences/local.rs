//! SQLite-backed local preference store.
//!
//! The local store is the source of truth for preferences. Records are
//! kept as JSON under their report id in `~/.quarry/preferences.db` by
//! default.
//!
//! # Design
//!
//! - One row per report, replaced wholesale on save
//! - Versioned - auto-clears on version mismatch
//! - Writes are synchronous; the caller learns the outcome immediately

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use super::record::PreferenceRecord;

/// Current store schema version. Bump this when the record format changes.
const STORE_VERSION: i32 = 1;

/// Errors that can occur in the local store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to determine home directory")]
    NoHomeDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable, synchronous storage for preference records.
pub trait LocalStore: Send + Sync {
    fn put(&self, record: &PreferenceRecord) -> StoreResult<()>;
    fn get(&self, report_id: &str) -> StoreResult<Option<PreferenceRecord>>;
    /// Returns true if a record was deleted.
    fn delete(&self, report_id: &str) -> StoreResult<bool>;
    fn report_ids(&self) -> StoreResult<Vec<String>>;
}

/// Local store on a SQLite database.
pub struct SqlitePreferenceStore {
    conn: Mutex<Connection>,
}

impl SqlitePreferenceStore {
    /// Open or create the store at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let store = Self {
            conn: Mutex::new(Connection::open(path)?),
        };
        store.init()?;
        Ok(store)
    }

    /// Open the store at its default location.
    pub fn open_default() -> StoreResult<Self> {
        Self::open(Self::default_path()?)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.init()?;
        Ok(store)
    }

    /// `~/.quarry/preferences.db`
    pub fn default_path() -> StoreResult<PathBuf> {
        let base = dirs::home_dir().ok_or(StoreError::NoHomeDir)?;
        Ok(base.join(".quarry").join("preferences.db"))
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn init(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS preferences (
                report_id TEXT PRIMARY KEY,
                record TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;

        let stored_version: Option<i32> = conn
            .query_row("SELECT value FROM meta WHERE key = 'version'", [], |row| {
                let s: String = row.get(0)?;
                Ok(s.parse().unwrap_or(0))
            })
            .optional()?;

        match stored_version {
            Some(v) if v == STORE_VERSION => {}
            Some(v) => {
                tracing::info!(found = v, expected = STORE_VERSION, "preference store version changed, clearing");
                conn.execute("DELETE FROM preferences", [])?;
                Self::set_version(&conn)?;
            }
            None => Self::set_version(&conn)?,
        }

        Ok(())
    }

    fn set_version(conn: &Connection) -> StoreResult<()> {
        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('version', ?)",
            params![STORE_VERSION.to_string()],
        )?;
        Ok(())
    }

    /// Number of stored records.
    pub fn len(&self) -> StoreResult<usize> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM preferences", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl LocalStore for SqlitePreferenceStore {
    fn put(&self, record: &PreferenceRecord) -> StoreResult<()> {
        let json = serde_json::to_string(record)?;
        let now = chrono::Utc::now().to_rfc3339();
        self.conn()?.execute(
            "INSERT OR REPLACE INTO preferences (report_id, record, updated_at) VALUES (?, ?, ?)",
            params![record.report_id, json, now],
        )?;
        Ok(())
    }

    fn get(&self, report_id: &str) -> StoreResult<Option<PreferenceRecord>> {
        let json: Option<String> = self
            .conn()?
            .query_row(
                "SELECT record FROM preferences WHERE report_id = ?",
                params![report_id],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    fn delete(&self, report_id: &str) -> StoreResult<bool> {
        let rows = self
            .conn()?
            .execute("DELETE FROM preferences WHERE report_id = ?", params![report_id])?;
        Ok(rows > 0)
    }

    fn report_ids(&self) -> StoreResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT report_id FROM preferences ORDER BY report_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }
}
