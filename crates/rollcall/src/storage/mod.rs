//! Persistence layer for rollcall.
//!
//! The engine persists through a [`KeyValueStore`]: five fixed keys, each
//! holding one whole collection as a JSON document. A missing key means "use
//! the empty collection" (or default settings). Writes are not transactional
//! across keys; a crash between two `set` calls can leave collections from
//! different generations.
//!
//! [`SqliteStore`] is the durable implementation; [`MemoryStore`] backs tests
//! and throwaway sessions.

mod memory;
pub mod migrations;

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};

pub use memory::MemoryStore;

/// The fixed collection keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreKey {
    /// Student registry.
    Students,
    /// Faculty registry.
    Faculty,
    /// Attendance records.
    Attendance,
    /// Explicitly created class sections.
    Classes,
    /// Settings record.
    Settings,
}

impl StoreKey {
    /// All keys, in persist order.
    pub const ALL: [Self; 5] = [
        Self::Students,
        Self::Faculty,
        Self::Attendance,
        Self::Classes,
        Self::Settings,
    ];

    /// The key string used in the store.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Students => "students",
            Self::Faculty => "faculty",
            Self::Attendance => "attendance",
            Self::Classes => "classes",
            Self::Settings => "settings",
        }
    }
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A blob store addressed by [`StoreKey`].
pub trait KeyValueStore {
    /// Read the document stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: StoreKey) -> Result<Option<Value>>;

    /// Replace the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set(&mut self, key: StoreKey, value: &Value) -> Result<()>;
}

/// `SQLite`-backed [`KeyValueStore`].
#[derive(Debug)]
pub struct SqliteStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a store at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema cannot be upgraded.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let mut conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::migrate(&mut conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::migrate(&mut conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let (stored_keys, payload_bytes): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(LENGTH(value)), 0) FROM collections",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let last_write: Option<String> = self
            .conn
            .query_row(
                "SELECT updated_at FROM collections ORDER BY updated_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            stored_keys: usize::try_from(stored_keys).unwrap_or(0),
            payload_bytes: u64::try_from(payload_bytes).unwrap_or(0),
            last_write,
            db_size_bytes,
        })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: StoreKey) -> Result<Option<Value>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM collections WHERE key = ?1",
                [key.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|text| {
            serde_json::from_str(&text).map_err(|e| {
                Error::persistence(key, format!("stored value is not valid JSON: {e}"))
            })
        })
        .transpose()
    }

    fn set(&mut self, key: StoreKey, value: &Value) -> Result<()> {
        let text = serde_json::to_string(value)?;
        self.conn.execute(
            r"
            INSERT INTO collections (key, value, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
            params![key.as_str(), text],
        )?;
        debug!("Persisted {} ({} bytes)", key, text.len());
        Ok(())
    }
}

/// Statistics about the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of collection keys present.
    pub stored_keys: usize,
    /// Total size of the stored JSON documents.
    pub payload_bytes: u64,
    /// `SQLite` timestamp of the most recent write.
    pub last_write: Option<String>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
