//! Schema for the collection store, tracked with `PRAGMA user_version`.
//!
//! Each entry of [`STEPS`] moves the database up one version. A fresh file
//! runs every step; an existing one runs only the steps past its version.

use rusqlite::Connection;
use tracing::info;

use crate::error::{Error, Result};

/// Ordered upgrade steps. Step `n` (1-based) brings the file to version `n`.
const STEPS: &[&str] = &[
    // 1: one row per collection key, holding the whole collection as JSON.
    r"
    CREATE TABLE IF NOT EXISTS collections (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    ",
    // 2: last-write lookups for `stats`.
    r"
    CREATE INDEX IF NOT EXISTS idx_collections_updated_at
        ON collections (updated_at);
    ",
];

/// Version written by the newest step.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub const SCHEMA_VERSION: i32 = STEPS.len() as i32;

fn apply_step(conn: &mut Connection, version: i32, sql: &str) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(sql)?;
    tx.pragma_update(None, "user_version", version)?;
    tx.commit()
}

fn user_version(conn: &Connection) -> Result<i32> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Bring `conn` up to [`SCHEMA_VERSION`].
///
/// # Errors
///
/// Returns [`Error::DatabaseMigration`] if the file was written by a newer
/// rollcall, or if a step fails. A failed step leaves the file at its
/// previous version.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    let found = user_version(conn)?;
    if found > SCHEMA_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database is at schema version {found}, this build understands up to {SCHEMA_VERSION}"
            ),
        });
    }

    let done = usize::try_from(found).unwrap_or(0);
    for (version, step) in (1..).zip(STEPS).skip(done) {
        apply_step(conn, version, step).map_err(|e| Error::DatabaseMigration {
            message: format!("step {version} failed: {e}"),
        })?;
        info!("Upgraded collection store to schema version {version}");
    }

    Ok(())
}
