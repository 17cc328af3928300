//! SQLite-backed freshness store.

use rusqlite::{Connection, params};
use std::path::Path;
use tracing::debug;

use super::{FreshnessRecords, FreshnessStore};
use crate::core::StoreError;
use crate::models::Buildpack;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS buildpack_records (
    guid       TEXT PRIMARY KEY,
    updated_at TEXT NOT NULL
);
";

/// Freshness records in a single SQLite table.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and ensure the schema.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Directory`] if the parent directory cannot be
    /// created and [`StoreError::Open`] if the file cannot be opened or the
    /// schema cannot be created.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let location = path.display().to_string();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            location: location.clone(),
            source,
        })?;
        Self::init(conn, location)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`] if SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let location = ":memory:".to_string();
        let conn = Connection::open_in_memory().map_err(|source| StoreError::Open {
            location: location.clone(),
            source,
        })?;
        Self::init(conn, location)
    }

    fn init(conn: Connection, location: String) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)
            .map_err(|source| StoreError::Open {
                location: location.clone(),
                source,
            })?;
        debug!(location = %location, "freshness store ready");
        Ok(Self { conn })
    }
}

impl FreshnessStore for SqliteStore {
    fn load(&self) -> Result<FreshnessRecords, StoreError> {
        let query = |source| StoreError::Query {
            operation: "load",
            source,
        };

        let mut stmt = self
            .conn
            .prepare("SELECT guid, updated_at FROM buildpack_records")
            .map_err(query)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(query)?;

        let mut records = FreshnessRecords::new();
        for row in rows {
            let (guid, updated_at) = row.map_err(query)?;
            records.insert(guid, updated_at);
        }
        Ok(records)
    }

    fn save(&mut self, buildpack: &Buildpack) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO buildpack_records (guid, updated_at) VALUES (?1, ?2)
                 ON CONFLICT(guid) DO UPDATE SET updated_at = excluded.updated_at",
                params![buildpack.guid, buildpack.updated_at],
            )
            .map_err(|source| StoreError::Query {
                operation: "save",
                source,
            })?;
        Ok(())
    }

    fn clear(&mut self) -> Result<usize, StoreError> {
        self.conn
            .execute("DELETE FROM buildpack_records", [])
            .map_err(|source| StoreError::Query {
                operation: "clear",
                source,
            })
    }
}
