//! Buildpack freshness tracking across runs.
//!
//! A [`FreshnessStore`] remembers, per buildpack GUID, the `updated_at` value
//! that was current when the buildpack was last processed. [`filter_fresh`]
//! compares the platform's current listing against those records and keeps
//! only buildpacks that were never seen or changed strictly after their
//! record. Equal timestamps are not fresh, so unchanged data never triggers a
//! second round of notifications.
//!
//! Two backends exist:
//!
//! - [`SqliteStore`]: persistent, used when a database is configured
//! - [`MemoryStore`]: per-process, used when none is; every buildpack is then
//!   new on every run

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::collections::HashMap;
use tracing::debug;

use crate::config::DatabaseLocation;
use crate::core::{NotifyError, StoreError, parse_timestamp};
use crate::models::Buildpack;

/// Stored `updated_at` wire strings keyed by buildpack GUID.
pub type FreshnessRecords = HashMap<String, String>;

/// Persistence for buildpack freshness records.
pub trait FreshnessStore {
    /// Read every record. An empty store yields an empty map.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing store cannot be read.
    fn load(&self) -> Result<FreshnessRecords, StoreError>;

    /// Insert or replace the record for `buildpack` with its current `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    fn save(&mut self, buildpack: &Buildpack) -> Result<(), StoreError>;

    /// Remove every record, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the delete fails.
    fn clear(&mut self) -> Result<usize, StoreError>;
}

/// Open the store for `location`, or an in-memory store when none is configured.
///
/// # Errors
///
/// Returns [`StoreError::Open`] if the database cannot be opened or initialised.
pub fn open_store(
    location: Option<&DatabaseLocation>,
) -> Result<Box<dyn FreshnessStore>, StoreError> {
    match location {
        Some(DatabaseLocation::File(path)) => Ok(Box::new(SqliteStore::open(path)?)),
        Some(DatabaseLocation::InMemory) => Ok(Box::new(SqliteStore::open_in_memory()?)),
        None => {
            tracing::warn!("no database configured; every buildpack is treated as newly updated");
            Ok(Box::new(MemoryStore::default()))
        }
    }
}

/// Keep the buildpacks in `current` that are absent from `stored` or whose
/// `updated_at` is strictly after the stored value. Order is preserved.
///
/// # Errors
///
/// Returns [`NotifyError::InvalidTimestamp`] if a current or stored timestamp
/// that has to be compared is malformed.
pub fn filter_fresh(
    current: Vec<Buildpack>,
    stored: &FreshnessRecords,
) -> Result<Vec<Buildpack>, NotifyError> {
    let mut fresh = Vec::with_capacity(current.len());

    for buildpack in current {
        let Some(recorded) = stored.get(&buildpack.guid) else {
            debug!(buildpack = %buildpack.name, "buildpack not seen before");
            fresh.push(buildpack);
            continue;
        };

        let subject = format!("buildpack {}", buildpack.guid);
        let updated = parse_timestamp(&buildpack.updated_at, subject.as_str())?;
        let recorded = parse_timestamp(recorded, format!("stored record for {subject}"))?;

        if updated > recorded {
            debug!(buildpack = %buildpack.name, "buildpack updated since last run");
            fresh.push(buildpack);
        }
    }

    Ok(fresh)
}
