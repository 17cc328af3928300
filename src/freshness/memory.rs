use super::{FreshnessRecords, FreshnessStore};
use crate::core::StoreError;
use crate::models::Buildpack;

/// Freshness store that lives for the current process only.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: FreshnessRecords,
}

impl MemoryStore {
    /// Create a store pre-populated with `records`.
    pub fn with_records(records: FreshnessRecords) -> Self {
        Self { records }
    }
}

impl FreshnessStore for MemoryStore {
    fn load(&self) -> Result<FreshnessRecords, StoreError> {
        Ok(self.records.clone())
    }

    fn save(&mut self, buildpack: &Buildpack) -> Result<(), StoreError> {
        self.records
            .insert(buildpack.guid.clone(), buildpack.updated_at.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<usize, StoreError> {
        let removed = self.records.len();
        self.records.clear();
        Ok(removed)
    }
}
