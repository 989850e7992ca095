//! In-memory override source backed by a snapshot of records.

use std::collections::HashMap;
use std::path::Path;

use super::{OverrideError, OverrideRecord, OverrideSource};
use crate::BoxFuture;

/// Fixed set of override records held in memory.
///
/// Loaded from a JSON array of `{"merge_id", "name", "color"}` objects for
/// offline serving, or built directly in tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOverrides {
    records: HashMap<String, OverrideRecord>,
}

impl InMemoryOverrides {
    /// Build from records; a later record for the same identifier wins.
    pub fn from_records(records: impl IntoIterator<Item = OverrideRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.identifier.clone(), record))
            .collect();
        Self { records }
    }

    /// Load a JSON snapshot file.
    pub fn from_json_file(path: &Path) -> Result<Self, OverrideError> {
        let content = std::fs::read_to_string(path).map_err(|source| OverrideError::Snapshot {
            path: path.to_path_buf(),
            source,
        })?;
        let records: Vec<OverrideRecord> = serde_json::from_str(&content)?;
        Ok(Self::from_records(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl OverrideSource for InMemoryOverrides {
    fn fetch_batch<'a>(
        &'a self,
        identifiers: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<OverrideRecord>, OverrideError>> {
        let found = identifiers
            .iter()
            .filter_map(|id| self.records.get(id).cloned())
            .collect();
        Box::pin(async move { Ok(found) })
    }
}
