//! Override records and the batch resolver.
//!
//! An [`OverrideRecord`] carries a replacement display name and/or colour
//! for every feature labelled with its `merge_id`. Records live in an
//! external store reached through the [`OverrideSource`] trait; the
//! [`OverrideResolver`] turns the identifiers found in one tile into a single
//! batch lookup.

mod memory;
mod postgres;

pub use memory::InMemoryOverrides;
pub use postgres::{PostgresOverrides, DEFAULT_OVERRIDE_CONNECTIONS, DEFAULT_OVERRIDE_TABLE};

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::BoxFuture;

/// Externally sourced corrections for one feature identifier.
///
/// `None` or an empty string means "leave that attribute alone".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRecord {
    #[serde(rename = "merge_id")]
    pub identifier: String,
    #[serde(rename = "name", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl OverrideRecord {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            display_name: None,
            color: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Replacement name, if one is set and non-empty.
    pub fn name_override(&self) -> Option<&str> {
        self.display_name.as_deref().filter(|s| !s.is_empty())
    }

    /// Replacement colour, if one is set and non-empty.
    pub fn color_override(&self) -> Option<&str> {
        self.color.as_deref().filter(|s| !s.is_empty())
    }
}

/// Resolved overrides keyed by identifier.
pub type OverrideMap = HashMap<String, OverrideRecord>;

/// Errors raised while fetching override records.
#[derive(Debug, Error)]
pub enum OverrideError {
    /// The database query failed.
    #[error("Override database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The configured table name is not a plain SQL identifier.
    #[error("Invalid override table name: '{0}'")]
    InvalidTable(String),

    /// A snapshot file could not be read.
    #[error("Failed to read override snapshot {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A snapshot file is not a JSON array of records.
    #[error("Invalid override snapshot: {0}")]
    SnapshotFormat(#[from] serde_json::Error),

    /// The source cannot answer right now.
    #[error("Override source unavailable: {0}")]
    Unavailable(String),
}

/// Batch key-value lookup of override records.
///
/// Identifiers without a record are simply missing from the result.
pub trait OverrideSource: Send + Sync {
    /// Fetch the records for `identifiers` in one round trip.
    fn fetch_batch<'a>(
        &'a self,
        identifiers: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<OverrideRecord>, OverrideError>>;
}

/// Resolves the identifiers of a tile to override records.
///
/// Identifiers are deduplicated before the lookup, and each call to
/// [`resolve`](Self::resolve) issues at most one batch fetch no matter how
/// many features reference them. An empty identifier set skips the fetch.
#[derive(Clone)]
pub struct OverrideResolver {
    source: Arc<dyn OverrideSource>,
}

impl OverrideResolver {
    pub fn new(source: Arc<dyn OverrideSource>) -> Self {
        Self { source }
    }

    /// Look up override records for `identifiers`.
    pub async fn resolve<I, S>(&self, identifiers: I) -> Result<OverrideMap, OverrideError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let unique: BTreeSet<String> = identifiers.into_iter().map(Into::into).collect();
        if unique.is_empty() {
            return Ok(OverrideMap::new());
        }

        let batch: Vec<String> = unique.into_iter().collect();
        let records = self.source.fetch_batch(&batch).await?;
        debug!(
            requested = batch.len(),
            found = records.len(),
            "Resolved override batch"
        );

        Ok(records
            .into_iter()
            .map(|record| (record.identifier.clone(), record))
            .collect())
    }
}
