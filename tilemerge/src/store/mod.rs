//! Tile storage.
//!
//! The [`TileStore`] trait maps a [`TileCoordinate`] to the raw bytes of a
//! precomputed tile. [`MbTilesStore`] is the production backend, reading the
//! `tiles` table of an MBTiles (SQLite) file.
//!
//! A missing tile is a normal outcome and is reported as `Ok(None)`; only
//! storage failures are errors.

mod mbtiles;

pub use mbtiles::{MbTilesStore, DEFAULT_READ_CONNECTIONS};

use std::path::PathBuf;

use bytes::Bytes;
use thiserror::Error;

use crate::coord::TileCoordinate;
use crate::BoxFuture;

/// Raw tile payload exactly as stored (gzip-compressed vector tile).
///
/// Fetched fresh for every request and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTile(Bytes);

impl RawTile {
    /// Wrap stored bytes.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    /// Borrow the payload.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Take the payload.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Errors raised by tile storage.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The tile database file does not exist or is not a regular file.
    #[error("Tile database not found: {0}")]
    Missing(PathBuf),

    /// The tile database could not be opened.
    #[error("Failed to open tile database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },

    /// The file opened but is not a usable MBTiles database.
    #[error("Invalid tile database {path}: {reason}")]
    Schema { path: PathBuf, reason: String },

    /// A lookup failed or returned a malformed row.
    #[error("Tile query failed: {0}")]
    Query(#[from] sqlx::Error),
}

/// Read-only lookup of tiles by coordinate.
///
/// Implementations are shared across concurrent requests and must be
/// `Send + Sync`. The coordinate is given in the serving (XYZ) convention;
/// any row flip needed by the backing format is the implementation's job.
pub trait TileStore: Send + Sync {
    /// Fetch the tile at `coord`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(tile))` if a tile with a usable payload exists
    /// - `Ok(None)` if no tile is stored, or the stored payload is a
    ///   zero/one byte placeholder
    /// - `Err(_)` if the storage could not be read
    fn fetch(&self, coord: TileCoordinate) -> BoxFuture<'_, Result<Option<RawTile>, StoreError>>;
}
