//! MBTiles-backed tile store.
//!
//! MBTiles is a SQLite database with a `tiles` table (or view) keyed by
//! `(zoom_level, tile_column, tile_row)` holding a `tile_data` blob. Rows use
//! the TMS convention (origin bottom-left), so every lookup flips the row of
//! the incoming XYZ coordinate exactly once.

use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::debug;

use super::{RawTile, StoreError, TileStore};
use crate::coord::TileCoordinate;
use crate::BoxFuture;

/// Default number of pooled read connections.
pub const DEFAULT_READ_CONNECTIONS: u32 = 8;

const TILE_QUERY: &str = "SELECT tile_data FROM tiles \
     WHERE zoom_level = ? AND tile_column = ? AND tile_row = ?";

const TILES_RELATION_QUERY: &str =
    "SELECT name FROM sqlite_master WHERE type IN ('table', 'view') AND name = 'tiles'";

/// Payloads at or below this size are placeholders, not tiles.
const PLACEHOLDER_MAX_LEN: usize = 1;

/// Read-only handle to an MBTiles file.
///
/// Opened once at startup and shared across requests. Concurrent reads go
/// through a pool of read-only SQLite connections; no extra locking is
/// layered on top.
pub struct MbTilesStore {
    pool: SqlitePool,
    path: PathBuf,
}

impl MbTilesStore {
    /// Open an MBTiles file with the default pool size.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_connections(path, DEFAULT_READ_CONNECTIONS).await
    }

    /// Open an MBTiles file with `max_connections` pooled readers.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing, cannot be opened as SQLite, or has no
    /// `tiles` table or view. These are startup failures.
    pub async fn open_with_connections(
        path: impl AsRef<Path>,
        max_connections: u32,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(StoreError::Missing(path));
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .read_only(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|source| StoreError::Open {
                path: path.clone(),
                source,
            })?;

        let relation = sqlx::query(TILES_RELATION_QUERY)
            .fetch_optional(&pool)
            .await
            .map_err(|source| StoreError::Open {
                path: path.clone(),
                source,
            })?;
        if relation.is_none() {
            pool.close().await;
            return Err(StoreError::Schema {
                path,
                reason: "no 'tiles' table or view".to_string(),
            });
        }

        Ok(Self { pool, path })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn read_tile(&self, coord: TileCoordinate) -> Result<Option<RawTile>, StoreError> {
        let storage_row = coord.storage_row();
        let row = sqlx::query(TILE_QUERY)
            .bind(i64::from(coord.zoom()))
            .bind(to_sql_index(coord.column())?)
            .bind(to_sql_index(storage_row)?)
            .fetch_optional(&self.pool)
            .await?;

        let data: Option<Vec<u8>> = match row {
            Some(row) => row.try_get("tile_data")?,
            None => None,
        };

        match data {
            Some(data) if data.len() > PLACEHOLDER_MAX_LEN => {
                debug!(tile = %coord, storage_row, bytes = data.len(), "Tile found");
                Ok(Some(RawTile::new(data)))
            }
            _ => {
                debug!(tile = %coord, storage_row, "Tile not present");
                Ok(None)
            }
        }
    }
}

impl TileStore for MbTilesStore {
    fn fetch(&self, coord: TileCoordinate) -> BoxFuture<'_, Result<Option<RawTile>, StoreError>> {
        Box::pin(self.read_tile(coord))
    }
}

/// SQLite integers are signed 64-bit.
fn to_sql_index(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|e| StoreError::Query(sqlx::Error::Encode(Box::new(e))))
}
