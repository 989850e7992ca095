//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tempfile::TempDir;
use tilemerge::codec::{self, DecodedTile, Feature, GeomType, Geometry, Layer, PropertyValue};
use tilemerge::coord::TileCoordinate;
use tilemerge::overrides::{
    InMemoryOverrides, OverrideError, OverrideRecord, OverrideResolver, OverrideSource,
};
use tilemerge::service::{ResolverFailurePolicy, TileService};
use tilemerge::store::MbTilesStore;
use tilemerge::BoxFuture;

// =============================================================================
// MBTiles fixtures
// =============================================================================

/// Temporary MBTiles file. Rows are written at the stored (flipped) row.
pub struct TileSet {
    _dir: TempDir,
    pub path: PathBuf,
}

impl TileSet {
    pub async fn create(tiles: &[(TileCoordinate, Vec<u8>)]) -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tiles.mbtiles");
        write_mbtiles(&path, tiles).await;
        Self { _dir: dir, path }
    }

    pub async fn open(&self) -> MbTilesStore {
        MbTilesStore::open(&self.path).await.unwrap()
    }
}

async fn write_mbtiles(path: &Path, tiles: &[(TileCoordinate, Vec<u8>)]) {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();

    sqlx::query("CREATE TABLE metadata (name TEXT, value TEXT)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO metadata VALUES ('format', 'pbf')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "CREATE TABLE tiles (zoom_level INTEGER, tile_column INTEGER, \
         tile_row INTEGER, tile_data BLOB)",
    )
    .execute(&pool)
    .await
    .unwrap();

    for (coord, data) in tiles {
        sqlx::query("INSERT INTO tiles VALUES (?, ?, ?, ?)")
            .bind(i64::from(coord.zoom()))
            .bind(coord.column() as i64)
            .bind(coord.storage_row() as i64)
            .bind(data.clone())
            .execute(&pool)
            .await
            .unwrap();
    }
    pool.close().await;
}

// =============================================================================
// Tile content
// =============================================================================

pub fn coord(zoom: u8, column: u64, row: u64) -> TileCoordinate {
    TileCoordinate::new(zoom, column, row).unwrap()
}

pub fn feature(props: &[(&str, &str)]) -> Feature {
    let properties = props
        .iter()
        .map(|(k, v)| (k.to_string(), PropertyValue::from(*v)))
        .collect();
    Feature::new(
        None,
        Geometry::new(GeomType::Polygon, vec![9, 0, 0, 26, 20, 0, 0, 20, 19, 0, 15]),
        properties,
    )
}

/// Three buildings (`w1`, `w2`, `w1`), a road sharing `w1`, and a park
/// without an identifier.
pub fn city_block() -> DecodedTile {
    let mut buildings = Layer::new("building");
    buildings.features.push(feature(&[
        ("merge_id", "w1"),
        ("building", "yes"),
        ("name", "Old Name"),
        ("color", "#BDBDBD"),
    ]));
    buildings.features.push(feature(&[
        ("merge_id", "w2"),
        ("building", "yes"),
        ("name", "Warehouse"),
        ("color", "#BDBDBD"),
    ]));
    buildings.features.push(feature(&[
        ("merge_id", "w1"),
        ("building", "yes"),
        ("name", "Old Name Annex"),
    ]));

    let mut roads = Layer::new("transportation");
    roads.features.push(feature(&[("merge_id", "w1"), ("name", "Main St")]));

    let mut parks = Layer::new("park");
    parks.features.push(feature(&[("name", "Green")]));

    DecodedTile {
        layers: vec![buildings, roads, parks],
    }
}

pub fn encoded(tile: &DecodedTile) -> Vec<u8> {
    codec::encode(tile).unwrap().into_bytes().to_vec()
}

pub fn name_of(feature: &Feature) -> Option<&str> {
    feature.properties.get("name").and_then(PropertyValue::as_str)
}

pub fn color_of(feature: &Feature) -> Option<&str> {
    feature.properties.get("color").and_then(PropertyValue::as_str)
}

// =============================================================================
// Override sources
// =============================================================================

/// Override source that records every batch it is asked for.
pub struct RecordingSource {
    inner: InMemoryOverrides,
    calls: Mutex<Vec<Vec<String>>>,
}

impl RecordingSource {
    pub fn new(records: Vec<OverrideRecord>) -> Self {
        Self {
            inner: InMemoryOverrides::from_records(records),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl OverrideSource for RecordingSource {
    fn fetch_batch<'a>(
        &'a self,
        identifiers: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<OverrideRecord>, OverrideError>> {
        self.calls.lock().unwrap().push(identifiers.to_vec());
        self.inner.fetch_batch(identifiers)
    }
}

/// Override source whose every lookup fails.
pub struct UnreachableSource;

impl OverrideSource for UnreachableSource {
    fn fetch_batch<'a>(
        &'a self,
        _identifiers: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<OverrideRecord>, OverrideError>> {
        Box::pin(async { Err(OverrideError::Unavailable("connection refused".to_string())) })
    }
}

pub fn city_hall_overrides() -> Vec<OverrideRecord> {
    vec![
        OverrideRecord::new("w1")
            .with_display_name("City Hall")
            .with_color("#00A65E"),
        OverrideRecord::new("w9").with_display_name("Not In This Tile"),
    ]
}

pub async fn service(
    tiles: &TileSet,
    source: Arc<dyn OverrideSource>,
    policy: ResolverFailurePolicy,
) -> TileService {
    let store = Arc::new(tiles.open().await);
    TileService::new(store, OverrideResolver::new(source)).with_resolver_failure_policy(policy)
}
