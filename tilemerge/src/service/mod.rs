//! Tile service: the per-request pipeline.
//!
//! ```text
//! Fetching ──► Decoding ──► Resolving ──► Patching ──► Encoding ──► Responding
//!    │            │             │
//!    ▼            ▼             ▼
//! NotFound    Decode error   degrade (serve unpatched) or Resolver error
//! ```
//!
//! Each request runs the stages once, in order, with no retries. The
//! service holds only shared read-only handles, so a request future can be
//! dropped between any two stages (client disconnect) without side effects.

mod error;

pub use error::{ResolverFailurePolicy, Stage, TileServiceError};

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::codec::{self, CONTENT_ENCODING, CONTENT_TYPE};
use crate::coord::TileCoordinate;
use crate::overrides::{OverrideMap, OverrideResolver};
use crate::patch::{self, PatchStats};
use crate::store::TileStore;

/// A patched tile ready to send.
#[derive(Debug, Clone)]
pub struct PatchedTile {
    /// Gzip-compressed vector tile.
    pub data: Bytes,
    /// What the patch pass changed.
    pub stats: PatchStats,
    /// True when overrides could not be fetched and the tile is unpatched.
    pub degraded: bool,
}

impl PatchedTile {
    pub fn content_type(&self) -> &'static str {
        CONTENT_TYPE
    }

    pub fn content_encoding(&self) -> &'static str {
        CONTENT_ENCODING
    }
}

/// Serves tiles with overrides applied.
///
/// Collaborators are passed in at construction; the service is cheap to
/// share behind an `Arc` across request handlers.
pub struct TileService {
    store: Arc<dyn TileStore>,
    resolver: OverrideResolver,
    on_resolver_failure: ResolverFailurePolicy,
}

impl TileService {
    /// Create a service that degrades on override lookup failures.
    pub fn new(store: Arc<dyn TileStore>, resolver: OverrideResolver) -> Self {
        Self {
            store,
            resolver,
            on_resolver_failure: ResolverFailurePolicy::default(),
        }
    }

    /// Set the override lookup failure policy.
    pub fn with_resolver_failure_policy(mut self, policy: ResolverFailurePolicy) -> Self {
        self.on_resolver_failure = policy;
        self
    }

    pub fn resolver_failure_policy(&self) -> ResolverFailurePolicy {
        self.on_resolver_failure
    }

    /// Fetch, patch and re-encode the tile at `coord`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(tile))` with the patched, gzip-compressed tile
    /// - `Ok(None)` if no tile is stored at `coord`
    /// - `Err(_)` if the request failed; see [`TileServiceError::stage`]
    pub async fn get_tile(
        &self,
        coord: TileCoordinate,
    ) -> Result<Option<PatchedTile>, TileServiceError> {
        debug!(tile = %coord, stage = %Stage::Fetching, "Tile request");
        let raw = match self.store.fetch(coord).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(tile = %coord, "Tile not present");
                return Ok(None);
            }
            Err(source) => return Err(TileServiceError::Storage { coord, source }),
        };

        debug!(tile = %coord, stage = %Stage::Decoding, bytes = raw.len());
        let mut tile =
            codec::decode(&raw).map_err(|source| TileServiceError::Decode { coord, source })?;
        drop(raw);

        debug!(tile = %coord, stage = %Stage::Resolving, features = tile.feature_count());
        let (overrides, degraded) = match self.resolver.resolve(tile.merge_ids()).await {
            Ok(overrides) => (overrides, false),
            Err(source) => match self.on_resolver_failure {
                ResolverFailurePolicy::Degrade => {
                    warn!(tile = %coord, error = %source, "Override lookup failed, serving unpatched tile");
                    (OverrideMap::new(), true)
                }
                ResolverFailurePolicy::Fail => {
                    return Err(TileServiceError::Resolver { coord, source });
                }
            },
        };

        debug!(tile = %coord, stage = %Stage::Patching, overrides = overrides.len());
        let stats = patch::apply_overrides(&mut tile, &overrides);

        debug!(tile = %coord, stage = %Stage::Encoding, %stats);
        let encoded =
            codec::encode(&tile).map_err(|source| TileServiceError::Encode { coord, source })?;

        debug!(tile = %coord, stage = %Stage::Responding, bytes = encoded.len());
        Ok(Some(PatchedTile {
            data: encoded.into_bytes(),
            stats,
            degraded,
        }))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::codec::{
        DecodedTile, Feature, GeomType, Geometry, Layer, Properties, PropertyValue,
    };
    use crate::overrides::tests::RecordingSource;
    use crate::overrides::{OverrideError, OverrideRecord, OverrideSource};
    use crate::store::{RawTile, StoreError};
    use crate::BoxFuture;

    /// Tile store over a fixed map, keyed by serving coordinate.
    #[derive(Default)]
    pub struct MemoryStore {
        tiles: HashMap<TileCoordinate, RawTile>,
        pub fetches: Mutex<usize>,
    }

    impl MemoryStore {
        pub fn with_tile(mut self, coord: TileCoordinate, tile: RawTile) -> Self {
            self.tiles.insert(coord, tile);
            self
        }
    }

    impl TileStore for MemoryStore {
        fn fetch(
            &self,
            coord: TileCoordinate,
        ) -> BoxFuture<'_, Result<Option<RawTile>, StoreError>> {
            *self.fetches.lock().unwrap() += 1;
            let tile = self.tiles.get(&coord).cloned();
            Box::pin(async move { Ok(tile) })
        }
    }

    struct BrokenStore;

    impl TileStore for BrokenStore {
        fn fetch(
            &self,
            _coord: TileCoordinate,
        ) -> BoxFuture<'_, Result<Option<RawTile>, StoreError>> {
            Box::pin(async { Err(StoreError::Query(sqlx::Error::PoolClosed)) })
        }
    }

    struct DownSource;

    impl OverrideSource for DownSource {
        fn fetch_batch<'a>(
            &'a self,
            _identifiers: &'a [String],
        ) -> BoxFuture<'a, Result<Vec<OverrideRecord>, OverrideError>> {
            Box::pin(async { Err(OverrideError::Unavailable("connection refused".to_string())) })
        }
    }

    fn coord() -> TileCoordinate {
        TileCoordinate::new(14, 4578, 5980).unwrap()
    }

    fn feature(props: &[(&str, PropertyValue)]) -> Feature {
        let properties: Properties = props.iter().cloned().collect();
        Feature::new(None, Geometry::new(GeomType::Point, vec![9, 10, 10]), properties)
    }

    pub fn sample_tile() -> DecodedTile {
        let mut buildings = Layer::new("building");
        for id in ["w1", "w2", "w1"] {
            buildings.features.push(feature(&[
                ("merge_id", id.into()),
                ("building", "yes".into()),
                ("name", "Unnamed".into()),
                ("color", "#BDBDBD".into()),
            ]));
        }
        let mut roads = Layer::new("road");
        roads.features.push(feature(&[
            ("merge_id", "w1".into()),
            ("name", "Queen St".into()),
        ]));
        roads.features.push(feature(&[("name", "Lane".into())]));
        DecodedTile {
            layers: vec![buildings, roads],
        }
    }

    fn service_with(source: Arc<dyn OverrideSource>, store: MemoryStore) -> TileService {
        TileService::new(Arc::new(store), OverrideResolver::new(source))
    }

    #[tokio::test]
    async fn test_get_tile_patches_and_encodes() {
        let source = Arc::new(RecordingSource::new(vec![OverrideRecord::new("w1")
            .with_display_name("City Hall")
            .with_color("#00A65E")]));
        let store = MemoryStore::default().with_tile(coord(), codec::encode(&sample_tile()).unwrap());
        let service = service_with(source.clone(), store);

        let patched = service.get_tile(coord()).await.unwrap().unwrap();
        let tile = codec::decode_bytes(&patched.data).unwrap();

        let first = &tile.layers[0].features[0];
        assert_eq!(first.properties.get("name"), Some(&PropertyValue::from("City Hall")));
        assert_eq!(first.properties.get("color"), Some(&PropertyValue::from("#00A65E")));
        let second = &tile.layers[0].features[1];
        assert_eq!(second.properties.get("name"), Some(&PropertyValue::from("Unnamed")));
        let road = &tile.layers[1].features[0];
        assert_eq!(road.properties.get("name"), Some(&PropertyValue::from("City Hall")));
        assert_eq!(road.properties.get("color"), None);

        assert_eq!(patched.stats.renamed, 3);
        assert_eq!(patched.stats.recolored, 2);
        assert!(!patched.degraded);
        assert_eq!(patched.content_type(), "application/x-protobuf");
        assert_eq!(patched.content_encoding(), "gzip");
    }

    #[tokio::test]
    async fn test_one_batch_with_unique_identifiers() {
        let source = Arc::new(RecordingSource::new(vec![]));
        let store = MemoryStore::default().with_tile(coord(), codec::encode(&sample_tile()).unwrap());
        let service = service_with(source.clone(), store);

        service.get_tile(coord()).await.unwrap();

        let calls = source.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], vec!["w1", "w2"]);
    }

    #[tokio::test]
    async fn test_missing_tile_is_none() {
        let source = Arc::new(RecordingSource::new(vec![]));
        let service = service_with(source.clone(), MemoryStore::default());

        let result = service.get_tile(coord()).await.unwrap();

        assert!(result.is_none());
        assert!(source.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_tile_is_decode_error() {
        let source = Arc::new(RecordingSource::new(vec![]));
        let store = MemoryStore::default().with_tile(coord(), RawTile::new(&b"not a tile"[..]));
        let service = service_with(source.clone(), store);

        let err = service.get_tile(coord()).await.unwrap_err();

        assert!(matches!(err, TileServiceError::Decode { .. }));
        assert_eq!(err.stage(), Stage::Decoding);
        assert!(source.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure() {
        let service = TileService::new(
            Arc::new(BrokenStore),
            OverrideResolver::new(Arc::new(RecordingSource::new(vec![]))),
        );

        let err = service.get_tile(coord()).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Fetching);
    }

    #[tokio::test]
    async fn test_resolver_failure_degrades_by_default() {
        let original = codec::encode(&sample_tile()).unwrap();
        let store = MemoryStore::default().with_tile(coord(), original);
        let service = service_with(Arc::new(DownSource), store);

        let patched = service.get_tile(coord()).await.unwrap().unwrap();

        assert!(patched.degraded);
        assert_eq!(patched.stats.matched, 0);
        assert_eq!(codec::decode_bytes(&patched.data).unwrap(), sample_tile());
    }

    #[tokio::test]
    async fn test_resolver_failure_can_fail_request() {
        let store = MemoryStore::default().with_tile(coord(), codec::encode(&sample_tile()).unwrap());
        let service = service_with(Arc::new(DownSource), store)
            .with_resolver_failure_policy(ResolverFailurePolicy::Fail);

        let err = service.get_tile(coord()).await.unwrap_err();

        assert!(matches!(err, TileServiceError::Resolver { .. }));
        assert_eq!(err.coord(), coord());
    }

    #[tokio::test]
    async fn test_requests_are_idempotent() {
        let source = Arc::new(RecordingSource::new(vec![
            OverrideRecord::new("w2").with_display_name("Library"),
        ]));
        let store = MemoryStore::default().with_tile(coord(), codec::encode(&sample_tile()).unwrap());
        let service = service_with(source, store);

        let first = service.get_tile(coord()).await.unwrap().unwrap();
        let second = service.get_tile(coord()).await.unwrap().unwrap();

        assert_eq!(
            codec::decode_bytes(&first.data).unwrap(),
            codec::decode_bytes(&second.data).unwrap()
        );
    }
}
