//! Startup sequence and server loop.

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::config::{AppConfig, OverrideSourceConfig};
use super::error::AppError;
use crate::http;
use crate::overrides::{InMemoryOverrides, OverrideResolver, OverrideSource, PostgresOverrides};
use crate::service::TileService;
use crate::store::MbTilesStore;

/// The tile server with its store and override source.
///
/// Startup order:
/// 1. Open the MBTiles file (fails fast if missing or not a tile set)
/// 2. Build the override source (Postgres pool connects lazily)
/// 3. Wire both into the [`TileService`]
pub struct TileMergeApp {
    store: Arc<MbTilesStore>,
    service: Arc<TileService>,
    config: AppConfig,
}

impl TileMergeApp {
    /// Open the store and build the service.
    ///
    /// # Errors
    ///
    /// Returns an error if the MBTiles file cannot be opened, the override
    /// snapshot cannot be read, or the database URL or table name is invalid.
    /// An unreachable database is not a startup error; lookups degrade per
    /// request according to the failure policy.
    pub async fn start(config: AppConfig) -> Result<Self, AppError> {
        info!(mbtiles = %config.mbtiles.display(), "Starting tile server");

        let store = Arc::new(
            MbTilesStore::open_with_connections(&config.mbtiles, config.read_connections).await?,
        );
        info!(
            path = %store.path().display(),
            max_connections = config.read_connections,
            "Tile store opened"
        );

        let source = Self::create_override_source(&config.overrides)?;
        let service = TileService::new(store.clone(), OverrideResolver::new(source))
            .with_resolver_failure_policy(config.on_resolver_failure);
        info!(on_failure = %service.resolver_failure_policy(), "Tile service ready");

        Ok(Self {
            store,
            service: Arc::new(service),
            config,
        })
    }

    fn create_override_source(
        config: &OverrideSourceConfig,
    ) -> Result<Arc<dyn OverrideSource>, AppError> {
        match config {
            OverrideSourceConfig::Postgres {
                url,
                table,
                max_connections,
            } => Ok(Arc::new(PostgresOverrides::connect_lazy(
                url,
                table,
                *max_connections,
            )?)),
            OverrideSourceConfig::Snapshot(path) => {
                let source = InMemoryOverrides::from_json_file(path)?;
                info!(path = %path.display(), records = source.len(), "Using override snapshot");
                Ok(Arc::new(source))
            }
        }
    }

    /// The shared tile service.
    pub fn service(&self) -> Arc<TileService> {
        Arc::clone(&self.service)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// HTTP router over the shared service.
    pub fn router(&self) -> Router {
        http::router(self.service())
    }

    /// Bind the configured address and serve until `shutdown` is cancelled.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<(), AppError> {
        let addr = self.config.bind;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| AppError::Bind { addr, source })?;
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` is cancelled.
    ///
    /// In-flight requests finish before this returns. The store is closed
    /// afterwards.
    pub async fn serve_on(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), AppError> {
        let local_addr = listener.local_addr().map_err(AppError::Serve)?;
        info!(addr = %local_addr, "Tile server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(AppError::Serve)?;

        self.shutdown().await;
        Ok(())
    }

    /// Close the tile store.
    pub async fn shutdown(&self) {
        self.store.close().await;
        info!("Tile server stopped");
    }
}
