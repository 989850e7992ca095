//! Settings needed to start [`TileMergeApp`](super::TileMergeApp).

use std::net::SocketAddr;
use std::path::PathBuf;

use super::error::AppError;
use crate::config::ConfigFile;
use crate::service::ResolverFailurePolicy;
use crate::store::DEFAULT_READ_CONNECTIONS;

/// Where override records come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OverrideSourceConfig {
    /// Live table in Postgres.
    Postgres {
        url: String,
        table: String,
        max_connections: u32,
    },
    /// Fixed set of records read once from a JSON file.
    Snapshot(PathBuf),
}

/// Top-level configuration passed to `TileMergeApp::start()`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub mbtiles: PathBuf,
    pub read_connections: u32,
    pub overrides: OverrideSourceConfig,
    pub on_resolver_failure: ResolverFailurePolicy,
}

impl AppConfig {
    /// Create a config with default listen address, pool size and policy.
    pub fn new(mbtiles: impl Into<PathBuf>, overrides: OverrideSourceConfig) -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            mbtiles: mbtiles.into(),
            read_connections: DEFAULT_READ_CONNECTIONS,
            overrides,
            on_resolver_failure: ResolverFailurePolicy::default(),
        }
    }

    pub fn with_resolver_failure_policy(mut self, policy: ResolverFailurePolicy) -> Self {
        self.on_resolver_failure = policy;
        self
    }

    /// Build the application config from a loaded config file.
    ///
    /// A snapshot file wins over a database URL. Fails if no MBTiles file or
    /// no override source is configured.
    pub fn from_config_file(config: &ConfigFile) -> Result<Self, AppError> {
        let mbtiles = config.tiles.mbtiles.clone().ok_or_else(|| {
            AppError::Config("no MBTiles file configured (set [tiles] mbtiles)".to_string())
        })?;

        let overrides = match (&config.overrides.snapshot, &config.overrides.database_url) {
            (Some(snapshot), _) => OverrideSourceConfig::Snapshot(snapshot.clone()),
            (None, Some(url)) => OverrideSourceConfig::Postgres {
                url: url.clone(),
                table: config.overrides.table.clone(),
                max_connections: config.overrides.max_connections,
            },
            (None, None) => {
                return Err(AppError::Config(
                    "no override source configured (set [overrides] database_url or snapshot)"
                        .to_string(),
                ))
            }
        };

        Ok(Self {
            bind: config.server.bind,
            mbtiles,
            read_connections: config.tiles.max_connections,
            overrides,
            on_resolver_failure: config.overrides.on_failure,
        })
    }
}
