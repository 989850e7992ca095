//! Argument groups and helpers shared across commands.

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use tilemerge::config::{config_file_path, ConfigFile};
use tilemerge::coord::TileCoordinate;
use tilemerge::service::ResolverFailurePolicy;
use tokio::runtime::Runtime;

use crate::error::CliError;

/// Override lookup failure policy for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Serve the tile without overrides
    Degrade,
    /// Fail the request
    Fail,
}

impl From<FailurePolicy> for ResolverFailurePolicy {
    fn from(policy: FailurePolicy) -> Self {
        match policy {
            FailurePolicy::Degrade => ResolverFailurePolicy::Degrade,
            FailurePolicy::Fail => ResolverFailurePolicy::Fail,
        }
    }
}

/// Tile and override source flags. Each one replaces the config file value.
#[derive(Debug, Clone, Default, Args)]
pub struct SourceArgs {
    /// MBTiles file to read tiles from
    #[arg(long)]
    pub mbtiles: Option<PathBuf>,

    /// Postgres URL of the override database
    #[arg(long)]
    pub database_url: Option<String>,

    /// JSON file of override records, used instead of the database
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Override table name
    #[arg(long)]
    pub table: Option<String>,

    /// What to do when the override lookup fails
    #[arg(long, value_enum)]
    pub on_failure: Option<FailurePolicy>,
}

impl SourceArgs {
    /// Overlay the given flags onto `config`.
    pub fn apply(self, config: &mut ConfigFile) {
        if let Some(mbtiles) = self.mbtiles {
            config.tiles.mbtiles = Some(mbtiles);
        }
        if let Some(url) = self.database_url {
            // A snapshot from the file would otherwise take priority.
            config.overrides.snapshot = None;
            config.overrides.database_url = Some(url);
        }
        if let Some(snapshot) = self.snapshot {
            config.overrides.snapshot = Some(snapshot);
        }
        if let Some(table) = self.table {
            config.overrides.table = table;
        }
        if let Some(policy) = self.on_failure {
            config.overrides.on_failure = policy.into();
        }
    }
}

/// Tile address in XYZ scheme.
#[derive(Debug, Clone, Args)]
pub struct CoordinateArgs {
    /// Zoom level
    pub z: u8,
    /// Column
    pub x: u64,
    /// Row, counted from the top (XYZ)
    pub y: u64,
}

impl CoordinateArgs {
    pub fn to_coordinate(&self) -> Result<TileCoordinate, CliError> {
        Ok(TileCoordinate::new(self.z, self.x, self.y)?)
    }
}

/// Resolve the config file path: `--config` or `~/.tilemerge/config.ini`.
pub fn resolve_config_path(cli_path: Option<&Path>) -> PathBuf {
    cli_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path)
}

/// Load the config file, falling back to defaults if it does not exist.
pub fn load_config(cli_path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let config = match cli_path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    Ok(config)
}

/// Multi-threaded runtime for async commands.
pub fn create_runtime() -> Result<Runtime, CliError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)
}
