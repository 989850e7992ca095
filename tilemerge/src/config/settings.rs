//! Settings structs, one per `[section]` of the config file.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::logging::{default_log_dir, default_log_file};
use crate::overrides::{DEFAULT_OVERRIDE_CONNECTIONS, DEFAULT_OVERRIDE_TABLE};
use crate::service::ResolverFailurePolicy;
use crate::store::DEFAULT_READ_CONNECTIONS;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub server: ServerSettings,
    pub tiles: TilesSettings,
    pub overrides: OverridesSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    /// Address the HTTP listener binds to
    pub bind: SocketAddr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TilesSettings {
    /// MBTiles file to serve. Required by `serve`, `tile` and `inspect`.
    pub mbtiles: Option<PathBuf>,
    /// Size of the read-only SQLite pool
    pub max_connections: u32,
}

/// Override store settings.
///
/// When `snapshot` is set it takes precedence over `database_url`.
#[derive(Debug, Clone, PartialEq)]
pub struct OverridesSettings {
    pub database_url: Option<String>,
    pub snapshot: Option<PathBuf>,
    pub table: String,
    pub max_connections: u32,
    pub on_failure: ResolverFailurePolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            },
            tiles: TilesSettings {
                mbtiles: None,
                max_connections: DEFAULT_READ_CONNECTIONS,
            },
            overrides: OverridesSettings {
                database_url: None,
                snapshot: None,
                table: DEFAULT_OVERRIDE_TABLE.to_string(),
                max_connections: DEFAULT_OVERRIDE_CONNECTIONS,
                on_failure: ResolverFailurePolicy::default(),
            },
            logging: LoggingSettings {
                directory: PathBuf::from(default_log_dir()),
                file: default_log_file().to_string(),
            },
        }
    }
}
