//! Application bootstrap and lifecycle.
//!
//! [`TileMergeApp`] opens the tile store, builds the override source named by
//! the configuration and wires both into a [`TileService`](crate::service::TileService)
//! behind the HTTP router.
//!
//! ```ignore
//! use tilemerge::app::{AppConfig, TileMergeApp};
//! use tilemerge::config::ConfigFile;
//!
//! let config = AppConfig::from_config_file(&ConfigFile::load()?)?;
//! let app = TileMergeApp::start(config).await?;
//! app.serve(shutdown_token).await?;
//! ```

mod bootstrap;
mod config;
mod error;

pub use bootstrap::TileMergeApp;
pub use config::{AppConfig, OverrideSourceConfig};
pub use error::AppError;
