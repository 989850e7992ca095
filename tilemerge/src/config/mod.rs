//! Configuration file handling for `~/.tilemerge/config.ini`.
//!
//! ```ini
//! [server]
//! bind = 0.0.0.0:8080
//!
//! [tiles]
//! mbtiles = ~/tiles/city.mbtiles
//!
//! [overrides]
//! database_url = postgres://tiles@localhost/places
//! on_failure = degrade
//! ```

mod file;
mod parser;
mod settings;
mod writer;

pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    ConfigFile, LoggingSettings, OverridesSettings, ServerSettings, TilesSettings,
};
