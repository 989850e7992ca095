//! CLI error handling with user-friendly messages.

use std::fmt;
use std::path::PathBuf;
use std::process;

use tilemerge::app::AppError;
use tilemerge::codec::CodecError;
use tilemerge::config::ConfigFileError;
use tilemerge::coord::{CoordError, TileCoordinate};
use tilemerge::service::TileServiceError;
use tilemerge::store::StoreError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Missing or inconsistent settings
    Config(String),
    /// Config file could not be read or written
    ConfigFile(ConfigFileError),
    /// Failed to create the Tokio runtime
    Runtime(std::io::Error),
    /// Failed to install the Ctrl-C handler
    SignalHandler(ctrlc::Error),
    /// Server startup or shutdown failed
    App(AppError),
    /// Tile coordinate out of range
    Coordinate(CoordError),
    /// No tile stored at the coordinate
    NotFound(TileCoordinate),
    /// Tile store could not be opened or read
    Store(StoreError),
    /// Stored tile could not be decoded
    Decode(CodecError),
    /// Tile pipeline failed
    Tile(TileServiceError),
    /// Failed to write output file
    FileWrite { path: PathBuf, error: std::io::Error },
}

impl CliError {
    /// Exit the process with an error message and code 1.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        let hint = self.hint();
        if !hint.is_empty() {
            eprintln!();
            for line in hint {
                eprintln!("{}", line);
            }
        }

        process::exit(1)
    }

    /// Follow-up lines printed under the error message.
    fn hint(&self) -> &'static [&'static str] {
        match self {
            CliError::Config(_) | CliError::App(AppError::Config(_)) => &[
                "Run 'tilemerge init' to create a config file, then set",
                "[tiles] mbtiles and [overrides] database_url or snapshot.",
            ],
            CliError::App(AppError::Bind { .. }) => &[
                "Is another server already listening on that address?",
                "Use --bind or [server] bind to pick another one.",
            ],
            _ => &[],
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Runtime(e) => write!(f, "Failed to create Tokio runtime: {}", e),
            CliError::SignalHandler(e) => write!(f, "Failed to set Ctrl-C handler: {}", e),
            CliError::App(e) => write!(f, "{}", e),
            CliError::Coordinate(e) => write!(f, "{}", e),
            CliError::NotFound(coord) => write!(f, "No tile stored at {}", coord),
            CliError::Store(e) => write!(f, "{}", e),
            CliError::Decode(e) => write!(f, "Failed to decode tile: {}", e),
            CliError::Tile(e) => write!(f, "{}", e),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path.display(), error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::SignalHandler(e) => Some(e),
            CliError::App(e) => Some(e),
            CliError::Coordinate(e) => Some(e),
            CliError::Store(e) => Some(e),
            CliError::Decode(e) => Some(e),
            CliError::Tile(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<AppError> for CliError {
    fn from(e: AppError) -> Self {
        CliError::App(e)
    }
}

impl From<CoordError> for CliError {
    fn from(e: CoordError) -> Self {
        CliError::Coordinate(e)
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        CliError::Store(e)
    }
}

impl From<CodecError> for CliError {
    fn from(e: CodecError) -> Self {
        CliError::Decode(e)
    }
}

impl From<TileServiceError> for CliError {
    fn from(e: TileServiceError) -> Self {
        CliError::Tile(e)
    }
}
