//! Application error types.

use std::fmt;
use std::io;
use std::net::SocketAddr;

use crate::overrides::OverrideError;
use crate::store::StoreError;

/// Errors that can occur while starting or running the server.
#[derive(Debug)]
pub enum AppError {
    /// Missing or inconsistent settings.
    Config(String),

    /// The MBTiles file could not be opened.
    Store(StoreError),

    /// The override source could not be created.
    Overrides(OverrideError),

    /// The listen address could not be bound.
    Bind { addr: SocketAddr, source: io::Error },

    /// The server stopped with an I/O error.
    Serve(io::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Store(e) => write!(f, "Failed to open tile store: {}", e),
            AppError::Overrides(e) => write!(f, "Failed to set up override source: {}", e),
            AppError::Bind { addr, source } => {
                write!(f, "Failed to bind {}: {}", addr, source)
            }
            AppError::Serve(e) => write!(f, "Server error: {}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(_) => None,
            AppError::Store(e) => Some(e),
            AppError::Overrides(e) => Some(e),
            AppError::Bind { source, .. } => Some(source),
            AppError::Serve(e) => Some(e),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Store(e)
    }
}

impl From<OverrideError> for AppError {
    fn from(e: OverrideError) -> Self {
        AppError::Overrides(e)
    }
}
