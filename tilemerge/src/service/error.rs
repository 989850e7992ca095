//! Tile service error types.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::codec::CodecError;
use crate::coord::TileCoordinate;
use crate::overrides::OverrideError;
use crate::store::StoreError;

/// Pipeline stage of a tile request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Decoding,
    Resolving,
    Patching,
    Encoding,
    Responding,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetching => "fetching",
            Stage::Decoding => "decoding",
            Stage::Resolving => "resolving",
            Stage::Patching => "patching",
            Stage::Encoding => "encoding",
            Stage::Responding => "responding",
        };
        f.write_str(name)
    }
}

/// Errors that end a tile request.
///
/// A missing tile is not an error; see [`TileService::get_tile`](super::TileService::get_tile).
#[derive(Debug, Error)]
pub enum TileServiceError {
    /// The tile store could not be read.
    #[error("Storage failure for tile {coord}: {source}")]
    Storage {
        coord: TileCoordinate,
        #[source]
        source: StoreError,
    },

    /// The stored tile is not a valid compressed vector tile.
    #[error("Tile {coord} failed to decode: {source}")]
    Decode {
        coord: TileCoordinate,
        #[source]
        source: CodecError,
    },

    /// The override lookup failed and the policy is [`ResolverFailurePolicy::Fail`].
    #[error("Override lookup failed for tile {coord}: {source}")]
    Resolver {
        coord: TileCoordinate,
        #[source]
        source: OverrideError,
    },

    /// The patched tile could not be encoded.
    #[error("Tile {coord} failed to encode: {source}")]
    Encode {
        coord: TileCoordinate,
        #[source]
        source: CodecError,
    },
}

impl TileServiceError {
    /// Stage the request failed in.
    pub fn stage(&self) -> Stage {
        match self {
            TileServiceError::Storage { .. } => Stage::Fetching,
            TileServiceError::Decode { .. } => Stage::Decoding,
            TileServiceError::Resolver { .. } => Stage::Resolving,
            TileServiceError::Encode { .. } => Stage::Encoding,
        }
    }

    /// Coordinate of the failed request.
    pub fn coord(&self) -> TileCoordinate {
        match self {
            TileServiceError::Storage { coord, .. }
            | TileServiceError::Decode { coord, .. }
            | TileServiceError::Resolver { coord, .. }
            | TileServiceError::Encode { coord, .. } => *coord,
        }
    }
}

/// What to do when the override lookup fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolverFailurePolicy {
    /// Log a warning and serve the tile unpatched.
    #[default]
    Degrade,
    /// Fail the request.
    Fail,
}

impl ResolverFailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolverFailurePolicy::Degrade => "degrade",
            ResolverFailurePolicy::Fail => "fail",
        }
    }
}

impl fmt::Display for ResolverFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolverFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "degrade" => Ok(ResolverFailurePolicy::Degrade),
            "fail" => Ok(ResolverFailurePolicy::Fail),
            other => Err(format!("unknown resolver failure policy '{}'", other)),
        }
    }
}
