//! Coordinate type definitions

use std::fmt;

use thiserror::Error;

/// Lowest zoom level of the pyramid.
pub const MIN_ZOOM: u8 = 0;

/// Highest zoom level accepted by the tile endpoint.
///
/// Grid indices at this zoom still fit comfortably in a `u64` and in the
/// signed 64-bit integer columns of an MBTiles table.
pub const MAX_ZOOM: u8 = 30;

/// Tile coordinate in the serving (XYZ, top-left origin) convention.
///
/// `row` grows southward from the top edge of the map. The storage layer
/// indexes rows from the bottom edge instead; use [`TileCoordinate::storage_row`]
/// to convert.
///
/// Fields are private so that every value has passed grid validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoordinate {
    zoom: u8,
    column: u64,
    row: u64,
}

impl TileCoordinate {
    /// Creates a coordinate, validating it against the grid of its zoom level.
    pub fn new(zoom: u8, column: u64, row: u64) -> Result<Self, CoordError> {
        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(zoom));
        }
        let dimension = grid_dimension(zoom);
        if column >= dimension || row >= dimension {
            return Err(CoordError::OutOfGrid { zoom, column, row });
        }
        Ok(Self { zoom, column, row })
    }

    /// Zoom level.
    #[inline]
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// X coordinate (west to east).
    #[inline]
    pub fn column(&self) -> u64 {
        self.column
    }

    /// Y coordinate in the serving convention (north to south).
    #[inline]
    pub fn row(&self) -> u64 {
        self.row
    }

    /// Row index in the bottom-left origin convention used by MBTiles.
    ///
    /// `storage_row = (2^zoom - 1) - row`. Applying this exactly once per
    /// lookup is what keeps tiles from being served vertically mirrored.
    #[inline]
    pub fn storage_row(&self) -> u64 {
        (grid_dimension(self.zoom) - 1) - self.row
    }
}

impl fmt::Display for TileCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.column, self.row)
    }
}

/// Number of tiles along one axis at `zoom`.
#[inline]
pub fn grid_dimension(zoom: u8) -> u64 {
    1u64 << zoom
}

/// Errors that can occur while building a tile coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordError {
    /// Zoom level is above [`MAX_ZOOM`]
    #[error("Invalid zoom level: {0} (must be between {} and {})", MIN_ZOOM, MAX_ZOOM)]
    InvalidZoom(u8),

    /// Column or row lies outside the 2^zoom grid
    #[error("Tile {zoom}/{column}/{row} lies outside the zoom {zoom} grid")]
    OutOfGrid { zoom: u8, column: u64, row: u64 },
}
