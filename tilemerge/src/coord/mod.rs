//! Tile coordinates and the serving/storage row conversion.
//!
//! Tiles are requested in the XYZ convention (row 0 at the top of the map)
//! while MBTiles stores them in the TMS convention (row 0 at the bottom).

mod types;

pub use types::{grid_dimension, CoordError, TileCoordinate, MAX_ZOOM, MIN_ZOOM};
