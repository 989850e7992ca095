//! Inspect command - print the layers of a stored tile without patching it.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use clap::Args;
use tilemerge::codec::{self, DecodedTile, GeomType};
use tilemerge::store::{MbTilesStore, TileStore};

use super::common::{create_runtime, load_config, CoordinateArgs};
use crate::error::CliError;

/// Arguments for the inspect command.
#[derive(Debug, Clone, Args)]
pub struct InspectArgs {
    #[command(flatten)]
    pub coordinate: CoordinateArgs,

    /// MBTiles file to read tiles from
    #[arg(long)]
    pub mbtiles: Option<PathBuf>,
}

/// Per-layer counts shown by `inspect`.
#[derive(Debug, PartialEq, Eq)]
pub struct LayerSummary {
    pub name: String,
    pub features: usize,
    pub buildings: usize,
    pub geometry_types: BTreeSet<GeomType>,
    pub merge_ids: BTreeSet<String>,
}

/// Run the inspect command.
pub fn run(args: InspectArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let coord = args.coordinate.to_coordinate()?;
    let config = load_config(config_path)?;
    let mbtiles = args.mbtiles.or(config.tiles.mbtiles).ok_or_else(|| {
        CliError::Config("no MBTiles file given (use --mbtiles or [tiles] mbtiles)".to_string())
    })?;

    let runtime = create_runtime()?;
    let raw = runtime.block_on(async move {
        let store = MbTilesStore::open_with_connections(&mbtiles, 1).await?;
        let raw = store.fetch(coord).await;
        store.close().await;
        raw
    })?;
    let raw = raw.ok_or(CliError::NotFound(coord))?;
    let tile = codec::decode(&raw)?;

    println!("Tile {} ({} bytes, stored row {})", coord, raw.len(), coord.storage_row());
    for layer in summarize(&tile) {
        println!();
        println!("Layer '{}'", layer.name);
        println!("  Features:  {}", layer.features);
        println!("  Buildings: {}", layer.buildings);
        let types: Vec<String> = layer
            .geometry_types
            .iter()
            .map(|t| format!("{:?}", t))
            .collect();
        println!("  Geometry:  {}", types.join(", "));
        if layer.merge_ids.is_empty() {
            println!("  Merge IDs: none");
        } else {
            let ids: Vec<&str> = layer.merge_ids.iter().map(String::as_str).collect();
            println!("  Merge IDs: {} ({})", ids.len(), ids.join(", "));
        }
    }
    Ok(())
}

/// Summarize each layer of a decoded tile, in tile order.
pub fn summarize(tile: &DecodedTile) -> Vec<LayerSummary> {
    tile.layers
        .iter()
        .map(|layer| LayerSummary {
            name: layer.name.clone(),
            features: layer.features.len(),
            buildings: layer.features.iter().filter(|f| f.is_building()).count(),
            geometry_types: layer.features.iter().map(|f| f.geometry.kind()).collect(),
            merge_ids: layer
                .features
                .iter()
                .filter_map(|f| f.merge_id())
                .map(str::to_string)
                .collect(),
        })
        .collect()
}
