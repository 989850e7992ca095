//! Tile command - run the full pipeline for one tile and save the result.

use std::path::{Path, PathBuf};

use clap::Args;
use tilemerge::app::{AppConfig, TileMergeApp};

use super::common::{create_runtime, load_config, CoordinateArgs, SourceArgs};
use crate::error::CliError;

/// Arguments for the tile command.
#[derive(Debug, Clone, Args)]
pub struct TileArgs {
    #[command(flatten)]
    pub coordinate: CoordinateArgs,

    /// Output file for the patched gzip tile
    #[arg(long, short)]
    pub output: PathBuf,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Run the tile command.
pub fn run(args: TileArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let coord = args.coordinate.to_coordinate()?;
    let mut config = load_config(config_path)?;
    args.source.apply(&mut config);
    let app_config = AppConfig::from_config_file(&config)?;

    let runtime = create_runtime()?;
    let tile = runtime.block_on(async move {
        let app = TileMergeApp::start(app_config).await?;
        let tile = app.service().get_tile(coord).await;
        app.shutdown().await;
        Ok::<_, CliError>(tile?)
    })?;
    let tile = tile.ok_or(CliError::NotFound(coord))?;

    std::fs::write(&args.output, &tile.data).map_err(|error| CliError::FileWrite {
        path: args.output.clone(),
        error,
    })?;

    println!("Tile {}: {}", coord, tile.stats);
    if tile.degraded {
        println!("Warning: override lookup failed, tile saved without overrides");
    }
    println!("Saved {} bytes to {}", tile.data.len(), args.output.display());
    Ok(())
}
