//! TileMerge CLI - Command-line interface
//!
//! Runs the tile server and offers one-off tile commands on top of the
//! `tilemerge` library.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::inspect::InspectArgs;
use commands::serve::ServeArgs;
use commands::tile::TileArgs;

#[derive(Parser)]
#[command(name = "tilemerge")]
#[command(version, about = "Serve MBTiles vector tiles with live name and colour overrides", long_about = None)]
struct Cli {
    /// Config file (default: ~/.tilemerge/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init,
    /// Run the tile server
    Serve(ServeArgs),
    /// Patch one tile and save it to a file
    Tile(TileArgs),
    /// Print the layers and merge IDs of a stored tile
    Inspect(InspectArgs),
}

fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Init => commands::init::run(config_path),
        Commands::Serve(args) => commands::serve::run(args, config_path),
        Commands::Tile(args) => commands::tile::run(args, config_path),
        Commands::Inspect(args) => commands::inspect::run(args, config_path),
    };

    if let Err(e) = result {
        e.exit();
    }
}
