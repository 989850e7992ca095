//! Init command - write a default configuration file.

use std::path::Path;

use tilemerge::config::ConfigFile;

use super::common::resolve_config_path;
use crate::error::CliError;

/// Run the init command.
pub fn run(config_path: Option<&Path>) -> Result<(), CliError> {
    let path = resolve_config_path(config_path);

    if ConfigFile::ensure_exists_at(&path)? {
        println!("Created configuration file: {}", path.display());
    } else {
        println!("Configuration file already exists: {}", path.display());
    }
    println!();
    println!("Set [tiles] mbtiles and one of [overrides] database_url or snapshot,");
    println!("then start the server with 'tilemerge serve'.");
    println!("CLI arguments override config file values when specified.");
    Ok(())
}
