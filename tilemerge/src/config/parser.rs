//! INI parsing: the one place where key names map to struct fields.

use std::path::PathBuf;

use ini::Ini;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [server] section
    if let Some(section) = ini.section(Some("server")) {
        if let Some(v) = non_empty(section.get("bind")) {
            config.server.bind = v.parse().map_err(|_| ConfigFileError::InvalidValue {
                section: "server".to_string(),
                key: "bind".to_string(),
                value: v.to_string(),
                reason: "expected an address like '0.0.0.0:8080'".to_string(),
            })?;
        }
    }

    // [tiles] section
    if let Some(section) = ini.section(Some("tiles")) {
        if let Some(v) = non_empty(section.get("mbtiles")) {
            config.tiles.mbtiles = Some(expand_tilde(v));
        }
        if let Some(v) = non_empty(section.get("max_connections")) {
            config.tiles.max_connections = parse_pool_size("tiles", v)?;
        }
    }

    // [overrides] section
    if let Some(section) = ini.section(Some("overrides")) {
        if let Some(v) = non_empty(section.get("database_url")) {
            config.overrides.database_url = Some(v.to_string());
        }
        if let Some(v) = non_empty(section.get("snapshot")) {
            config.overrides.snapshot = Some(expand_tilde(v));
        }
        if let Some(v) = non_empty(section.get("table")) {
            config.overrides.table = v.to_string();
        }
        if let Some(v) = non_empty(section.get("max_connections")) {
            config.overrides.max_connections = parse_pool_size("overrides", v)?;
        }
        if let Some(v) = non_empty(section.get("on_failure")) {
            config.overrides.on_failure =
                v.parse().map_err(|_| ConfigFileError::InvalidValue {
                    section: "overrides".to_string(),
                    key: "on_failure".to_string(),
                    value: v.to_string(),
                    reason: "must be 'degrade' or 'fail'".to_string(),
                })?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section.get("directory")) {
            config.logging.directory = expand_tilde(v);
        }
        if let Some(v) = non_empty(section.get("file")) {
            config.logging.file = v.to_string();
        }
    }

    Ok(config)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_pool_size(section: &str, value: &str) -> Result<u32, ConfigFileError> {
    match value.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigFileError::InvalidValue {
            section: section.to_string(),
            key: "max_connections".to_string(),
            value: value.to_string(),
            reason: "must be a positive integer".to_string(),
        }),
    }
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
