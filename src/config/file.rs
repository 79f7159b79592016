//! Configuration file loading

use super::Config;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default config file locations, in search order
const CONFIG_PATHS: &[&str] = &["./sysmend.toml", "C:\\ProgramData\\sysmend\\sysmend.toml"];

/// Load configuration from an explicit path, a default location, or defaults
pub fn load(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config_file(),
    };

    match path {
        Some(p) => load_from_path(&p),
        None => {
            debug!("No configuration file found, using defaults");
            let config = Config::default();
            super::validate(&config)?;
            Ok(config)
        },
    }
}

/// Find first existing config file
fn find_config_file() -> Option<PathBuf> {
    first_existing(CONFIG_PATHS.iter().map(PathBuf::from))
}

fn first_existing(candidates: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
    candidates.into_iter().find(|p| p.exists())
}

/// Load and parse config from path
pub fn load_from_path(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    super::validate(&config)
        .with_context(|| format!("Invalid config file: {}", path.display()))?;

    Ok(config)
}
