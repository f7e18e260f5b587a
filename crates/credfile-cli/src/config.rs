use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use color_eyre::{eyre::eyre, Result};
use credfile_provision::FileProvisionerConfig;
use dirs::config_dir;
use serde::{Deserialize, Serialize};

/// User-level configuration loaded from `~/.config/credfile/config.toml` (platform-specific).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Override for the managed temp dir.
    pub temp_dir: Option<PathBuf>,
    /// Default field to provision when `--field`/`--fields` are not given.
    pub field: Option<String>,
    /// Default file provisioner options.
    pub provision: FileProvisionerConfig,
}

/// Read the user's config file. A missing file yields the defaults.
pub fn load() -> Result<Config> {
    load_from_path(default_path()?)
}

/// Parse `path` as TOML. Missing and whitespace-only files both mean "all defaults".
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Config::default()),
        Err(err) => return Err(eyre!("failed to read config {}: {err}", path.display())),
    };
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    toml::from_str(&contents).map_err(|e| eyre!("invalid config {}: {e}", path.display()))
}

/// `<config dir>/credfile/config.toml`, e.g. `~/.config/credfile/config.toml` on Linux.
pub fn default_path() -> Result<PathBuf> {
    config_dir()
        .map(|base| base.join("credfile").join("config.toml"))
        .ok_or_else(|| eyre!("no config dir available"))
}

/// Write the config to the default path unless a file is already there.
pub fn write_default_if_missing(config: &Config) -> Result<PathBuf> {
    write_to_path_if_missing(config, &default_path()?)
}

fn write_to_path_if_missing(config: &Config, path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(config)?;
    fs::write(path, body)?;
    Ok(path.to_path_buf())
}
