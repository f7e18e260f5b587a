use std::path::PathBuf;

use dirs::runtime_dir;
use tracing::debug;

use crate::config::Config;

/// Default managed temp dir: the per-user runtime dir where the platform has one.
pub fn default_temp_dir() -> PathBuf {
    runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("credfile")
}

/// Pick the temp dir: CLI flag, then config override, then the default.
pub fn resolve_temp_dir(flag: Option<PathBuf>, config: &Config) -> PathBuf {
    if let Some(dir) = flag {
        debug!(?dir, "using temp dir from command line");
        return dir;
    }
    if let Some(dir) = &config.temp_dir {
        debug!(?dir, "using temp dir (config override)");
        return dir.clone();
    }
    default_temp_dir()
}
