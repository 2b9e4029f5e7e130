//! Path helpers for the settings file.
//!
//! Supports absolute paths, paths relative to the settings file, and "~"
//! home directory expansion.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::{Result, TagError};

/// Directory name under the platform config dir.
pub const APP_DIR: &str = "tagsync";

/// Settings file name inside [`APP_DIR`].
pub const SETTINGS_FILE: &str = "config.toml";

/// Resolve a path read from the settings file.
///
/// Resolution rules:
/// 1. Paths starting with `~`: expanded to the home directory
/// 2. Absolute paths: used as-is
/// 3. Relative paths: resolved against `base` (the settings file's directory)
pub fn resolve_path(path: &Path, base: &Path) -> Result<PathBuf> {
    trace!(path = %path.display(), base = %base.display(), "Resolving path");

    let path_str = path.to_string_lossy();
    if path_str == "~" || path_str.starts_with("~/") {
        let home = home_dir()?;
        let resolved = match path_str.strip_prefix("~/") {
            Some(rest) if !rest.is_empty() => home.join(rest),
            _ => home,
        };
        debug!(
            original = %path.display(),
            resolved = %resolved.display(),
            "Expanded home directory"
        );
        return Ok(resolved);
    }

    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    Ok(base.join(path))
}

/// Resolve the user's home directory (cross-platform).
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| TagError::ConfigInvalid("Could not determine home directory".to_string()))
}

/// `<config_dir>/tagsync/config.toml` for the current platform.
pub fn default_settings_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().ok_or_else(|| {
        TagError::ConfigInvalid("Could not determine config directory".to_string())
    })?;
    Ok(dir.join(APP_DIR).join(SETTINGS_FILE))
}
