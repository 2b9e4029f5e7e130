//! TOML settings file.
//!
//! Every field has a default, so an empty file (or no file at all) is a
//! valid configuration. Example:
//!
//! ```toml
//! mode = "vibrant"
//! poll_interval_ms = 500
//!
//! [device]
//! volume = "/Volumes/NO NAME"
//!
//! [source]
//! kind = "spotify"
//! token_env = "SPOTIFY_ACCESS_TOKEN"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};

use super::path::{default_settings_path, resolve_path};
use crate::device::DisplaySpec;
use crate::error::{Result, ResultExt, TagError};
use crate::image_ops::ResizeStrategy;
use crate::palette::ExtractionMode;
use crate::source::DEFAULT_API_BASE;
use crate::sync::SyncSettings;

/// Where track information comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Spotify Web API (currently-playing endpoint)
    #[default]
    Spotify,
    /// A now-playing JSON file maintained by another program
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Mount point of the BusyTag volume.
    pub volume: Option<PathBuf>,
    pub image_name: String,
    pub led_bits: u8,
    pub paused_led_bits: u8,
    /// Display brightness (0-100), used when config.json has to be recreated.
    pub brightness: u8,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        let all = DisplaySpec::BUSYTAG.all_leds();
        Self {
            volume: None,
            image_name: "current_track_image.png".to_string(),
            led_bits: all,
            paused_led_bits: all,
            brightness: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub kind: SourceKind,
    /// Environment variable holding the Spotify access token.
    pub token_env: String,
    /// Fixed access token, used instead of `token_env` when set. Never
    /// written back out.
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Now-playing file for the `file` source.
    pub path: Option<PathBuf>,
    pub api_base: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            token_env: "SPOTIFY_ACCESS_TOKEN".to_string(),
            token: None,
            path: None,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub resize: ResizeStrategy,
    pub font_family: String,
    /// Draw title and artist under the artwork.
    pub show_text: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            resize: ResizeStrategy::default(),
            font_family: "sans-serif".to_string(),
            show_text: true,
        }
    }
}

/// Complete runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mode: ExtractionMode,
    pub poll_interval_ms: u64,
    pub poll_timeout_ms: u64,
    pub write_timeout_ms: u64,
    pub max_candidates: usize,
    pub device: DeviceSettings,
    pub source: SourceSettings,
    pub render: RenderSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: ExtractionMode::default(),
            poll_interval_ms: 500,
            poll_timeout_ms: 5000,
            write_timeout_ms: 5000,
            max_candidates: 16,
            device: DeviceSettings::default(),
            source: SourceSettings::default(),
            render: RenderSettings::default(),
        }
    }
}

/// Command-line and environment overrides, applied on top of the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub mode: Option<ExtractionMode>,
    pub volume: Option<PathBuf>,
    pub interval_ms: Option<u64>,
    pub source: Option<SourceKind>,
    pub now_playing: Option<PathBuf>,
}

impl Settings {
    /// Apply overrides. Later layers win.
    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(mode) = overrides.mode {
            self.mode = mode;
        }
        if let Some(volume) = &overrides.volume {
            self.device.volume = Some(volume.clone());
        }
        if let Some(ms) = overrides.interval_ms {
            self.poll_interval_ms = ms;
        }
        if let Some(kind) = overrides.source {
            self.source.kind = kind;
        }
        if let Some(path) = &overrides.now_playing {
            self.source.path = Some(path.clone());
        }
        trace!(?overrides, "Applied overrides");
    }

    /// Check the settings are usable by the sync loop.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(TagError::ConfigInvalid("poll_interval_ms must be greater than 0".into()));
        }
        if self.poll_timeout_ms == 0 || self.write_timeout_ms == 0 {
            return Err(TagError::ConfigInvalid("timeouts must be greater than 0".into()));
        }
        if self.max_candidates == 0 {
            return Err(TagError::ConfigInvalid("max_candidates must be at least 1".into()));
        }
        if self.device.brightness > 100 {
            return Err(TagError::ConfigInvalid(format!(
                "device.brightness must be 0-100, got {}",
                self.device.brightness
            )));
        }
        if self.device.image_name.is_empty() || self.device.image_name.contains(['/', '\\']) {
            return Err(TagError::ConfigInvalid(format!(
                "device.image_name must be a plain file name, got '{}'",
                self.device.image_name
            )));
        }
        if self.device.volume.is_none() {
            return Err(TagError::ConfigInvalid(
                "device.volume is not set (use --volume or TAGSYNC_VOLUME)".into(),
            ));
        }
        if self.source.kind == SourceKind::File && self.source.path.is_none() {
            return Err(TagError::ConfigInvalid(
                "source.path is required for the file source".into(),
            ));
        }
        debug!("Settings validated");
        Ok(())
    }

    /// Resolve relative and `~` paths against `base`.
    pub fn resolve_paths(&mut self, base: &Path) -> Result<()> {
        if let Some(volume) = &self.device.volume {
            self.device.volume = Some(resolve_path(volume, base)?);
        }
        if let Some(path) = &self.source.path {
            self.source.path = Some(resolve_path(path, base)?);
        }
        Ok(())
    }

    /// Loop parameters derived from these settings.
    #[must_use]
    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            mode: self.mode,
            max_candidates: self.max_candidates,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            poll_timeout: Duration::from_millis(self.poll_timeout_ms),
            write_timeout: Duration::from_millis(self.write_timeout_ms),
            led_bits: self.device.led_bits,
        }
    }
}

/// Load settings from a TOML file. Relative paths inside it are resolved
/// against the file's directory.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_settings(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TagError::ConfigNotFound {
                path: path.display().to_string(),
            }
        } else {
            TagError::Io(e)
        }
    })?;
    debug!(bytes = content.len(), "Read settings file");

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    load_settings_from_str(&content, base)
}

/// Parse settings from TOML text, resolving relative paths against `base`.
pub fn load_settings_from_str(content: &str, base: &Path) -> Result<Settings> {
    let mut settings: Settings =
        toml::from_str(content).map_err(|e| TagError::ConfigParse(format!("TOML: {e}")))?;
    settings.resolve_paths(base)?;
    trace!(?settings, "Parsed settings");
    Ok(settings)
}

/// Settings plus the file they came from.
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub settings: Settings,
    pub path: PathBuf,
    /// False when the default file was absent and defaults were used.
    pub from_file: bool,
}

/// Load from `explicit` if given (it must exist), otherwise from the default
/// location, falling back to built-in defaults when that file is absent.
pub fn locate_settings(explicit: Option<&Path>) -> Result<LoadedSettings> {
    if let Some(path) = explicit {
        return Ok(LoadedSettings {
            settings: load_settings(path)?,
            path: path.to_path_buf(),
            from_file: true,
        });
    }

    let path = default_settings_path()?;
    if path.exists() {
        let settings = load_settings(&path)?;
        info!(path = %path.display(), "Loaded settings");
        Ok(LoadedSettings {
            settings,
            path,
            from_file: true,
        })
    } else {
        debug!(path = %path.display(), "No settings file, using defaults");
        Ok(LoadedSettings {
            settings: Settings::default(),
            path,
            from_file: false,
        })
    }
}

/// Write settings as TOML, creating parent directories.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn save_settings(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let content =
        toml::to_string_pretty(settings).map_err(|e| TagError::ConfigParse(format!("TOML: {e}")))?;
    std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
    info!("Settings saved");
    Ok(())
}
