//! BusyTag volume sink.
//!
//! The BusyTag shows up as a USB mass-storage volume. Its firmware displays
//! the image named in `config.json` and lights the LED ring from the
//! `solid_color` block, so an update is two file writes: the PNG and the
//! config that points at it.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use super::{DeviceSink, DeviceUpdate};
use crate::error::{Result, TagError};
use crate::image_ops::encode_png;

/// Name of the device configuration file at the volume root.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Config schema version written when the existing file is unusable.
const CONFIG_VERSION: u64 = 3;

/// Writes updates onto a mounted BusyTag volume.
#[derive(Debug, Clone)]
pub struct VolumeSink {
    volume: PathBuf,
    image_name: String,
    paused_led_bits: Option<u8>,
    brightness: u8,
}

impl VolumeSink {
    pub fn new(volume: impl Into<PathBuf>, image_name: impl Into<String>) -> Self {
        Self {
            volume: volume.into(),
            image_name: image_name.into(),
            paused_led_bits: None,
            brightness: 100,
        }
    }

    /// LED mask to use while playback is paused (defaults to the update's).
    #[must_use]
    pub fn paused_led_bits(mut self, bits: u8) -> Self {
        self.paused_led_bits = Some(bits);
        self
    }

    /// Display brightness used when a fresh config has to be created.
    #[must_use]
    pub fn brightness(mut self, level: u8) -> Self {
        self.brightness = level.min(100);
        self
    }

    #[must_use]
    pub fn image_path(&self) -> PathBuf {
        self.volume.join(&self.image_name)
    }

    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.volume.join(CONFIG_FILE_NAME)
    }

    fn sink_error(path: &Path, reason: impl ToString) -> TagError {
        TagError::SinkWrite {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Load the existing config, or start from the minimal one.
    async fn load_config(&self) -> Map<String, Value> {
        let path = self.config_path();
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(map)) => return map,
                Ok(_) => {
                    warn!(path = %path.display(), "config.json is not an object, recreating");
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "config.json is malformed, recreating"
                    );
                }
            },
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No readable config.json, creating");
            }
        }
        self.default_config()
    }

    fn default_config(&self) -> Map<String, Value> {
        let value = json!({
            "version": CONFIG_VERSION,
            "image": self.image_name,
            "show_after_drop": true,
            "allow_usb_msc": true,
            "allow_file_server": false,
            "disp_brightness": self.brightness,
        });
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// Apply an update to a config object, keeping unrelated keys.
    fn apply(
        &self,
        mut config: Map<String, Value>,
        update: &DeviceUpdate<'_>,
    ) -> Map<String, Value> {
        let led_bits = if update.is_playing {
            update.led_bits
        } else {
            self.paused_led_bits.unwrap_or(update.led_bits)
        };

        config.insert("image".to_string(), Value::from(self.image_name.clone()));
        config.insert(
            "solid_color".to_string(),
            json!({ "led_bits": led_bits, "color": update.hex_color }),
        );
        config
    }
}

/// Write `bytes` next to `target` and return the staging path.
async fn stage(target: &Path, bytes: &[u8]) -> std::io::Result<PathBuf> {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    let staged = target.with_file_name(name);
    tokio::fs::write(&staged, bytes).await?;
    Ok(staged)
}

#[async_trait]
impl DeviceSink for VolumeSink {
    fn describe(&self) -> String {
        self.volume.display().to_string()
    }

    async fn write(&mut self, update: &DeviceUpdate<'_>) -> Result<()> {
        if !tokio::fs::metadata(&self.volume)
            .await
            .is_ok_and(|m| m.is_dir())
        {
            return Err(Self::sink_error(&self.volume, "volume is not mounted"));
        }

        let png = encode_png(update.image)?;
        let config = self.apply(self.load_config().await, update);
        let config_bytes = serde_json::to_vec(&Value::Object(config))
            .map_err(|e| Self::sink_error(&self.config_path(), e))?;

        // Stage both files before touching the live ones.
        let image_path = self.image_path();
        let config_path = self.config_path();
        let staged_image = stage(&image_path, &png)
            .await
            .map_err(|e| Self::sink_error(&image_path, e))?;
        let staged_config = stage(&config_path, &config_bytes)
            .await
            .map_err(|e| Self::sink_error(&config_path, e))?;

        tokio::fs::rename(&staged_image, &image_path)
            .await
            .map_err(|e| Self::sink_error(&image_path, e))?;
        tokio::fs::rename(&staged_config, &config_path)
            .await
            .map_err(|e| Self::sink_error(&config_path, e))?;

        info!(
            volume = %self.volume.display(),
            color = update.hex_color,
            is_playing = update.is_playing,
            "BusyTag updated"
        );
        Ok(())
    }
}
