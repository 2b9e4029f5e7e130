//! Device-facing sinks.
//!
//! The sync loop only talks to the `DeviceSink` trait, so the real BusyTag
//! volume writer and the recording mock are interchangeable.

mod busytag;
mod info;
pub mod mock;

pub use busytag::{CONFIG_FILE_NAME, VolumeSink};
pub use info::DisplaySpec;

use async_trait::async_trait;
use image::RgbaImage;

use crate::error::Result;

/// Everything the device should show after one tick.
#[derive(Debug, Clone, Copy)]
pub struct DeviceUpdate<'a> {
    /// Composited display image
    pub image: &'a RgbaImage,
    /// Which LEDs to light
    pub led_bits: u8,
    /// LED color in the device's hex format (`FF0000`)
    pub hex_color: &'a str,
    /// Whether the track is playing
    pub is_playing: bool,
}

/// Write target for rendered updates.
///
/// # Implementation Notes
///
/// - A write either fully succeeds or returns an error; callers treat an
///   error as "device unchanged" and retry with the same update later
/// - Writes must be idempotent so retries are safe
#[async_trait]
pub trait DeviceSink: Send {
    /// Human-readable location of the device (for logs).
    fn describe(&self) -> String;

    /// Push an update to the device.
    ///
    /// # Errors
    ///
    /// Returns `SinkWrite` or `Io` if the device could not be updated.
    async fn write(&mut self, update: &DeviceUpdate<'_>) -> Result<()>;
}
