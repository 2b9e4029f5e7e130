//! Display geometry and LED layout of the BusyTag device.

use serde::Serialize;

/// Pixel layout of the device display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisplaySpec {
    /// Full canvas width in pixels
    pub width: u32,
    /// Full canvas height in pixels
    pub height: u32,
    /// Height of the artwork area at the top of the canvas
    pub art_height: u32,
    /// Number of addressable LEDs around the display
    pub led_count: u8,
}

impl DisplaySpec {
    /// The BusyTag: 240×280 display with a 7-LED ring.
    pub const BUSYTAG: Self = Self {
        width: 240,
        height: 280,
        art_height: 225,
        led_count: 7,
    };

    /// Bitmask addressing every LED.
    #[must_use]
    pub const fn all_leds(self) -> u8 {
        if self.led_count >= 8 {
            u8::MAX
        } else {
            (1u8 << self.led_count) - 1
        }
    }
}

impl Default for DisplaySpec {
    fn default() -> Self {
        Self::BUSYTAG
    }
}
