//! Color-space utilities shared by the quantizer and the palette selector.
//!
//! Hue is expressed in degrees `[0, 360)`, saturation and value in `[0, 1]`.
//! "Luminance" throughout the crate is the HSL lightness `(max + min) / 2`,
//! which keeps fully saturated primaries at the midpoint and white at `1.0`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TagError;

/// An 8-bit sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// A color in HSV space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    /// Hue in degrees, `[0, 360)`.
    pub h: f64,
    /// Saturation, `[0, 1]`.
    pub s: f64,
    /// Value, `[0, 1]`.
    pub v: f64,
}

impl Rgb {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Hex string in the device's format: six uppercase digits, no `#`.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    #[must_use]
    pub fn to_hsv(self) -> Hsv {
        let (r, g, b) = self.unit();
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let h = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * ((g - b) / delta).rem_euclid(6.0)
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };
        let s = if max == 0.0 { 0.0 } else { delta / max };

        Hsv {
            h: h.rem_euclid(360.0),
            s,
            v: max,
        }
    }

    #[must_use]
    pub fn from_hsv(hsv: Hsv) -> Self {
        let h = hsv.h.rem_euclid(360.0);
        let s = hsv.s.clamp(0.0, 1.0);
        let v = hsv.v.clamp(0.0, 1.0);

        let c = v * s;
        let sector = h / 60.0;
        let x = c * (1.0 - (sector.rem_euclid(2.0) - 1.0).abs());
        let m = v - c;

        let (r, g, b) = match sector.floor() as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        Self::new(to_channel(r + m), to_channel(g + m), to_channel(b + m))
    }

    /// HSV saturation.
    #[must_use]
    pub fn saturation(self) -> f64 {
        self.to_hsv().s
    }

    /// HSL lightness.
    #[must_use]
    pub fn luminance(self) -> f64 {
        let (r, g, b) = self.unit();
        (r.max(g).max(b) + r.min(g).min(b)) / 2.0
    }

    fn unit(self) -> (f64, f64, f64) {
        (
            f64::from(self.r) / 255.0,
            f64::from(self.g) / 255.0,
            f64::from(self.b) / 255.0,
        )
    }
}

fn to_channel(unit: f64) -> u8 {
    (unit * 255.0).round().clamp(0.0, 255.0) as u8
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = TagError;

    /// Parses `ff0000`, `FF0000` or `#ff0000`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_start_matches('#');
        if s.len() != 6 || !s.is_ascii() {
            return Err(TagError::Other(format!(
                "Invalid color format '{s}': expected 6 hex digits (e.g., ff0000)"
            )));
        }

        let channel = |range: std::ops::Range<usize>, name: &str| {
            u8::from_str_radix(&s[range], 16)
                .map_err(|_| TagError::Other(format!("Invalid {name} component in '{s}'")))
        };

        Ok(Self::new(
            channel(0..2, "red")?,
            channel(2..4, "green")?,
            channel(4..6, "blue")?,
        ))
    }
}

impl From<image::Rgb<u8>> for Rgb {
    fn from(p: image::Rgb<u8>) -> Self {
        Self::new(p[0], p[1], p[2])
    }
}

impl From<Rgb> for image::Rgb<u8> {
    fn from(c: Rgb) -> Self {
        Self([c.r, c.g, c.b])
    }
}

/// Rotate the hue by `degrees`, keeping HSV saturation and value.
#[must_use]
pub fn rotate_hue(color: Rgb, degrees: f64) -> Rgb {
    let hsv = color.to_hsv();
    Rgb::from_hsv(Hsv {
        h: (hsv.h + degrees).rem_euclid(360.0),
        ..hsv
    })
}

/// The color opposite on the hue wheel.
#[must_use]
pub fn complementary(color: Rgb) -> Rgb {
    rotate_hue(color, 180.0)
}

/// The two colors `offset` degrees either side of `color`.
#[must_use]
pub fn analogous(color: Rgb, offset: f64) -> [Rgb; 2] {
    [rotate_hue(color, -offset), rotate_hue(color, offset)]
}

/// Scale HSV value by `factor`, saturating at full brightness.
#[must_use]
pub fn adjust_brightness(color: Rgb, factor: f64) -> Rgb {
    let hsv = color.to_hsv();
    Rgb::from_hsv(Hsv {
        v: (hsv.v * factor).min(1.0),
        ..hsv
    })
}

/// Euclidean distance in RGB space, `0.0..=441.7`.
#[must_use]
pub fn distance(a: Rgb, b: Rgb) -> f64 {
    let dr = f64::from(a.r) - f64::from(b.r);
    let dg = f64::from(a.g) - f64::from(b.g);
    let db = f64::from(a.b) - f64::from(b.b);
    (dr * dr + dg * dg + db * db).sqrt()
}
