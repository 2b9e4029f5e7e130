//! Image processing operations.

use std::fmt;
use std::io::Cursor;
use std::path::Path;

use clap::ValueEnum;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, TagError};

/// Strategy for fitting artwork into the art area of the display.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeStrategy {
    /// Fit within the area, maintain aspect ratio (may have black bars).
    Fit,
    /// Fill the area, maintain aspect ratio (may crop).
    Fill,
    /// Stretch to fill (may distort).
    #[default]
    Stretch,
}

/// Load an image from disk as RGBA.
pub fn load_image(path: &Path) -> Result<RgbaImage> {
    if !path.exists() {
        return Err(TagError::ImageNotFound {
            path: path.display().to_string(),
        });
    }

    let img = image::open(path).map_err(|e| TagError::ImageProcessing(e.to_string()))?;
    Ok(img.to_rgba8())
}

/// Decode an encoded image (PNG, JPEG, ...) held in memory.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage> {
    let img =
        image::load_from_memory(bytes).map_err(|e| TagError::ImageProcessing(e.to_string()))?;
    Ok(img.to_rgba8())
}

/// Encode an image as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| TagError::ImageProcessing(e.to_string()))?;
    Ok(out.into_inner())
}

/// Resize `image` to exactly `width`×`height` according to `strategy`.
///
/// Empty images produce a black canvas of the requested size.
pub fn fit_to(image: &RgbaImage, width: u32, height: u32, strategy: ResizeStrategy) -> RgbaImage {
    if image.width() == 0 || image.height() == 0 {
        return RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
    }

    let img = DynamicImage::ImageRgba8(image.clone());
    let filter = image::imageops::FilterType::Lanczos3;

    match strategy {
        ResizeStrategy::Fit => {
            let resized = img.resize(width, height, filter).to_rgba8();
            let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));

            // Center the image
            let (rw, rh) = resized.dimensions();
            let x = (width - rw) / 2;
            let y = (height - rh) / 2;

            image::imageops::overlay(&mut canvas, &resized, x.into(), y.into());
            canvas
        }
        ResizeStrategy::Fill => img.resize_to_fill(width, height, filter).to_rgba8(),
        ResizeStrategy::Stretch => img.resize_exact(width, height, filter).to_rgba8(),
    }
}

/// Shrink `image` so its longest side is at most `max_dimension`, averaging
/// every source pixel that falls into each destination cell.
///
/// Color channels are weighted by alpha so transparent regions do not bleed
/// into opaque neighbours. Images already within bounds are returned as-is.
pub fn area_downsample(image: &RgbaImage, max_dimension: u32) -> RgbaImage {
    let (w, h) = image.dimensions();
    let longest = w.max(h);
    if longest <= max_dimension || max_dimension == 0 {
        return image.clone();
    }

    let scale = f64::from(max_dimension) / f64::from(longest);
    let nw = ((f64::from(w) * scale).round() as u32).max(1);
    let nh = ((f64::from(h) * scale).round() as u32).max(1);

    let span = |i: u32, src: u32, dst: u32| {
        let start = u64::from(i) * u64::from(src) / u64::from(dst);
        let end = (u64::from(i + 1) * u64::from(src) / u64::from(dst)).max(start + 1);
        (start as u32, end.min(u64::from(src)) as u32)
    };

    RgbaImage::from_fn(nw, nh, |dx, dy| {
        let (x0, x1) = span(dx, w, nw);
        let (y0, y1) = span(dy, h, nh);

        let mut weighted = [0u64; 3];
        let mut plain = [0u64; 3];
        let mut alpha = 0u64;
        let mut count = 0u64;

        for y in y0..y1 {
            for x in x0..x1 {
                let Rgba([r, g, b, a]) = *image.get_pixel(x, y);
                let a = u64::from(a);
                for (i, c) in [r, g, b].into_iter().enumerate() {
                    weighted[i] += u64::from(c) * a;
                    plain[i] += u64::from(c);
                }
                alpha += a;
                count += 1;
            }
        }

        let channel = |i: usize| {
            if alpha > 0 {
                div_round(weighted[i], alpha) as u8
            } else {
                div_round(plain[i], count) as u8
            }
        };

        Rgba([channel(0), channel(1), channel(2), div_round(alpha, count) as u8])
    })
}

fn div_round(num: u64, den: u64) -> u64 {
    (num + den / 2) / den
}

/// SHA-256 digest of an image's dimensions and pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHash(pub [u8; 32]);

impl ImageHash {
    /// First 12 hex digits, enough to tell renders apart in logs.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

impl fmt::Display for ImageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Hash the rendered content of an image.
pub fn content_hash(image: &RgbaImage) -> ImageHash {
    let mut hasher = Sha256::new();
    hasher.update(image.width().to_le_bytes());
    hasher.update(image.height().to_le_bytes());
    hasher.update(image.as_raw());

    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    ImageHash(digest)
}
