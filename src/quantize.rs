//! Color quantization: reduce artwork to a ranked list of candidate colors.
//!
//! The image is first shrunk with area averaging so cost is bounded, then
//! every pixel lands in a bucket of a reduced RGB cube (`bucket_bits` per
//! channel). Each bucket reports its pixel count as `weight` and the mean of
//! its members as the representative color.

use std::collections::HashMap;

use image::{Rgba, RgbaImage};
use serde::Serialize;
use tracing::trace;

use crate::color::Rgb;
use crate::image_ops::area_downsample;

/// Longest side the quantizer works on.
pub const DEFAULT_MAX_DIMENSION: u32 = 200;

/// Bits kept per channel when bucketing (16 levels).
pub const DEFAULT_BUCKET_BITS: u8 = 4;

/// A candidate color produced by the quantizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorCandidate {
    pub rgb: Rgb,
    /// Number of source pixels the bucket stands for.
    pub weight: f64,
    /// HSV saturation of `rgb`.
    pub saturation: f64,
    /// HSL lightness of `rgb`.
    pub luminance: f64,
}

impl ColorCandidate {
    #[must_use]
    pub fn new(rgb: Rgb, weight: f64) -> Self {
        Self {
            rgb,
            weight,
            saturation: rgb.saturation(),
            luminance: rgb.luminance(),
        }
    }
}

/// Configurable color quantizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantizer {
    max_dimension: u32,
    bucket_bits: u8,
    edge_trim: u32,
}

impl Default for Quantizer {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            bucket_bits: DEFAULT_BUCKET_BITS,
            edge_trim: 0,
        }
    }
}

#[derive(Default)]
struct Bucket {
    count: u64,
    sum: [u64; 3],
}

impl Quantizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the working resolution (longest side, in pixels).
    #[must_use]
    pub fn max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension.max(1);
        self
    }

    /// Bits per channel kept when bucketing, clamped to `1..=8`.
    #[must_use]
    pub fn bucket_bits(mut self, bits: u8) -> Self {
        self.bucket_bits = bits.clamp(1, 8);
        self
    }

    /// Drop this many pixels from every border before bucketing.
    ///
    /// Ignored when the image is too small to trim.
    #[must_use]
    pub fn edge_trim(mut self, pixels: u32) -> Self {
        self.edge_trim = pixels;
        self
    }

    /// Reduce `image` to at most `max_candidates` colors, heaviest first.
    ///
    /// Returns an empty list only for an image without pixels. A
    /// `max_candidates` of zero is treated as one.
    pub fn quantize(&self, image: &RgbaImage, max_candidates: usize) -> Vec<ColorCandidate> {
        let max_candidates = max_candidates.max(1);
        if image.width() == 0 || image.height() == 0 {
            return Vec::new();
        }

        let small = area_downsample(image, self.max_dimension);
        let pixels = self.sample_pixels(&small);
        // Each downsampled pixel covers this many source pixels.
        let source_px = f64::from(image.width()) * f64::from(image.height());
        let small_px = f64::from(small.width()) * f64::from(small.height());

        let shift = 8 - self.bucket_bits;
        let bits = u32::from(self.bucket_bits);
        let mut buckets: HashMap<u32, Bucket> = HashMap::new();

        for Rgba([r, g, b, _]) in pixels {
            let key = (u32::from(r >> shift) << (2 * bits))
                | (u32::from(g >> shift) << bits)
                | u32::from(b >> shift);
            let bucket = buckets.entry(key).or_default();
            bucket.count += 1;
            bucket.sum[0] += u64::from(r);
            bucket.sum[1] += u64::from(g);
            bucket.sum[2] += u64::from(b);
        }

        let mut ranked: Vec<(u32, Bucket)> = buckets.into_iter().collect();
        ranked.sort_by(|(ka, a), (kb, b)| b.count.cmp(&a.count).then(ka.cmp(kb)));
        ranked.truncate(max_candidates);

        trace!(
            width = small.width(),
            height = small.height(),
            candidates = ranked.len(),
            "Quantized image"
        );

        ranked
            .into_iter()
            .map(|(_, bucket)| {
                let mean = |i: usize| ((bucket.sum[i] + bucket.count / 2) / bucket.count) as u8;
                let weight = bucket.count as f64 * source_px / small_px;
                ColorCandidate::new(Rgb::new(mean(0), mean(1), mean(2)), weight)
            })
            .collect()
    }

    /// Pixels that take part in bucketing: the trimmed interior, without
    /// fully transparent pixels unless nothing else is left.
    fn sample_pixels(&self, image: &RgbaImage) -> Vec<Rgba<u8>> {
        let (w, h) = image.dimensions();
        let trim = if w > 2 * self.edge_trim && h > 2 * self.edge_trim {
            self.edge_trim
        } else {
            0
        };

        let interior: Vec<Rgba<u8>> = image
            .enumerate_pixels()
            .filter(|(x, y, _)| *x >= trim && *x < w - trim && *y >= trim && *y < h - trim)
            .map(|(_, _, p)| *p)
            .collect();

        let visible: Vec<Rgba<u8>> = interior.iter().copied().filter(|p| p[3] > 0).collect();
        if visible.is_empty() { interior } else { visible }
    }
}

/// Quantize with the default settings.
pub fn quantize(image: &RgbaImage, max_candidates: usize) -> Vec<ColorCandidate> {
    Quantizer::default().quantize(image, max_candidates)
}
