//! Palette selection: pick one LED color out of the quantizer's candidates.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::color::{self, Rgb};
use crate::error::{Result, TagError};
use crate::quantize::ColorCandidate;

/// Candidates below this saturation are skipped by `vibrant`.
pub const MIN_VIBRANT_SATURATION: f64 = 0.15;

/// Candidates above this luminance count as near-white for `bright`.
pub const MAX_BRIGHT_LUMINANCE: f64 = 0.95;

/// How the LED color is derived from the artwork.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Saturated, mid-luminance colors weighted by coverage
    #[default]
    Vibrant,
    /// The most common color
    Dominant,
    /// The hue opposite the dominant color
    Complementary,
    /// Light colors weighted by coverage, excluding near-white
    Bright,
}

impl ExtractionMode {
    pub const ALL: [Self; 4] = [
        Self::Vibrant,
        Self::Dominant,
        Self::Complementary,
        Self::Bright,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vibrant => "vibrant",
            Self::Dominant => "dominant",
            Self::Complementary => "complementary",
            Self::Bright => "bright",
        }
    }
}

impl fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ExtractionMode {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TagError::InvalidMode(s.to_string()))
    }
}

/// Pick the LED color for `mode`.
///
/// Candidates must be non-empty; the quantizer guarantees this for any image
/// with at least one pixel, so `EmptyPalette` signals a defect upstream.
pub fn select(candidates: &[ColorCandidate], mode: ExtractionMode) -> Result<Rgb> {
    if candidates.is_empty() {
        return Err(TagError::EmptyPalette);
    }

    let max_weight = candidates
        .iter()
        .map(|c| c.weight)
        .fold(0.0_f64, f64::max);
    let weight_norm = |c: &ColorCandidate| {
        if max_weight > 0.0 {
            c.weight / max_weight
        } else {
            0.0
        }
    };

    let picked = match mode {
        ExtractionMode::Vibrant => {
            let pool = filter_or_all(candidates, |c| c.saturation >= MIN_VIBRANT_SATURATION);
            best_by(&pool, |c| {
                c.saturation * (1.0 - (c.luminance - 0.5).abs() * 2.0) * weight_norm(c)
            })
        }
        ExtractionMode::Dominant => dominant(candidates),
        ExtractionMode::Complementary => color::complementary(dominant(candidates)),
        ExtractionMode::Bright => {
            let pool = filter_or_all(candidates, |c| c.luminance <= MAX_BRIGHT_LUMINANCE);
            best_by(&pool, |c| c.luminance * weight_norm(c))
        }
    };

    Ok(picked)
}

/// Pick up to four colors for an LED pattern, primary first.
///
/// The sequence is: vibrant; dominant when it is clearly distinct from the
/// vibrant pick, otherwise the vibrant complement; the dominant color
/// brightened by 30%; the dominant complement.
pub fn led_pattern(candidates: &[ColorCandidate], count: usize) -> Result<Vec<Rgb>> {
    let vibrant = select(candidates, ExtractionMode::Vibrant)?;
    let dominant = dominant(candidates);

    let second = if color::distance(vibrant, dominant) > 50.0 {
        dominant
    } else {
        color::complementary(vibrant)
    };

    let mut colors = vec![
        vibrant,
        second,
        color::adjust_brightness(dominant, 1.3),
        color::complementary(dominant),
    ];
    colors.truncate(count.clamp(1, 4));
    Ok(colors)
}

fn dominant(candidates: &[ColorCandidate]) -> Rgb {
    best_by(candidates, |c| c.weight)
}

fn filter_or_all<F>(candidates: &[ColorCandidate], keep: F) -> Vec<ColorCandidate>
where
    F: Fn(&ColorCandidate) -> bool,
{
    let kept: Vec<ColorCandidate> = candidates.iter().copied().filter(|c| keep(c)).collect();
    if kept.is_empty() {
        candidates.to_vec()
    } else {
        kept
    }
}

/// Highest score wins; ties go to the heavier candidate, then the earlier one.
fn best_by<F>(candidates: &[ColorCandidate], score: F) -> Rgb
where
    F: Fn(&ColorCandidate) -> f64,
{
    let mut best: Option<(f64, &ColorCandidate)> = None;
    for candidate in candidates {
        let s = score(candidate);
        let better = match best {
            None => true,
            Some((best_score, current)) => match s.total_cmp(&best_score) {
                Ordering::Greater => true,
                Ordering::Equal => candidate.weight > current.weight,
                Ordering::Less => false,
            },
        };
        if better {
            best = Some((s, candidate));
        }
    }
    best.map_or(Rgb::BLACK, |(_, c)| c.rgb)
}
