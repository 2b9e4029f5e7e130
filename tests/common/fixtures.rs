//! Test fixture helpers.
//!
//! Temporary directories clean themselves up when dropped.

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use serde_json::Value;
use tempfile::TempDir;

use tagsync::device::CONFIG_FILE_NAME;
use tagsync::snapshot::TrackSnapshot;

/// Opaque solid-color artwork.
#[must_use]
pub fn solid(rgb: [u8; 3], size: u32) -> RgbaImage {
    RgbaImage::from_pixel(size, size, Rgba([rgb[0], rgb[1], rgb[2], 255]))
}

/// Artwork split vertically: `left` covers `left_share` of the width.
#[must_use]
pub fn split(left: [u8; 3], right: [u8; 3], left_share: f64) -> RgbaImage {
    let cut = (100.0 * left_share).round() as u32;
    RgbaImage::from_fn(100, 100, |x, _| {
        let [r, g, b] = if x < cut { left } else { right };
        Rgba([r, g, b, 255])
    })
}

/// A snapshot with fixed title and artist.
#[must_use]
pub fn track(id: &str, artwork: RgbaImage, playing: bool) -> TrackSnapshot {
    TrackSnapshot::new(id, "Song", "Band", artwork, playing)
}

/// A temporary directory standing in for the BusyTag volume.
pub struct TestVolume {
    pub dir: TempDir,
}

impl TestVolume {
    /// # Panics
    ///
    /// Panics if the directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp volume"),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Parsed `config.json`.
    ///
    /// # Panics
    ///
    /// Panics if the file is missing or not JSON.
    #[must_use]
    pub fn config(&self) -> Value {
        let text = std::fs::read_to_string(self.path().join(CONFIG_FILE_NAME))
            .expect("config.json missing");
        serde_json::from_str(&text).expect("config.json is not JSON")
    }

    /// The image written to the volume.
    ///
    /// # Panics
    ///
    /// Panics if the image is missing or undecodable.
    #[must_use]
    pub fn image(&self, name: &str) -> RgbaImage {
        image::open(self.path().join(name))
            .expect("image missing")
            .to_rgba8()
    }
}

/// A now-playing JSON file plus its artwork.
pub struct NowPlayingFile {
    pub dir: TempDir,
}

impl NowPlayingFile {
    /// # Panics
    ///
    /// Panics if the directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.path().join("now.json")
    }

    /// Write the document and a solid artwork image next to it.
    ///
    /// # Panics
    ///
    /// Panics if writing fails.
    pub fn write(&self, track_id: &str, title: &str, art: [u8; 3], playing: bool) {
        let art_name = format!("{track_id}.png");
        solid(art, 64)
            .save(self.dir.path().join(&art_name))
            .expect("Failed to save artwork");
        let doc = serde_json::json!({
            "track_id": track_id,
            "title": title,
            "artist": "Band",
            "artwork": art_name,
            "is_playing": playing,
        });
        std::fs::write(self.path(), doc.to_string()).expect("Failed to write now.json");
    }
}

/// Write a settings file into `dir` and return its path.
///
/// # Panics
///
/// Panics if writing fails.
pub fn write_settings(dir: &Path, toml: &str) -> PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(&path, toml).expect("Failed to write settings");
    path
}
