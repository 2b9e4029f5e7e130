//! Now-playing file source.
//!
//! Reads a small JSON document that another program keeps up to date:
//!
//! ```json
//! { "track_id": "abc", "title": "Song", "artist": "Band",
//!   "artwork": "cover.png", "is_playing": true }
//! ```
//!
//! `artwork` is resolved relative to the JSON file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, trace};

use super::TrackSource;
use crate::error::{Result, TagError};
use crate::image_ops::decode_image;
use crate::snapshot::{PollOutcome, TrackSnapshot};

#[derive(Debug, Deserialize)]
struct NowPlaying {
    track_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    artwork: Option<PathBuf>,
    #[serde(default = "default_playing")]
    is_playing: bool,
}

const fn default_playing() -> bool {
    true
}

/// Polls a now-playing JSON file.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TrackSource for FileSource {
    fn describe(&self) -> String {
        format!("file://{}", self.path.display())
    }

    async fn poll(&mut self) -> Result<PollOutcome> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!(path = %self.path.display(), "Now-playing file absent");
                return Ok(PollOutcome::NoTrackPlaying);
            }
            Err(e) => return Err(TagError::Fetch(format!("{}: {e}", self.path.display()))),
        };

        let doc: NowPlaying = serde_json::from_str(&text)
            .map_err(|e| TagError::Fetch(format!("{}: {e}", self.path.display())))?;

        let artwork = match &doc.artwork {
            Some(rel) => {
                let art_path = self
                    .path
                    .parent()
                    .map_or_else(|| rel.clone(), |dir| dir.join(rel));
                let bytes = tokio::fs::read(&art_path).await.map_err(|e| {
                    TagError::Fetch(format!("artwork {}: {e}", art_path.display()))
                })?;
                decode_image(&bytes).map_err(|e| {
                    TagError::Fetch(format!("artwork {}: {e}", art_path.display()))
                })?
            }
            None => image::RgbaImage::new(0, 0),
        };

        debug!(track_id = %doc.track_id, is_playing = doc.is_playing, "Read now-playing file");
        Ok(PollOutcome::Track(TrackSnapshot::new(
            doc.track_id,
            doc.title,
            doc.artist,
            artwork,
            doc.is_playing,
        )))
    }
}
