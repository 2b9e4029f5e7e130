//! Point-in-time descriptions of what is playing, and change detection.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::RgbaImage;

/// What the music service reported at one poll.
///
/// Snapshots are immutable once built. The artwork is shared so keeping the
/// last snapshot around costs a pointer, not a pixel copy.
#[derive(Debug, Clone)]
pub struct TrackSnapshot {
    pub track_id: String,
    pub title: String,
    pub artist: String,
    pub artwork: Arc<RgbaImage>,
    pub is_playing: bool,
    pub fetched_at: DateTime<Utc>,
}

impl TrackSnapshot {
    pub fn new(
        track_id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        artwork: RgbaImage,
        is_playing: bool,
    ) -> Self {
        Self {
            track_id: track_id.into(),
            title: title.into(),
            artist: artist.into(),
            artwork: Arc::new(artwork),
            is_playing,
            fetched_at: Utc::now(),
        }
    }

    /// Replace the artwork with an already shared image.
    #[must_use]
    pub fn with_shared_artwork(mut self, artwork: Arc<RgbaImage>) -> Self {
        self.artwork = artwork;
        self
    }

    /// The snapshot used when the service reports that nothing is playing.
    #[must_use]
    pub fn nothing_playing() -> Self {
        Self::new("", "", "", RgbaImage::new(0, 0), false)
    }

    #[must_use]
    pub fn has_artwork(&self) -> bool {
        self.artwork.width() > 0 && self.artwork.height() > 0
    }
}

/// Result of a successful poll.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    Track(TrackSnapshot),
    NoTrackPlaying,
}

impl PollOutcome {
    /// Collapse to a snapshot; "nothing playing" is a paused, empty track.
    #[must_use]
    pub fn into_snapshot(self) -> TrackSnapshot {
        match self {
            Self::Track(snapshot) => snapshot,
            Self::NoTrackPlaying => TrackSnapshot::nothing_playing(),
        }
    }
}

/// Whether `current` differs from `previous` in a way the device should show.
///
/// Only the track identity and the playing flag count. Artwork bytes, text,
/// and fetch time are ignored; identical renders are deduplicated later by
/// image hash.
#[must_use]
pub fn has_changed(previous: Option<&TrackSnapshot>, current: &TrackSnapshot) -> bool {
    previous.is_none_or(|prev| {
        prev.track_id != current.track_id || prev.is_playing != current.is_playing
    })
}
