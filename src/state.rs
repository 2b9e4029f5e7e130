//! What the device is currently known to show.
//!
//! `DeviceState` is owned by the sync loop and threaded through it by
//! exclusive reference. It only advances after the sink confirms a write,
//! so a failed write leaves it pointing at the last visible update and the
//! next tick retries from there.

use serde::Serialize;
use tracing::{debug, trace};

use crate::color::Rgb;
use crate::image_ops::ImageHash;
use crate::snapshot::TrackSnapshot;

/// Last committed device contents.
#[derive(Debug, Clone, Default)]
pub struct DeviceState {
    last_snapshot: Option<TrackSnapshot>,
    last_color: Option<Rgb>,
    last_image_hash: Option<ImageHash>,
}

impl DeviceState {
    /// Create an empty state (nothing written yet).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn last_snapshot(&self) -> Option<&TrackSnapshot> {
        self.last_snapshot.as_ref()
    }

    #[must_use]
    pub fn last_color(&self) -> Option<Rgb> {
        self.last_color
    }

    #[must_use]
    pub fn last_image_hash(&self) -> Option<ImageHash> {
        self.last_image_hash
    }

    /// Check if anything has been committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.last_snapshot.is_none() && self.last_color.is_none() && self.last_image_hash.is_none()
    }

    /// Record a confirmed device write. All three fields move together.
    pub(crate) fn commit(&mut self, snapshot: TrackSnapshot, color: Rgb, hash: ImageHash) {
        debug!(
            track_id = %snapshot.track_id,
            is_playing = snapshot.is_playing,
            color = %color,
            hash = %hash.short(),
            "Committing device state"
        );
        self.last_snapshot = Some(snapshot);
        self.last_color = Some(color);
        self.last_image_hash = Some(hash);
    }

    /// Track a snapshot whose render matched what the device already shows.
    pub(crate) fn record_snapshot(&mut self, snapshot: TrackSnapshot) {
        trace!(track_id = %snapshot.track_id, "Recording snapshot without device write");
        self.last_snapshot = Some(snapshot);
    }

    /// Get a summary of the committed state.
    #[must_use]
    pub fn summary(&self) -> StateSummary {
        StateSummary {
            track_id: self.last_snapshot.as_ref().map(|s| s.track_id.clone()),
            title: self.last_snapshot.as_ref().map(|s| s.title.clone()),
            is_playing: self.last_snapshot.as_ref().is_some_and(|s| s.is_playing),
            color: self.last_color.map(|c| c.to_string()),
            image_hash: self.last_image_hash.map(|h| h.short()),
        }
    }
}

/// Summary of device state for reporting.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StateSummary {
    pub track_id: Option<String>,
    pub title: Option<String>,
    pub is_playing: bool,
    /// Color as `#RRGGBB`.
    pub color: Option<String>,
    /// Shortened render hash.
    pub image_hash: Option<String>,
}
