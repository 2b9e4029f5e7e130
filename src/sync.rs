//! The synchronization loop.
//!
//! One tick is: poll the source, compare against what the device shows,
//! render, extract a color, write. Ticks never overlap and `DeviceState`
//! is only touched as the final step of a successful write, so a failed
//! tick can always be retried from scratch on the next one.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use crate::color::Rgb;
use crate::device::{DeviceSink, DeviceUpdate, DisplaySpec};
use crate::error::{Result, TagError};
use crate::image_ops::content_hash;
use crate::palette::{self, ExtractionMode};
use crate::quantize::Quantizer;
use crate::render::Compositor;
use crate::snapshot::{TrackSnapshot, has_changed};
use crate::source::TrackSource;
use crate::state::DeviceState;

/// Loop parameters, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub mode: ExtractionMode,
    pub max_candidates: usize,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    pub write_timeout: Duration,
    /// LED mask sent with every update.
    pub led_bits: u8,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            mode: ExtractionMode::default(),
            max_candidates: 16,
            poll_interval: Duration::from_millis(500),
            poll_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
            led_bits: DisplaySpec::BUSYTAG.all_leds(),
        }
    }
}

/// What a single tick did.
#[derive(Debug)]
pub enum TickOutcome {
    /// Same track and play state as the device shows; nothing rendered.
    Unchanged,
    /// Changed snapshot, but the render matched the device; no write.
    Deduplicated,
    /// The device was updated and the state committed.
    Written { color: Rgb },
    /// Polling failed or timed out.
    FetchFailed(TagError),
    /// The compositor failed.
    RenderFailed(TagError),
    /// The sink failed or timed out; state was left alone.
    WriteFailed(TagError),
}

impl TickOutcome {
    /// Short name for logs and command output.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Unchanged => "unchanged",
            Self::Deduplicated => "deduplicated",
            Self::Written { .. } => "written",
            Self::FetchFailed(_) => "fetch_failed",
            Self::RenderFailed(_) => "render_failed",
            Self::WriteFailed(_) => "write_failed",
        }
    }

    /// The error behind a failed tick.
    #[must_use]
    pub const fn error(&self) -> Option<&TagError> {
        match self {
            Self::FetchFailed(e) | Self::RenderFailed(e) | Self::WriteFailed(e) => Some(e),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::FetchFailed(_) | Self::RenderFailed(_) | Self::WriteFailed(_)
        )
    }
}

/// Loop bookkeeping, kept apart from `DeviceState`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub ticks: u64,
    pub writes: u64,
    pub failures: u64,
}

/// Drives a source, a compositor, and a sink.
pub struct SyncLoop<S, C, K> {
    source: S,
    compositor: C,
    sink: K,
    settings: SyncSettings,
    quantizer: Quantizer,
    state: DeviceState,
    stats: SyncStats,
}

impl<S, C, K> SyncLoop<S, C, K>
where
    S: TrackSource,
    C: Compositor,
    K: DeviceSink,
{
    pub fn new(source: S, compositor: C, sink: K, settings: SyncSettings) -> Self {
        Self {
            source,
            compositor,
            sink,
            settings,
            quantizer: Quantizer::default(),
            state: DeviceState::new(),
            stats: SyncStats::default(),
        }
    }

    /// Use a custom quantizer for color extraction.
    #[must_use]
    pub fn with_quantizer(mut self, quantizer: Quantizer) -> Self {
        self.quantizer = quantizer;
        self
    }

    #[must_use]
    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    #[must_use]
    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    #[must_use]
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Run one tick.
    ///
    /// Every recoverable failure comes back as `Ok` with a failed outcome.
    /// `Err` means an invariant broke and the loop must stop.
    pub async fn tick(&mut self) -> Result<TickOutcome> {
        self.stats.ticks += 1;
        let outcome = self.step().await?;

        match &outcome {
            TickOutcome::Written { .. } => self.stats.writes += 1,
            o if o.is_failure() => self.stats.failures += 1,
            _ => {}
        }
        Ok(outcome)
    }

    async fn step(&mut self) -> Result<TickOutcome> {
        let poll_ms = millis(self.settings.poll_timeout);
        let snapshot = match timeout(self.settings.poll_timeout, self.source.poll()).await {
            Ok(Ok(outcome)) => outcome.into_snapshot(),
            Ok(Err(e)) => return recover(e, TickOutcome::FetchFailed),
            Err(_) => {
                let e = TagError::Timeout {
                    operation: "track poll",
                    timeout_ms: poll_ms,
                };
                return recover(e, TickOutcome::FetchFailed);
            }
        };

        if !has_changed(self.state.last_snapshot(), &snapshot) {
            trace!(track_id = %snapshot.track_id, "Snapshot unchanged");
            return Ok(TickOutcome::Unchanged);
        }

        debug!(
            track_id = %snapshot.track_id,
            title = %snapshot.title,
            is_playing = snapshot.is_playing,
            "Snapshot changed"
        );

        let image = match self
            .compositor
            .render(&snapshot.artwork, &snapshot.title, &snapshot.artist)
        {
            Ok(image) => image,
            Err(e) => return recover(e, TickOutcome::RenderFailed),
        };
        let hash = content_hash(&image);

        // A resume must still be written: the device shows the paused state.
        let device_playing = self.state.last_snapshot().is_some_and(|s| s.is_playing);
        if snapshot.is_playing && device_playing && self.state.last_image_hash() == Some(hash) {
            debug!(hash = %hash.short(), "Render matches device, skipping write");
            self.state.record_snapshot(snapshot);
            return Ok(TickOutcome::Deduplicated);
        }

        let color = self.extract_color(&snapshot, &image)?;
        let hex = color.to_hex();
        let update = DeviceUpdate {
            image: &image,
            led_bits: self.settings.led_bits,
            hex_color: &hex,
            is_playing: snapshot.is_playing,
        };

        let write_ms = millis(self.settings.write_timeout);
        match timeout(self.settings.write_timeout, self.sink.write(&update)).await {
            Ok(Ok(())) => {
                info!(
                    track_id = %snapshot.track_id,
                    color = %color,
                    is_playing = snapshot.is_playing,
                    "Device updated"
                );
                self.state.commit(snapshot, color, hash);
                Ok(TickOutcome::Written { color })
            }
            Ok(Err(e)) => recover(e, TickOutcome::WriteFailed),
            Err(_) => {
                let e = TagError::Timeout {
                    operation: "device write",
                    timeout_ms: write_ms,
                };
                recover(e, TickOutcome::WriteFailed)
            }
        }
    }

    /// Color for `snapshot`: from its artwork when it has any, otherwise
    /// the color already on the device, otherwise from the render itself.
    fn extract_color(&self, snapshot: &TrackSnapshot, rendered: &image::RgbaImage) -> Result<Rgb> {
        let max = self.settings.max_candidates;
        if snapshot.has_artwork() {
            let candidates = self.quantizer.quantize(&snapshot.artwork, max);
            return palette::select(&candidates, self.settings.mode);
        }
        if let Some(color) = self.state.last_color() {
            return Ok(color);
        }
        palette::select(&self.quantizer.quantize(rendered, max), self.settings.mode)
    }

    /// Tick until `shutdown` resolves.
    ///
    /// Shutdown is only observed between ticks; a tick in progress always
    /// runs to completion.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<SyncStats>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            source = %self.source.describe(),
            sink = %self.sink.describe(),
            mode = %self.settings.mode,
            interval_ms = millis(self.settings.poll_interval),
            "Sync loop started"
        );

        loop {
            self.tick().await?;

            tokio::select! {
                biased;
                () = &mut shutdown => break,
                () = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }

        info!(
            ticks = self.stats.ticks,
            writes = self.stats.writes,
            failures = self.stats.failures,
            "Sync loop stopped"
        );
        Ok(self.stats)
    }
}

fn recover(error: TagError, outcome: fn(TagError) -> TickOutcome) -> Result<TickOutcome> {
    if error.is_transient() {
        warn!(error = %error, "Tick failed, retrying next poll");
        Ok(outcome(error))
    } else {
        Err(error)
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
