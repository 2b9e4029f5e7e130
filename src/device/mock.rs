//! Mock sink implementation for testing.
//!
//! Records every write and supports error injection so the sync loop's
//! retry behavior can be asserted without a mounted device.
//!
//! # Example
//!
//! ```rust,ignore
//! use tagsync::device::mock::{MockSink, WriteRecord};
//!
//! let sink = MockSink::new();
//! sink.inject_error(TagError::SinkWrite { path: "mock".into(), reason: "unplugged".into() });
//!
//! // ... run a tick; the first write fails, the next one succeeds
//! assert_eq!(sink.write_count(), 1);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, trace};

use super::{DeviceSink, DeviceUpdate};
use crate::error::{Result, TagError};
use crate::image_ops::{ImageHash, content_hash};

/// A successful write as seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub image_hash: ImageHash,
    pub width: u32,
    pub height: u32,
    pub led_bits: u8,
    pub hex_color: String,
    pub is_playing: bool,
}

/// Configuration for mock behavior.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Fail every write after this many successful ones.
    pub fail_after_writes: Option<usize>,
}

/// Recording sink for tests.
#[derive(Debug, Default)]
pub struct MockSink {
    writes: Mutex<Vec<WriteRecord>>,
    attempts: Mutex<usize>,
    error_injection: Mutex<Option<TagError>>,
    disconnected: AtomicBool,
    config: MockConfig,
}

impl MockSink {
    #[must_use]
    pub fn new() -> Self {
        debug!("Creating mock sink");
        Self::default()
    }

    /// Configure mock behavior.
    #[must_use]
    pub fn with_config(mut self, config: MockConfig) -> Self {
        self.config = config;
        self
    }

    /// Fail the next write with `error`.
    pub fn inject_error(&self, error: TagError) {
        *self.error_injection.lock().unwrap() = Some(error);
    }

    /// Fail every write until `reconnect`.
    pub fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }

    pub fn reconnect(&self) {
        self.disconnected.store(false, Ordering::SeqCst);
    }

    // === Assertions ===

    /// All successful writes, oldest first.
    #[must_use]
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.writes.lock().unwrap().clone()
    }

    /// Number of successful writes.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    /// Number of write attempts, including failed ones.
    #[must_use]
    pub fn attempt_count(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    #[must_use]
    pub fn last_write(&self) -> Option<WriteRecord> {
        self.writes.lock().unwrap().last().cloned()
    }

    /// Assert that nothing was written.
    ///
    /// # Panics
    ///
    /// Panics if any write was recorded.
    pub fn assert_no_writes(&self) {
        let writes = self.writes();
        assert!(writes.is_empty(), "Expected no writes, but found: {writes:#?}");
    }

    /// Clear the write log for fresh assertions.
    pub fn clear_writes(&self) {
        self.writes.lock().unwrap().clear();
        *self.attempts.lock().unwrap() = 0;
    }

    fn check_error(&self) -> Result<()> {
        if let Some(error) = self.error_injection.lock().unwrap().take() {
            return Err(error);
        }

        if self.disconnected.load(Ordering::SeqCst) {
            return Err(TagError::SinkWrite {
                path: self.describe(),
                reason: "Mock device disconnected".to_string(),
            });
        }

        if let Some(limit) = self.config.fail_after_writes {
            if self.write_count() >= limit {
                return Err(TagError::SinkWrite {
                    path: self.describe(),
                    reason: "Mock failure after write limit".to_string(),
                });
            }
        }

        Ok(())
    }
}

#[async_trait]
impl DeviceSink for MockSink {
    fn describe(&self) -> String {
        "mock://busytag".to_string()
    }

    async fn write(&mut self, update: &DeviceUpdate<'_>) -> Result<()> {
        *self.attempts.lock().unwrap() += 1;
        self.check_error()?;

        let record = WriteRecord {
            image_hash: content_hash(update.image),
            width: update.image.width(),
            height: update.image.height(),
            led_bits: update.led_bits,
            hex_color: update.hex_color.to_string(),
            is_playing: update.is_playing,
        };
        trace!(?record, "Recording write");
        self.writes.lock().unwrap().push(record);
        Ok(())
    }
}
