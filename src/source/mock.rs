//! Scripted track source for testing.
//!
//! Outcomes are queued up front (or pushed while the loop runs, through a
//! cloned handle) and handed out one per poll. Once the queue is empty the
//! last successful outcome repeats, like a service reporting the same track.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::TrackSource;
use crate::error::Result;
use crate::snapshot::{PollOutcome, TrackSnapshot};

#[derive(Debug, Default)]
struct Script {
    queue: VecDeque<Result<PollOutcome>>,
    last: Option<PollOutcome>,
    polls: usize,
}

/// Track source that replays queued outcomes.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
}

impl ScriptedSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every poll.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push(&self, outcome: Result<PollOutcome>) {
        self.script.lock().unwrap().queue.push_back(outcome);
    }

    pub fn push_track(&self, snapshot: TrackSnapshot) {
        self.push(Ok(PollOutcome::Track(snapshot)));
    }

    /// Number of polls served so far.
    #[must_use]
    pub fn poll_count(&self) -> usize {
        self.script.lock().unwrap().polls
    }
}

#[async_trait]
impl TrackSource for ScriptedSource {
    fn describe(&self) -> String {
        "scripted".to_string()
    }

    async fn poll(&mut self) -> Result<PollOutcome> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut script = self.script.lock().unwrap();
        script.polls += 1;
        match script.queue.pop_front() {
            Some(Ok(outcome)) => {
                script.last = Some(outcome.clone());
                Ok(outcome)
            }
            Some(Err(e)) => Err(e),
            None => Ok(script.last.clone().unwrap_or(PollOutcome::NoTrackPlaying)),
        }
    }
}
