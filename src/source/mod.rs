//! Track sources: where "what is playing" comes from.

mod file;
pub mod mock;
mod spotify;

pub use file::FileSource;
pub use spotify::{DEFAULT_API_BASE, SpotifySource, clean_title};

use async_trait::async_trait;

use crate::error::Result;
use crate::snapshot::PollOutcome;

/// A music service (or stand-in) that can be asked what is playing.
///
/// Implementations report "nothing playing" as `PollOutcome::NoTrackPlaying`,
/// never as an error. Errors are reserved for failed requests.
#[async_trait]
pub trait TrackSource: Send {
    /// Short description for logs.
    fn describe(&self) -> String;

    async fn poll(&mut self) -> Result<PollOutcome>;
}

#[async_trait]
impl<T: TrackSource + ?Sized> TrackSource for Box<T> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    async fn poll(&mut self) -> Result<PollOutcome> {
        (**self).poll().await
    }
}
