//! Spotify Web API source.
//!
//! Token acquisition is out of scope: unless a fixed token is configured,
//! the bearer token is read from an environment variable on every poll, so
//! an external refresher can rotate it without restarting the loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::RgbaImage;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, trace};

use super::TrackSource;
use crate::error::{Result, TagError};
use crate::image_ops::decode_image;
use crate::snapshot::{PollOutcome, TrackSnapshot};

/// Default Web API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.spotify.com";

const CURRENTLY_PLAYING: &str = "/v1/me/player/currently-playing";

#[derive(Debug, Deserialize)]
struct CurrentlyPlaying {
    #[serde(default)]
    is_playing: bool,
    #[serde(default)]
    currently_playing_type: Option<String>,
    item: Option<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    id: Option<String>,
    name: String,
    #[serde(default)]
    artists: Vec<Named>,
    album: Option<Album>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Album {
    #[serde(default)]
    images: Vec<AlbumImage>,
}

#[derive(Debug, Deserialize)]
struct AlbumImage {
    url: String,
}

/// Track metadata pulled out of a currently-playing response.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TrackInfo {
    track_id: String,
    title: String,
    artist: String,
    artwork_url: Option<String>,
    is_playing: bool,
}

/// Drop a trailing " (feat. ...)" from a track title.
#[must_use]
pub fn clean_title(title: &str) -> &str {
    title.find(" (feat.").map_or(title, |i| &title[..i]).trim_end()
}

/// `None` when nothing (or an ad) is playing.
fn parse_currently_playing(body: &str) -> Result<Option<TrackInfo>> {
    let doc: CurrentlyPlaying =
        serde_json::from_str(body).map_err(|e| TagError::Fetch(format!("bad response: {e}")))?;

    if doc.currently_playing_type.as_deref() == Some("ad") {
        debug!("Advertisement playing");
        return Ok(None);
    }
    let Some(item) = doc.item else {
        return Ok(None);
    };

    let title = clean_title(&item.name).to_string();
    Ok(Some(TrackInfo {
        // Local files have no id; the title is the best identity available.
        track_id: item.id.unwrap_or_else(|| format!("local:{}", item.name)),
        title,
        artist: item
            .artists
            .into_iter()
            .next()
            .map(|a| a.name)
            .unwrap_or_default(),
        artwork_url: item
            .album
            .and_then(|a| a.images.into_iter().next())
            .map(|i| i.url),
        is_playing: doc.is_playing,
    }))
}

/// Polls the Spotify currently-playing endpoint.
#[derive(Debug, Clone)]
pub struct SpotifySource {
    client: Client,
    api_base: String,
    token_env: String,
    fixed_token: Option<String>,
    artwork_cache: Option<(String, Arc<RgbaImage>)>,
}

impl SpotifySource {
    pub fn new(
        api_base: impl Into<String>,
        token_env: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tagsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TagError::Other(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token_env: token_env.into(),
            fixed_token: None,
            artwork_cache: None,
        })
    }

    /// Use `token` for every request instead of the environment variable.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.fixed_token = Some(token.into());
        self
    }

    fn token(&self) -> Result<String> {
        self.fixed_token
            .clone()
            .or_else(|| std::env::var(&self.token_env).ok())
            .filter(|t| !t.trim().is_empty())
            .ok_or(TagError::Unauthorized)
    }

    async fn artwork(&mut self, url: &str) -> Result<Arc<RgbaImage>> {
        if let Some((cached_url, image)) = &self.artwork_cache {
            if cached_url == url {
                trace!(url, "Artwork cache hit");
                return Ok(Arc::clone(image));
            }
        }

        let fail = |reason: String| TagError::ArtworkFetch {
            url: url.to_string(),
            reason,
        };
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fail(format!("HTTP {}", response.status())));
        }
        let bytes = response.bytes().await.map_err(|e| fail(e.to_string()))?;
        let image = Arc::new(decode_image(&bytes).map_err(|e| fail(e.to_string()))?);

        debug!(url, width = image.width(), height = image.height(), "Downloaded artwork");
        self.artwork_cache = Some((url.to_string(), Arc::clone(&image)));
        Ok(image)
    }
}

#[async_trait]
impl TrackSource for SpotifySource {
    fn describe(&self) -> String {
        format!("spotify ({})", self.api_base)
    }

    async fn poll(&mut self) -> Result<PollOutcome> {
        let token = self.token()?;
        let response = self
            .client
            .get(format!("{}{CURRENTLY_PLAYING}", self.api_base))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| TagError::Fetch(e.to_string()))?;

        match response.status() {
            StatusCode::NO_CONTENT => return Ok(PollOutcome::NoTrackPlaying),
            StatusCode::UNAUTHORIZED => return Err(TagError::Unauthorized),
            status if !status.is_success() => {
                return Err(TagError::Fetch(format!("unexpected HTTP {status}")));
            }
            _ => {}
        }

        let body = response
            .text()
            .await
            .map_err(|e| TagError::Fetch(e.to_string()))?;
        let Some(info) = parse_currently_playing(&body)? else {
            return Ok(PollOutcome::NoTrackPlaying);
        };

        let artwork = match &info.artwork_url {
            Some(url) => self.artwork(url).await?,
            None => Arc::new(RgbaImage::new(0, 0)),
        };

        Ok(PollOutcome::Track(
            TrackSnapshot::new(
                info.track_id,
                info.title,
                info.artist,
                RgbaImage::new(0, 0),
                info.is_playing,
            )
            .with_shared_artwork(artwork),
        ))
    }
}
