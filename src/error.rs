//! Error types for tagsync operations.

use thiserror::Error;

/// Primary error type for tagsync.
#[derive(Error, Debug)]
pub enum TagError {
    // Music service errors
    #[error("Failed to fetch current track: {0}")]
    Fetch(String),

    #[error("Music service rejected the access token (HTTP 401)")]
    Unauthorized,

    #[error("Failed to fetch artwork from {url}: {reason}")]
    ArtworkFetch { url: String, reason: String },

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    // Rendering and color errors
    #[error("Failed to render composite image: {0}")]
    Render(String),

    #[error("Color quantizer produced no candidates")]
    EmptyPalette,

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("Image file not found: {path}")]
    ImageNotFound { path: String },

    // Device errors
    #[error("Failed to write to device at {path}: {reason}")]
    SinkWrite { path: String, reason: String },

    // Configuration errors
    #[error("Unknown extraction mode '{0}' (expected vibrant, dominant, complementary or bright)")]
    InvalidMode(String),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl TagError {
    /// Returns true if the error only affects the current tick.
    ///
    /// Transient errors are logged and retried on the next poll; everything
    /// else stops the sync loop.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Fetch(_)
                | Self::Unauthorized
                | Self::ArtworkFetch { .. }
                | Self::Timeout { .. }
                | Self::Render(_)
                | Self::ImageProcessing(_)
                | Self::SinkWrite { .. }
                | Self::Io(_)
        )
    }

    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized
                | Self::InvalidMode(_)
                | Self::ImageNotFound { .. }
                | Self::ConfigNotFound { .. }
                | Self::ConfigParse(_)
                | Self::ConfigInvalid(_)
                | Self::SinkWrite { .. }
        )
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Unauthorized => Some("Refresh the token in SPOTIFY_ACCESS_TOKEN"),
            Self::InvalidMode(_) => Some("Use one of: vibrant, dominant, complementary, bright"),
            Self::ConfigNotFound { .. } => Some("Run: tagsync init"),
            Self::SinkWrite { .. } => Some("Check that the BusyTag volume is mounted"),
            Self::EmptyPalette => Some("This is a bug; please report it with the artwork used"),
            _ => None,
        }
    }
}

/// Convenience type alias for Results using TagError.
pub type Result<T> = std::result::Result<T, TagError>;

/// Extension trait for adding context to errors.
pub trait ResultExt<T> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| TagError::Other(format!("{}: {e}", f().into())))
    }
}
