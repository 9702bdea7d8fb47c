/*!
 * Error types for the guacamayo reading engine.
 *
 * Collaborator failures are classified into small enums so the engine can
 * decide what to surface and what to swallow. Every error can render a
 * user-facing message through `user_message()`; raw collaborator text is
 * kept for logs only.
 */

use thiserror::Error;

/// Errors reported by the speech synthesis collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    /// No API key configured for the active TTS provider
    #[error("API key not configured")]
    MissingApiKey,

    /// The provider rejected the text or parameters
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Invalid API key
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Account quota or balance exhausted
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The key lacks permission for the requested voice
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The provider throttled the request
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// 5xx from the provider
    #[error("Service unavailable: {0}")]
    ServerUnavailable(String),

    /// The request did not complete in time
    #[error("Request timed out")]
    Timeout,

    /// Transport-level failure
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Too many requests already pending; the request was not queued
    #[error("Too many pending requests")]
    TooManyPendingRequests,

    /// The provider answered but the payload was unusable
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl SynthesisError {
    /// Classify an HTTP status returned by a TTS vendor
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match status {
            400 => Self::BadRequest(detail),
            401 => Self::Unauthorized(detail),
            402 => Self::QuotaExceeded(detail),
            403 => Self::Forbidden(detail),
            408 => Self::Timeout,
            429 => Self::RateLimited(detail),
            500..=599 => Self::ServerUnavailable(detail),
            _ => Self::InvalidResponse(format!("HTTP {}: {}", status, detail)),
        }
    }

    /// Human-readable message for a transient notification
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingApiKey => {
                "No API key configured. Open the extension settings to add your TTS API key.".to_string()
            }
            Self::BadRequest(_) => {
                "The speech service rejected this text. Try selecting a different area.".to_string()
            }
            Self::Unauthorized(_) => {
                "Invalid API key. Please check your API key in the extension settings.".to_string()
            }
            Self::QuotaExceeded(_) => {
                "API quota exceeded. Please check your account balance.".to_string()
            }
            Self::Forbidden(_) => {
                "Access denied. Your API key may not have permission for this voice.".to_string()
            }
            Self::RateLimited(_) | Self::TooManyPendingRequests => {
                "Too many requests. Please wait a moment and try again.".to_string()
            }
            Self::ServerUnavailable(_) => {
                "Speech service temporarily unavailable. Please try again later.".to_string()
            }
            Self::Timeout => "Request timed out. Please try again.".to_string(),
            Self::NetworkError(_) => {
                "Network error. Please check your internet connection.".to_string()
            }
            Self::InvalidResponse(_) => {
                "The speech service returned an unexpected response. Please try again.".to_string()
            }
        }
    }
}

/// Errors reported by the audio playback collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// The audio element refused to start
    #[error("Playback rejected: {0}")]
    Rejected(String),

    /// The media failed while playing
    #[error("Media error: {0}")]
    MediaError(String),
}

impl PlaybackError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected(_) => "Audio playback could not start. Please try again.".to_string(),
            Self::MediaError(_) => "Audio playback failed. Please try again.".to_string(),
        }
    }
}

/// Errors reported by the OCR flow and its collaborators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// No API key configured for the OCR provider
    #[error("OCR API key not configured")]
    MissingApiKey,

    /// The image could not be loaded
    #[error("Failed to load image: {0}")]
    ImageFetch(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("OCR request timed out")]
    Timeout,

    /// The image contained no readable text
    #[error("No text extracted from image")]
    NoTextFound,
}

impl ExtractionError {
    /// Classify an HTTP status returned by an OCR vendor
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match status {
            401 | 403 => Self::Unauthorized(detail),
            402 => Self::QuotaExceeded(detail),
            408 => Self::Timeout,
            429 => Self::RateLimited(detail),
            _ => Self::ServerError(format!("HTTP {}: {}", status, detail)),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::MissingApiKey => {
                "OCR API key not configured. Add it in the extension settings.".to_string()
            }
            Self::ImageFetch(_) => "Could not load this image.".to_string(),
            Self::Unauthorized(_) => "Invalid OCR API key.".to_string(),
            Self::QuotaExceeded(_) => "OCR quota exceeded.".to_string(),
            Self::RateLimited(_) => "Rate limit exceeded. Please wait a moment.".to_string(),
            Self::ServerError(_) => "OCR service error. Please try again later.".to_string(),
            Self::Timeout => "OCR request timed out.".to_string(),
            Self::NoTextFound => "No readable text found in image.".to_string(),
        }
    }
}

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Main error type for reading sessions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReaderError {
    /// The selection does not hold enough text to be worth reading
    #[error("Not enough readable text: {length} characters (minimum {minimum})")]
    InsufficientText { length: usize, minimum: usize },

    /// No ancestor of the trigger element holds meaningful text
    #[error("No readable content found")]
    NoReadableContent,

    /// An operation needed a selected container but none is active
    #[error("No container selected")]
    NoSelection,

    #[error("Synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("Playback failed: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// Invalid settings
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ReaderError {
    pub fn user_message(&self) -> String {
        match self {
            Self::InsufficientText { .. } => {
                "Not enough readable text in this selection. Try selecting a larger area.".to_string()
            }
            Self::NoReadableContent => {
                "No readable content found here. Try clicking on a text area.".to_string()
            }
            Self::NoSelection => "Select an area of the page to read first.".to_string(),
            Self::Synthesis(e) => e.user_message(),
            Self::Playback(e) => e.user_message(),
            Self::Extraction(e) => e.user_message(),
            Self::Config(_) => "Invalid settings. Please review the extension options.".to_string(),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::InsufficientText { .. } | Self::NoReadableContent | Self::NoSelection => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }
}
