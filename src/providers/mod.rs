/*!
 * Collaborator interfaces for the reading engine.
 *
 * The core never talks to a TTS vendor, an audio element or an OCR service
 * directly. It goes through these traits instead:
 * - `SpeechSynthesizer`: text to audio payload
 * - `AudioSink`: the single process-wide audio element
 * - `ImageSource` / `ImageTextExtractor`: the OCR pipeline
 * - `Notifier`: transient user notifications
 *
 * `throttle` wraps a synthesizer with request spacing and a pending cap,
 * and `mock` provides scripted implementations for tests and simulation.
 */

use async_trait::async_trait;
use bytes::Bytes;
use log::{error, info, warn};
use std::fmt::Debug;
use std::time::Duration;

use crate::app_config::TtsProvider;
use crate::errors::{ExtractionError, PlaybackError, Severity, SynthesisError};

pub mod mock;
pub mod throttle;

pub use throttle::ThrottledSynthesizer;

/// Voice selection handed to the synthesizer with every request
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceConfig {
    pub provider: TtsProvider,
    pub base_url: String,
    pub api_key: String,
    /// Empty for providers where the voice is the model
    pub model: String,
    pub voice: String,
}

/// OCR model selection handed to the extractor
#[derive(Debug, Clone, PartialEq)]
pub struct OcrConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

/// Encoded audio for one chunk, as returned by the synthesizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    data: Bytes,
}

impl AudioPayload {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Raw image bytes fetched for OCR
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub mime_type: String,
    pub data: Bytes,
}

/// Notification emitted by the audio sink for each `play` call.
///
/// Exactly one of these follows a successful `play`, unless playback was
/// stopped first, in which case nothing is emitted. Each event carries the
/// generation passed to the `play` it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioEvent {
    Ended { generation: u64 },
    Error { generation: u64, message: String },
}


/// Text-to-speech collaborator
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync + Debug {
    /// Synthesize one chunk of text
    ///
    /// # Arguments
    /// * `text` - The chunk to speak
    /// * `voice` - Provider, key and voice to use
    ///
    /// # Returns
    /// * `Result<AudioPayload, SynthesisError>` - Encoded audio or a classified failure
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<AudioPayload, SynthesisError>;
}

/// Audio playback collaborator
///
/// There is one audio element per process; `play` replaces whatever is
/// currently playing.
#[async_trait]
pub trait AudioSink: Send + Sync + Debug {
    /// Start playing the payload; resolves once playback has started.
    ///
    /// The `AudioEvent` that ends this play must carry `generation`.
    async fn play(&self, audio: AudioPayload, speed: f32, generation: u64) -> Result<(), PlaybackError>;

    async fn pause(&self) -> Result<(), PlaybackError>;

    async fn resume(&self) -> Result<(), PlaybackError>;

    /// Stop and discard the current audio; emits no further event for it
    async fn stop(&self) -> Result<(), PlaybackError>;

    async fn set_speed(&self, speed: f32) -> Result<(), PlaybackError>;
}

/// Loads image bytes for the OCR flow
#[async_trait]
pub trait ImageSource: Send + Sync + Debug {
    async fn fetch(&self, url: &str) -> Result<ImageData, ExtractionError>;
}

/// OCR collaborator
#[async_trait]
pub trait ImageTextExtractor: Send + Sync + Debug {
    async fn extract(&self, image: &ImageData, config: &OcrConfig) -> Result<String, ExtractionError>;
}

/// A transient, auto-dismissing notification
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
    pub duration: Duration,
}

impl Notice {
    pub fn new(severity: Severity, message: impl Into<String>, duration: Duration) -> Self {
        Self {
            severity,
            message: message.into(),
            duration,
        }
    }
}

/// Surface for user-facing notifications
pub trait Notifier: Send + Sync + Debug {
    fn notify(&self, notice: Notice);
}

/// Notifier that routes notices to the log
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.severity {
            Severity::Info => info!("{}", notice.message),
            Severity::Warning => warn!("{}", notice.message),
            Severity::Error => error!("{}", notice.message),
        }
    }
}
