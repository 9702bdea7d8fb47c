/*!
 * Mock collaborator implementations for testing and simulation.
 *
 * This module provides scripted collaborators:
 * - `MockSynthesizer::working()` - Always succeeds, the payload is the chunk text
 * - `MockSynthesizer::failing(e)` - Always fails with the given error
 * - `MockSynthesizer::fail_after(n, e)` - Succeeds `n` times, then fails
 * - `RecordingAudioSink` - Records every call, optionally auto-ends playback
 * - `MockImageSource` / `MockTextExtractor` - Canned OCR results
 * - `RecordingNotifier` - Collects notices
 */

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::sync::mpsc::UnboundedSender;

use super::{
    AudioEvent, AudioPayload, AudioSink, ImageData, ImageSource, ImageTextExtractor, Notice,
    Notifier, OcrConfig, SpeechSynthesizer, VoiceConfig,
};
use crate::errors::{ExtractionError, PlaybackError, SynthesisError};

/// Behavior mode for the mock synthesizer
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Always fails with the given error
    Failing(SynthesisError),
    /// Succeeds for the first `successes` requests, then fails
    FailAfter { successes: usize, error: SynthesisError },
    /// Succeeds after a delay
    Slow { delay_ms: u64 },
}

/// Mock speech synthesizer
#[derive(Debug, Clone)]
pub struct MockSynthesizer {
    behavior: MockBehavior,
    /// Texts received, in request order
    requests: Arc<Mutex<Vec<String>>>,
    /// When set, every request waits for a permit before answering
    gate: Option<Arc<Semaphore>>,
}

/// Releases gated mock requests one permit at a time
#[derive(Debug, Clone)]
pub struct MockGate {
    semaphore: Arc<Semaphore>,
}

impl MockGate {
    /// Let `count` pending (or future) requests complete
    pub fn release(&self, count: usize) {
        self.semaphore.add_permits(count);
    }
}

impl MockSynthesizer {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            requests: Arc::new(Mutex::new(Vec::new())),
            gate: None,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn failing(error: SynthesisError) -> Self {
        Self::new(MockBehavior::Failing(error))
    }

    pub fn fail_after(successes: usize, error: SynthesisError) -> Self {
        Self::new(MockBehavior::FailAfter { successes, error })
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Hold every request until the returned gate releases it
    pub fn gated(mut self) -> (Self, MockGate) {
        let semaphore = Arc::new(Semaphore::new(0));
        self.gate = Some(Arc::clone(&semaphore));
        (self, MockGate { semaphore })
    }

    /// Texts requested so far
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, _voice: &VoiceConfig) -> Result<AudioPayload, SynthesisError> {
        let index = {
            let mut requests = self.requests.lock();
            requests.push(text.to_string());
            requests.len() - 1
        };

        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| SynthesisError::NetworkError(e.to_string()))?;
            permit.forget();
        }

        match &self.behavior {
            MockBehavior::Working => Ok(AudioPayload::new(text.as_bytes().to_vec())),
            MockBehavior::Failing(error) => Err(error.clone()),
            MockBehavior::FailAfter { successes, error } => {
                if index < *successes {
                    Ok(AudioPayload::new(text.as_bytes().to_vec()))
                } else {
                    Err(error.clone())
                }
            }
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                Ok(AudioPayload::new(text.as_bytes().to_vec()))
            }
        }
    }
}

/// A call received by the recording sink
#[derive(Debug, Clone, PartialEq)]
pub enum AudioCall {
    Play { audio: AudioPayload, speed: f32, generation: u64 },
    Pause,
    Resume,
    Stop,
    SetSpeed(f32),
}

/// Audio sink that records calls and can emit `Ended` on a timer
#[derive(Debug, Clone, Default)]
pub struct RecordingAudioSink {
    calls: Arc<Mutex<Vec<AudioCall>>>,
    reject_play: bool,
    auto_end: Option<(Duration, UnboundedSender<AudioEvent>)>,
    /// Bumped on every play/pause/stop; stale timers compare against it
    token: Arc<AtomicU64>,
    /// Generation of the most recent `play`
    playing: Arc<AtomicU64>,
}

impl RecordingAudioSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose `play` always fails
    pub fn rejecting() -> Self {
        Self {
            reject_play: true,
            ..Self::default()
        }
    }

    /// A sink that reports `Ended` after `duration` of uninterrupted playback
    pub fn auto_ending(duration: Duration, events: UnboundedSender<AudioEvent>) -> Self {
        Self {
            auto_end: Some((duration, events)),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<AudioCall> {
        self.calls.lock().clone()
    }

    /// Payloads handed to `play`, decoded as text (mock payloads are the chunk text)
    pub fn played_texts(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                AudioCall::Play { audio, .. } => {
                    Some(String::from_utf8_lossy(audio.bytes()).into_owned())
                }
                _ => None,
            })
            .collect()
    }

    /// The `Ended` event the most recent `play` would emit
    pub fn ended_event(&self) -> AudioEvent {
        AudioEvent::Ended {
            generation: self.playing.load(Ordering::SeqCst),
        }
    }

    pub fn play_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, AudioCall::Play { .. }))
            .count()
    }

    fn arm_timer(&self) {
        let token = self.token.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((duration, events)) = &self.auto_end {
            let current = Arc::clone(&self.token);
            let events = events.clone();
            let duration = *duration;
            let generation = self.playing.load(Ordering::SeqCst);
            tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                if current.load(Ordering::SeqCst) == token {
                    let _ = events.send(AudioEvent::Ended { generation });
                }
            });
        }
    }

    fn disarm_timer(&self) {
        self.token.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl AudioSink for RecordingAudioSink {
    async fn play(&self, audio: AudioPayload, speed: f32, generation: u64) -> Result<(), PlaybackError> {
        self.calls.lock().push(AudioCall::Play { audio, speed, generation });
        if self.reject_play {
            return Err(PlaybackError::Rejected("NotAllowedError".to_string()));
        }
        self.playing.store(generation, Ordering::SeqCst);
        self.arm_timer();
        Ok(())
    }

    async fn pause(&self) -> Result<(), PlaybackError> {
        self.calls.lock().push(AudioCall::Pause);
        self.disarm_timer();
        Ok(())
    }

    async fn resume(&self) -> Result<(), PlaybackError> {
        self.calls.lock().push(AudioCall::Resume);
        self.arm_timer();
        Ok(())
    }

    async fn stop(&self) -> Result<(), PlaybackError> {
        self.calls.lock().push(AudioCall::Stop);
        self.disarm_timer();
        Ok(())
    }

    async fn set_speed(&self, speed: f32) -> Result<(), PlaybackError> {
        self.calls.lock().push(AudioCall::SetSpeed(speed));
        Ok(())
    }
}

/// Image source returning a fixed result
#[derive(Debug, Clone)]
pub struct MockImageSource {
    result: Result<ImageData, ExtractionError>,
}

impl MockImageSource {
    pub fn png() -> Self {
        Self {
            result: Ok(ImageData {
                mime_type: "image/png".to_string(),
                data: Bytes::from_static(b"\x89PNG\r\n\x1a\n"),
            }),
        }
    }

    pub fn failing(error: ExtractionError) -> Self {
        Self { result: Err(error) }
    }
}

#[async_trait]
impl ImageSource for MockImageSource {
    async fn fetch(&self, _url: &str) -> Result<ImageData, ExtractionError> {
        self.result.clone()
    }
}

/// OCR extractor returning a fixed result
#[derive(Debug, Clone)]
pub struct MockTextExtractor {
    result: Result<String, ExtractionError>,
    calls: Arc<Mutex<usize>>,
}

impl MockTextExtractor {
    pub fn returning(text: impl Into<String>) -> Self {
        Self {
            result: Ok(text.into()),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn failing(error: ExtractionError) -> Self {
        Self {
            result: Err(error),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl ImageTextExtractor for MockTextExtractor {
    async fn extract(&self, _image: &ImageData, _config: &OcrConfig) -> Result<String, ExtractionError> {
        *self.calls.lock() += 1;
        self.result.clone()
    }
}

/// Notifier that keeps every notice
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.notices.lock().iter().map(|n| n.message.clone()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}
