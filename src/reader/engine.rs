/*!
 * Playback engine.
 *
 * The state machine behind a reading session:
 *
 * ```text
 * Idle -> Loading -> Playing <-> Paused
 *   ^        |          |          |
 *   +--------+----------+----------+  (stop, failure, completion)
 * ```
 *
 * Chunks play strictly in order; the audio sink's `Ended` event is the only
 * thing that advances to the next chunk. While a chunk plays, the next few
 * are synthesized ahead of time into the `AudioCache`.
 *
 * Every stop, jump or restart bumps a generation counter. Asynchronous work
 * captures the generation it started under and compares it after each
 * suspension point, so results belonging to abandoned playback are dropped
 * without side effects.
 */

use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use super::cache::AudioCache;
use super::chunker::chunk_text;
use super::extract::extract_readable_text;
use super::highlight::Highlighter;
use super::ocr::clean_ocr_text;
use super::SharedDocument;
use crate::app_config::{Config, SettingsUpdate, TtsProvider};
use crate::dom::{LayoutProvider, NodeId};
use crate::errors::{ReaderError, Severity, SynthesisError};
use crate::providers::{AudioPayload, AudioSink, Notice, Notifier, SpeechSynthesizer, VoiceConfig};

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
}

/// Where the text being read came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource {
    /// A container in the page; highlighting and click-to-seek are enabled
    Page(NodeId),
    /// Text extracted from an image; there is no range to highlight
    Ocr,
}

/// Progress published to observers after every transition
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    pub current_index: usize,
    pub total_chunks: usize,
    pub source: Option<ContentSource>,
}

impl PlaybackSnapshot {
    /// `"3/12"`-style progress while a session is active
    pub fn progress_label(&self) -> Option<String> {
        if self.state == PlaybackState::Idle || self.total_chunks == 0 {
            return None;
        }
        Some(format!("{}/{}", self.current_index + 1, self.total_chunks))
    }
}

type SynthesisFlight = Shared<BoxFuture<'static, Result<AudioPayload, SynthesisError>>>;

#[derive(Debug, Default)]
struct Playback {
    state: PlaybackState,
    chunks: Arc<Vec<String>>,
    current: usize,
    generation: u64,
    source: Option<ContentSource>,
}

struct EngineInner {
    doc: SharedDocument,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    audio: Arc<dyn AudioSink>,
    notifier: Arc<dyn Notifier>,
    highlighter: Highlighter,
    settings: RwLock<Config>,
    playback: Mutex<Playback>,
    cache: AudioCache,
    /// Synthesis requests in flight, keyed by chunk index, tagged with their generation
    in_flight: Mutex<HashMap<usize, (u64, SynthesisFlight)>>,
    progress: watch::Sender<PlaybackSnapshot>,
}

/// Handle to the playback engine; clones share the same session
#[derive(Clone)]
pub struct PlaybackEngine {
    inner: Arc<EngineInner>,
}

impl fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("snapshot", &self.snapshot())
            .field("cached", &self.inner.cache.indices())
            .finish()
    }
}

impl PlaybackEngine {
    pub fn new(
        doc: SharedDocument,
        config: Config,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        audio: Arc<dyn AudioSink>,
        notifier: Arc<dyn Notifier>,
        layout: Arc<dyn LayoutProvider>,
    ) -> Self {
        let highlighter = Highlighter::new(Arc::clone(&doc), layout);
        let (progress, _) = watch::channel(PlaybackSnapshot::default());
        Self {
            inner: Arc::new(EngineInner {
                doc,
                synthesizer,
                audio,
                notifier,
                highlighter,
                settings: RwLock::new(config),
                playback: Mutex::new(Playback::default()),
                cache: AudioCache::new(),
                in_flight: Mutex::new(HashMap::new()),
                progress,
            }),
        }
    }

    /// Receive a snapshot after every state or progress change
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.inner.progress.subscribe()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let playback = self.inner.playback.lock();
        PlaybackSnapshot {
            state: playback.state,
            current_index: playback.current,
            total_chunks: playback.chunks.len(),
            source: playback.source,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.playback.lock().state
    }

    /// Index of the chunk being played; meaningless while idle
    pub fn current_index(&self) -> usize {
        self.inner.playback.lock().current
    }

    pub fn chunks(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.inner.playback.lock().chunks)
    }

    pub fn source(&self) -> Option<ContentSource> {
        self.inner.playback.lock().source
    }

    pub fn is_active(&self) -> bool {
        self.state() != PlaybackState::Idle
    }

    /// Click-to-seek is attached while page content is being read
    pub fn click_seek_enabled(&self) -> bool {
        let playback = self.inner.playback.lock();
        playback.state != PlaybackState::Idle
            && matches!(playback.source, Some(ContentSource::Page(_)))
    }

    pub fn cache(&self) -> &AudioCache {
        &self.inner.cache
    }

    pub fn highlighter(&self) -> &Highlighter {
        &self.inner.highlighter
    }

    pub fn document(&self) -> &SharedDocument {
        &self.inner.doc
    }

    /// Current settings snapshot
    pub fn settings(&self) -> Config {
        self.inner.settings.read().clone()
    }

    pub fn speed(&self) -> f32 {
        self.inner.settings.read().speed
    }

    /// Voice settings, failing when the active provider needs a key and has none
    pub fn voice_config(&self) -> Result<VoiceConfig, SynthesisError> {
        let voice = self.inner.settings.read().voice_config();
        if voice.api_key.is_empty() && voice.provider != TtsProvider::OpenAiCompatible {
            return Err(SynthesisError::MissingApiKey);
        }
        Ok(voice)
    }

    fn publish(&self) {
        self.inner.progress.send_replace(self.snapshot());
    }

    /// Whether work started under `generation` may still apply its results
    fn is_current(&self, generation: u64) -> bool {
        let playback = self.inner.playback.lock();
        playback.generation == generation && playback.state != PlaybackState::Idle
    }

    fn set_state_if_current(&self, generation: u64, state: PlaybackState) -> bool {
        let changed = {
            let mut playback = self.inner.playback.lock();
            if playback.generation == generation && playback.state != PlaybackState::Idle {
                playback.state = state;
                true
            } else {
                false
            }
        };
        if changed {
            self.publish();
        }
        changed
    }

    /// Show a classified notification for `error`
    pub fn surface(&self, error: &ReaderError) {
        match error.severity() {
            Severity::Error => error!("{}", error),
            _ => warn!("{}", error),
        }
        let duration = Duration::from_millis(self.inner.settings.read().reading.notification_ms);
        self.inner
            .notifier
            .notify(Notice::new(error.severity(), error.user_message(), duration));
    }

    async fn fail(&self, error: &ReaderError) {
        self.surface(error);
        self.stop().await;
    }

    /// Start reading the container's text from the first chunk
    pub async fn start(&self, container: Option<NodeId>) -> Result<(), ReaderError> {
        let container = container.ok_or(ReaderError::NoSelection)?;
        let text = {
            let doc = self.inner.doc.read();
            extract_readable_text(&doc, Some(container))
        };

        let (minimum, max_chunk_length) = {
            let settings = self.inner.settings.read();
            (settings.reading.min_text_length, settings.reading.max_chunk_length)
        };
        let length = text.chars().count();
        if length < minimum {
            let err = ReaderError::InsufficientText { length, minimum };
            self.surface(&err);
            return Err(err);
        }

        let chunks = chunk_text(&text, max_chunk_length);
        info!("Starting playback: {} characters in {} chunks", length, chunks.len());
        self.begin(chunks, ContentSource::Page(container)).await
    }

    /// Read text that has no source range in the page (OCR results)
    pub async fn start_text(&self, text: &str) -> Result<(), ReaderError> {
        if let Err(e) = self.voice_config() {
            let err = ReaderError::Synthesis(e);
            self.surface(&err);
            return Err(err);
        }

        let cleaned = clean_ocr_text(text);
        if cleaned.is_empty() {
            let err = ReaderError::InsufficientText {
                length: 0,
                minimum: self.inner.settings.read().reading.min_ocr_text_length,
            };
            self.surface(&err);
            return Err(err);
        }

        let chunks = chunk_text(&cleaned, self.inner.settings.read().reading.max_chunk_length);
        info!("Starting playback of extracted text in {} chunks", chunks.len());
        self.begin(chunks, ContentSource::Ocr).await
    }

    async fn begin(&self, chunks: Vec<String>, source: ContentSource) -> Result<(), ReaderError> {
        let was_active = {
            let mut playback = self.inner.playback.lock();
            let was_active = playback.state != PlaybackState::Idle;
            playback.generation += 1;
            playback.chunks = Arc::new(chunks);
            playback.current = 0;
            playback.state = PlaybackState::Loading;
            playback.source = Some(source);
            was_active
        };
        self.inner.cache.clear();
        self.inner.in_flight.lock().clear();
        self.inner.highlighter.clear();

        if was_active {
            if let Err(e) = self.inner.audio.stop().await {
                warn!("Failed to stop previous audio: {}", e);
            }
        }
        self.publish();
        self.play_chunk(0).await
    }

    /// Play chunk `index`, from cache or by synthesizing it.
    ///
    /// Past the last chunk this completes the session.
    pub async fn play_chunk(&self, index: usize) -> Result<(), ReaderError> {
        let next = {
            let mut playback = self.inner.playback.lock();
            if playback.state == PlaybackState::Idle {
                debug!("Ignoring play request for chunk {}: playback stopped", index);
                return Ok(());
            }
            if index >= playback.chunks.len() {
                None
            } else {
                playback.current = index;
                Some((playback.generation, playback.chunks[index].clone(), playback.source))
            }
        };

        let Some((generation, text, source)) = next else {
            info!("Finished reading all chunks");
            self.stop().await;
            return Ok(());
        };
        self.publish();

        if let Some(ContentSource::Page(container)) = source {
            self.inner.highlighter.highlight(&text, container);
        }

        let cached = self.inner.cache.get(index);
        let audio = match cached {
            Some(audio) => audio,
            None => {
                self.set_state_if_current(generation, PlaybackState::Loading);
                match self.synthesize_chunk(index, &text, generation).await {
                    Ok(audio) => audio,
                    Err(e) => {
                        if !self.is_current(generation) {
                            debug!("Dropping synthesis failure for abandoned chunk {}", index);
                            return Ok(());
                        }
                        let err = ReaderError::Synthesis(e);
                        self.fail(&err).await;
                        return Err(err);
                    }
                }
            }
        };

        if !self.is_current(generation) {
            debug!("Discarding stale audio for chunk {}", index);
            return Ok(());
        }
        self.inner.cache.take(index);

        let speed = self.speed();
        if let Err(e) = self.inner.audio.play(audio, speed, generation).await {
            if !self.is_current(generation) {
                return Ok(());
            }
            let err = ReaderError::Playback(e);
            self.fail(&err).await;
            return Err(err);
        }

        if !self.set_state_if_current(generation, PlaybackState::Playing) {
            // Stopped while the sink was starting; silence it unless newer playback took over
            if self.state() == PlaybackState::Idle {
                if let Err(e) = self.inner.audio.stop().await {
                    warn!("Failed to stop audio: {}", e);
                }
            }
            return Ok(());
        }
        debug!("Playing chunk {}", index + 1);

        let count = self.inner.settings.read().reading.prefetch_count;
        if count > 0 {
            let engine = self.clone();
            tokio::spawn(async move {
                engine.prefetch(index + 1, count, generation).await;
            });
        }
        Ok(())
    }

    /// Synthesize a chunk, joining a request already in flight for it
    async fn synthesize_chunk(
        &self,
        index: usize,
        text: &str,
        generation: u64,
    ) -> Result<AudioPayload, SynthesisError> {
        let voice = self.voice_config()?;

        let flight = {
            let mut flights = self.inner.in_flight.lock();
            let existing = flights
                .get(&index)
                .filter(|(flight_generation, _)| *flight_generation == generation)
                .map(|(_, flight)| flight.clone());
            match existing {
                Some(flight) => {
                    debug!("Joining in-flight synthesis for chunk {}", index);
                    flight
                }
                None => {
                    let synthesizer = Arc::clone(&self.inner.synthesizer);
                    let text = text.to_string();
                    let flight = async move { synthesizer.synthesize(&text, &voice).await }
                        .boxed()
                        .shared();
                    flights.insert(index, (generation, flight.clone()));
                    flight
                }
            }
        };

        let result = flight.await;

        let mut flights = self.inner.in_flight.lock();
        if flights.get(&index).is_some_and(|(g, _)| *g == generation) {
            flights.remove(&index);
        }
        result
    }

    /// Synthesize chunks `[start, start + count)` ahead of playback.
    ///
    /// Requests are issued one at a time. Any failure ends the prefetch
    /// quietly; only the playing chunk's failures reach the user.
    pub async fn prefetch(&self, start: usize, count: usize, generation: u64) {
        let chunks = {
            let playback = self.inner.playback.lock();
            if playback.generation != generation {
                return;
            }
            Arc::clone(&playback.chunks)
        };
        let end = start.saturating_add(count).min(chunks.len());

        for index in start..end {
            if !self.is_current(generation) {
                debug!("Prefetch abandoned at chunk {}", index);
                break;
            }
            if self.inner.cache.contains(index) {
                continue;
            }

            match self.synthesize_chunk(index, &chunks[index], generation).await {
                Ok(audio) => {
                    // Stop and jump bump the generation before clearing the cache,
                    // so checking and inserting under one lock cannot leave stale audio
                    let playback = self.inner.playback.lock();
                    let current = playback.generation == generation && playback.state != PlaybackState::Idle;
                    if current && index > playback.current {
                        self.inner.cache.insert(index, audio);
                    } else if !current {
                        debug!("Discarding prefetched audio for chunk {}", index);
                        break;
                    }
                }
                Err(e) => {
                    warn!("Prefetch of chunk {} failed: {}", index, e);
                    break;
                }
            }
        }
    }

    /// Generation of the current playback
    pub fn generation(&self) -> u64 {
        self.inner.playback.lock().generation
    }

    pub async fn pause(&self) -> Result<(), ReaderError> {
        let generation = {
            let playback = self.inner.playback.lock();
            if playback.state != PlaybackState::Playing {
                return Ok(());
            }
            playback.generation
        };

        if let Err(e) = self.inner.audio.pause().await {
            let err = ReaderError::Playback(e);
            if self.is_current(generation) {
                self.fail(&err).await;
            }
            return Err(err);
        }
        self.set_state_if_current(generation, PlaybackState::Paused);
        Ok(())
    }

    pub async fn resume(&self) -> Result<(), ReaderError> {
        let generation = {
            let playback = self.inner.playback.lock();
            if playback.state != PlaybackState::Paused {
                return Ok(());
            }
            playback.generation
        };

        if let Err(e) = self.inner.audio.resume().await {
            let err = ReaderError::Playback(e);
            if self.is_current(generation) {
                self.fail(&err).await;
            }
            return Err(err);
        }
        self.set_state_if_current(generation, PlaybackState::Playing);
        Ok(())
    }

    /// Stop playback from any state and reset to idle
    pub async fn stop(&self) {
        let previous = {
            let mut playback = self.inner.playback.lock();
            let previous = playback.state;
            playback.generation += 1;
            playback.state = PlaybackState::Idle;
            playback.current = 0;
            playback.source = None;
            playback.chunks = Arc::new(Vec::new());
            previous
        };
        self.inner.cache.clear();
        self.inner.in_flight.lock().clear();
        self.inner.highlighter.clear();
        self.publish();

        if previous != PlaybackState::Idle {
            info!("Playback stopped");
        }
        if let Err(e) = self.inner.audio.stop().await {
            warn!("Failed to stop audio: {}", e);
        }
    }

    /// Abandon the current chunk and play `index` instead
    pub async fn jump_to_chunk(&self, index: usize) -> Result<(), ReaderError> {
        {
            let mut playback = self.inner.playback.lock();
            if playback.state == PlaybackState::Idle {
                return Ok(());
            }
            playback.generation += 1;
            playback.state = PlaybackState::Loading;
            playback.current = index;
        }
        self.inner.cache.clear();
        self.inner.in_flight.lock().clear();
        info!("Jumping to chunk {}", index + 1);

        if let Err(e) = self.inner.audio.stop().await {
            warn!("Failed to stop audio: {}", e);
        }
        self.publish();
        self.play_chunk(index).await
    }

    /// Skip to the next chunk while playing; no-op on the last chunk
    pub async fn skip_forward(&self) -> Result<(), ReaderError> {
        let target = {
            let playback = self.inner.playback.lock();
            (playback.state == PlaybackState::Playing && playback.current + 1 < playback.chunks.len())
                .then_some(playback.current + 1)
        };
        match target {
            Some(index) => self.jump_to_chunk(index).await,
            None => Ok(()),
        }
    }

    /// Skip to the previous chunk while playing; no-op on the first chunk
    pub async fn skip_back(&self) -> Result<(), ReaderError> {
        let target = {
            let playback = self.inner.playback.lock();
            (playback.state == PlaybackState::Playing && playback.current > 0)
                .then(|| playback.current - 1)
        };
        match target {
            Some(index) => self.jump_to_chunk(index).await,
            None => Ok(()),
        }
    }

    /// The sink finished the chunk it was given under `generation`
    pub async fn on_audio_ended(&self, generation: u64) -> Result<(), ReaderError> {
        let next = {
            let playback = self.inner.playback.lock();
            (playback.state == PlaybackState::Playing && playback.generation == generation)
                .then_some(playback.current + 1)
        };
        match next {
            Some(index) => self.play_chunk(index).await,
            None => {
                debug!("Ignoring audio end from generation {}", generation);
                Ok(())
            }
        }
    }

    /// The sink failed while playing audio from `generation`
    pub async fn on_audio_error(&self, generation: u64, message: &str) -> Result<(), ReaderError> {
        if !self.is_current(generation) {
            debug!("Ignoring audio error from generation {}: {}", generation, message);
            return Ok(());
        }
        let err = ReaderError::Playback(crate::errors::PlaybackError::MediaError(message.to_string()));
        self.fail(&err).await;
        Err(err)
    }

    /// Change the playback speed of current and future chunks
    pub async fn set_speed(&self, speed: f32) {
        let speed = {
            let mut settings = self.inner.settings.write();
            settings.apply(SettingsUpdate {
                speed: Some(speed),
                ..SettingsUpdate::default()
            });
            settings.speed
        };
        if let Err(e) = self.inner.audio.set_speed(speed).await {
            warn!("Failed to change playback speed: {}", e);
        }
    }

    /// Merge pushed settings and forward the speed to the sink
    pub async fn apply_settings(&self, update: SettingsUpdate) {
        let speed = {
            let mut settings = self.inner.settings.write();
            settings.apply(update);
            settings.speed
        };
        debug!("Settings updated");
        if let Err(e) = self.inner.audio.set_speed(speed).await {
            warn!("Failed to change playback speed: {}", e);
        }
    }

    /// One-off synthesis outside the reading flow (voice previews)
    pub async fn synthesize_text(&self, text: &str) -> Result<AudioPayload, ReaderError> {
        let voice = self.voice_config()?;
        Ok(self.inner.synthesizer.synthesize(text, &voice).await?)
    }
}
