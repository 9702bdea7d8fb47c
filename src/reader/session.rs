/*!
 * A reading session.
 *
 * Owns the selection (container hierarchy plus its marker class), the
 * playback engine and the OCR flow for one document, and turns user input
 * (selection triggers, keys, wheel, clicks) and host commands into engine
 * operations.
 */

use log::{debug, info};
use parking_lot::{Mutex, RwLock};
use std::str::FromStr;
use std::sync::Arc;

use super::engine::{ContentSource, PlaybackEngine, PlaybackSnapshot, PlaybackState};
use super::ocr::{OcrFlow, OcrText};
use super::seek::{clicked_text, find_chunk_for_click};
use super::selector::{normalize_trigger, ContainerHierarchy, ContainerSelector};
use super::{SharedDocument, SELECTED_CLASS};
use crate::app_config::{Config, SettingsUpdate};
use crate::dom::{Document, LayoutProvider, NodeId};
use crate::errors::ReaderError;
use crate::providers::{
    AudioEvent, AudioPayload, AudioSink, ImageSource, ImageTextExtractor, Notifier, SpeechSynthesizer,
};
use tokio::sync::watch;

/// External collaborators a session talks to
#[derive(Debug, Clone)]
pub struct Collaborators {
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub audio: Arc<dyn AudioSink>,
    pub notifier: Arc<dyn Notifier>,
    pub layout: Arc<dyn LayoutProvider>,
    pub image_source: Arc<dyn ImageSource>,
    pub extractor: Arc<dyn ImageTextExtractor>,
}

/// Commands a host can send to the session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Start reading the current selection
    Play,
    Pause,
    Resume,
    /// Pause, resume or start depending on the current state
    Toggle,
    Stop,
    SetSpeed(f32),
    /// Synthesize arbitrary text outside the reading flow
    Synthesize(String),
    /// The sink finished the audio it was given under this generation
    AudioEnded(u64),
    AudioError { generation: u64, message: String },
    SkipForward,
    SkipBack,
    SettingsUpdated(SettingsUpdate),
}

impl From<AudioEvent> for SessionCommand {
    fn from(event: AudioEvent) -> Self {
        match event {
            AudioEvent::Ended { generation } => SessionCommand::AudioEnded(generation),
            AudioEvent::Error { generation, message } => SessionCommand::AudioError { generation, message },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandReply {
    Done,
    Audio(AudioPayload),
}

/// Keys the session reacts to while a selection is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKey {
    Escape,
    Space,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
}

impl FromStr for NavigationKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "escape" | "esc" => Ok(Self::Escape),
            "space" | "" => Ok(Self::Space),
            "arrowleft" | "left" => Ok(Self::ArrowLeft),
            "arrowright" | "right" => Ok(Self::ArrowRight),
            "arrowup" | "up" => Ok(Self::ArrowUp),
            "arrowdown" | "down" => Ok(Self::ArrowDown),
            _ => Err(format!("Unknown key: {}", s)),
        }
    }
}

/// One reading session over one document
#[derive(Debug)]
pub struct ReaderSession {
    doc: SharedDocument,
    engine: PlaybackEngine,
    selector: ContainerSelector,
    selection: Mutex<Option<ContainerHierarchy>>,
    ocr: OcrFlow,
}

impl ReaderSession {
    pub fn new(document: Document, config: Config, collaborators: Collaborators) -> Self {
        let doc: SharedDocument = Arc::new(RwLock::new(document));
        let selector = ContainerSelector::new(&config.reading);
        let ocr = OcrFlow::new(collaborators.image_source, collaborators.extractor, &config);
        let engine = PlaybackEngine::new(
            Arc::clone(&doc),
            config,
            collaborators.synthesizer,
            collaborators.audio,
            collaborators.notifier,
            collaborators.layout,
        );
        Self {
            doc,
            engine,
            selector,
            selection: Mutex::new(None),
            ocr,
        }
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    pub fn document(&self) -> &SharedDocument {
        &self.doc
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.engine.subscribe()
    }

    /// The active hierarchy, if a container is selected
    pub fn selection(&self) -> Option<ContainerHierarchy> {
        self.selection.lock().clone()
    }

    pub fn selected_container(&self) -> Option<NodeId> {
        self.selection.lock().as_ref().and_then(ContainerHierarchy::current)
    }

    /// Select the innermost readable container around a trigger element
    pub async fn select_from_trigger(&self, target: NodeId) -> Result<NodeId, ReaderError> {
        let hierarchy = {
            let doc = self.doc.read();
            let start = normalize_trigger(&doc, target);
            self.selector.build_hierarchy(&doc, start)
        };
        let Some(container) = hierarchy.current() else {
            let err = ReaderError::NoReadableContent;
            self.engine.surface(&err);
            return Err(err);
        };

        self.clear_selection().await;
        self.doc.write().add_class(container, SELECTED_CLASS);
        info!("Selected container ({} levels available)", hierarchy.len());
        *self.selection.lock() = Some(hierarchy);
        Ok(container)
    }

    /// Drop the selection, stopping playback if any
    pub async fn clear_selection(&self) {
        let previous = self.selection.lock().take();
        if let Some(container) = previous.as_ref().and_then(ContainerHierarchy::current) {
            self.doc.write().remove_class(container, SELECTED_CLASS);
        }
        if self.engine.is_active() {
            self.engine.stop().await;
        }
    }

    /// Widen (positive) or narrow (negative) the selection while idle
    pub fn navigate_hierarchy(&self, direction: isize) -> Option<NodeId> {
        if self.engine.is_active() {
            return None;
        }

        let mut selection = self.selection.lock();
        let hierarchy = selection.as_mut()?;
        let previous = hierarchy.current();
        let next = hierarchy.navigate(direction)?;

        let mut doc = self.doc.write();
        if let Some(previous) = previous {
            doc.remove_class(previous, SELECTED_CLASS);
        }
        doc.add_class(next, SELECTED_CLASS);
        debug!("Selection moved to level {} of {}", hierarchy.index() + 1, hierarchy.len());
        Some(next)
    }

    /// Start reading the selected container
    pub async fn start(&self) -> Result<(), ReaderError> {
        self.engine.start(self.selected_container()).await
    }

    /// Pause when playing, resume when paused, start when idle
    pub async fn toggle(&self) -> Result<(), ReaderError> {
        match self.engine.state() {
            PlaybackState::Playing => self.engine.pause().await,
            PlaybackState::Paused => self.engine.resume().await,
            PlaybackState::Idle => self.start().await,
            PlaybackState::Loading => Ok(()),
        }
    }

    /// Handle a key press; returns whether the key was consumed
    pub async fn handle_key(&self, key: NavigationKey) -> Result<bool, ReaderError> {
        let has_selection = self.selection.lock().is_some();
        let reading_image = self.engine.is_active() && self.engine.source() == Some(ContentSource::Ocr);
        if !has_selection && !reading_image {
            return Ok(false);
        }

        let state = self.engine.state();
        match key {
            NavigationKey::Escape => {
                self.clear_selection().await;
                Ok(true)
            }
            NavigationKey::Space => {
                self.toggle().await?;
                Ok(true)
            }
            NavigationKey::ArrowLeft if state == PlaybackState::Playing => {
                self.engine.skip_back().await?;
                Ok(true)
            }
            NavigationKey::ArrowRight if state == PlaybackState::Playing => {
                self.engine.skip_forward().await?;
                Ok(true)
            }
            NavigationKey::ArrowUp if state == PlaybackState::Idle => {
                self.navigate_hierarchy(1);
                Ok(true)
            }
            NavigationKey::ArrowDown if state == PlaybackState::Idle => {
                self.navigate_hierarchy(-1);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Handle a wheel event over `target`; returns whether it was consumed.
    ///
    /// Scrolling up widens the selection, scrolling down narrows it.
    pub fn handle_wheel(&self, delta_y: f64, target: NodeId) -> bool {
        if self.engine.is_active() {
            return false;
        }
        let Some(container) = self.selected_container() else {
            return false;
        };
        if !self.doc.read().contains(container, target) {
            return false;
        }

        if delta_y < 0.0 {
            self.navigate_hierarchy(1);
        } else if delta_y > 0.0 {
            self.navigate_hierarchy(-1);
        }
        true
    }

    /// Seek to the chunk under a click; returns the chunk jumped to
    pub async fn handle_click(&self, target: NodeId) -> Result<Option<usize>, ReaderError> {
        if !self.engine.click_seek_enabled() {
            return Ok(None);
        }

        let min_length = self.engine.settings().reading.min_click_text_length;
        let text = {
            let doc = self.doc.read();
            clicked_text(&doc, target, min_length)
        };
        let Some(text) = text else {
            return Ok(None);
        };

        let chunks = self.engine.chunks();
        let Some(index) = find_chunk_for_click(chunks.as_slice(), &text) else {
            debug!("Click did not match any chunk");
            return Ok(None);
        };
        if index == self.engine.current_index() {
            return Ok(None);
        }

        self.engine.jump_to_chunk(index).await?;
        Ok(Some(index))
    }

    /// Fetch an image and extract its text for preview
    pub async fn read_image(&self, url: &str) -> Result<OcrText, ReaderError> {
        let config = self.engine.settings().ocr_config();
        match self.ocr.extract_from_url(url, &config).await {
            Ok(text) => Ok(text),
            Err(e) => {
                let err = ReaderError::Extraction(e);
                self.engine.surface(&err);
                Err(err)
            }
        }
    }

    /// Read text extracted from an image, replacing any selection
    pub async fn play_extracted_text(&self, text: &str) -> Result<(), ReaderError> {
        if let Err(e) = self.engine.voice_config() {
            let err = ReaderError::Synthesis(e);
            self.engine.surface(&err);
            return Err(err);
        }
        self.clear_selection().await;
        self.engine.start_text(text).await
    }

    /// Apply one host command
    pub async fn dispatch(&self, command: SessionCommand) -> Result<CommandReply, ReaderError> {
        debug!("Dispatching {:?}", command);
        match command {
            SessionCommand::Play => self.start().await?,
            SessionCommand::Pause => self.engine.pause().await?,
            SessionCommand::Resume => self.engine.resume().await?,
            SessionCommand::Toggle => self.toggle().await?,
            SessionCommand::Stop => self.engine.stop().await,
            SessionCommand::SetSpeed(speed) => self.engine.set_speed(speed).await,
            SessionCommand::Synthesize(text) => {
                return Ok(CommandReply::Audio(self.engine.synthesize_text(&text).await?));
            }
            SessionCommand::AudioEnded(generation) => self.engine.on_audio_ended(generation).await?,
            SessionCommand::AudioError { generation, message } => {
                self.engine.on_audio_error(generation, &message).await?
            }
            SessionCommand::SkipForward => self.engine.skip_forward().await?,
            SessionCommand::SkipBack => self.engine.skip_back().await?,
            SessionCommand::SettingsUpdated(update) => self.engine.apply_settings(update).await,
        }
        Ok(CommandReply::Done)
    }
}
