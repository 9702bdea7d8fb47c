use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::providers::{OcrConfig, VoiceConfig};

/// Application configuration module
/// This module handles the settings snapshot the reading core consumes:
/// provider keys, voice, speed, OCR model and the reading tunables.
/// The core never writes settings; updates arrive as `SettingsUpdate`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Text-to-speech provider settings
    #[serde(default)]
    pub tts: TtsConfig,

    /// Playback speed multiplier
    #[serde(default = "default_speed")]
    pub speed: f32,

    /// OCR provider settings
    #[serde(default)]
    pub ocr: OcrSettings,

    /// Chunking, thresholds and prefetch tuning
    #[serde(default)]
    pub reading: ReadingConfig,

    /// Synthesis request limits
    #[serde(default)]
    pub limits: RequestLimits,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// TTS provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    // @provider: Deepgram Aura (voice is the model)
    #[default]
    Deepgram,
    // @provider: Kokoro hosted on DeepInfra
    Kokoro,
    // @provider: OpenAI-compatible speech endpoint
    #[serde(rename = "openai")]
    OpenAiCompatible,
}

impl TtsProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Deepgram => "Deepgram",
            Self::Kokoro => "Kokoro",
            Self::OpenAiCompatible => "OpenAI-compatible",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Deepgram => "deepgram".to_string(),
            Self::Kokoro => "kokoro".to_string(),
            Self::OpenAiCompatible => "openai".to_string(),
        }
    }

    // @returns: Base URL used when none is configured
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Deepgram => "https://api.deepgram.com",
            Self::Kokoro => "https://api.deepinfra.com",
            Self::OpenAiCompatible => "http://localhost:9002",
        }
    }

    // @returns: Model used when none is configured (empty: voice is the model)
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Deepgram => "",
            Self::Kokoro => "hexgrad/Kokoro-82M",
            Self::OpenAiCompatible => "mlx-community/Kokoro-82M-bf16",
        }
    }
}

impl std::fmt::Display for TtsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TtsProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "deepgram" => Ok(Self::Deepgram),
            "kokoro" => Ok(Self::Kokoro),
            "openai" => Ok(Self::OpenAiCompatible),
            _ => Err(anyhow!("Invalid TTS provider: {}", s)),
        }
    }
}

/// Text-to-speech settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TtsConfig {
    #[serde(default)]
    pub provider: TtsProvider,

    /// Service URL; empty means the provider default
    #[serde(default = "String::new")]
    pub base_url: String,

    #[serde(default = "String::new")]
    pub api_key: String,

    /// Model name; empty means the provider default
    #[serde(default = "String::new")]
    pub model: String,

    #[serde(default = "default_voice")]
    pub voice: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider: TtsProvider::default(),
            base_url: String::new(),
            api_key: String::new(),
            model: String::new(),
            voice: default_voice(),
        }
    }
}

/// OCR settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OcrSettings {
    #[serde(default = "default_ocr_base_url")]
    pub base_url: String,

    #[serde(default = "String::new")]
    pub api_key: String,

    #[serde(default = "default_ocr_model")]
    pub model: String,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            base_url: default_ocr_base_url(),
            api_key: String::new(),
            model: default_ocr_model(),
        }
    }
}

/// Reading tunables
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReadingConfig {
    /// Maximum characters per speech chunk
    #[serde(default = "default_max_chunk_length")]
    pub max_chunk_length: usize,

    /// Minimum extracted text length required to start reading
    #[serde(default = "default_min_text_length")]
    pub min_text_length: usize,

    /// Text length above which an ancestor counts as a readable container
    #[serde(default = "default_container_threshold")]
    pub container_threshold: usize,

    /// Text length above which an ancestor joins the hierarchy
    #[serde(default = "default_hierarchy_threshold")]
    pub hierarchy_threshold: usize,

    /// Number of chunks synthesized ahead of the playing one
    #[serde(default = "default_prefetch_count")]
    pub prefetch_count: usize,

    /// Clicked text shorter than this is ignored by click-to-seek
    #[serde(default = "default_min_click_text_length")]
    pub min_click_text_length: usize,

    /// OCR results shorter than this count as "no text"
    #[serde(default = "default_min_ocr_text_length")]
    pub min_ocr_text_length: usize,

    /// How long notifications stay on screen
    #[serde(default = "default_notification_ms")]
    pub notification_ms: u64,
}

impl Default for ReadingConfig {
    fn default() -> Self {
        Self {
            max_chunk_length: default_max_chunk_length(),
            min_text_length: default_min_text_length(),
            container_threshold: default_container_threshold(),
            hierarchy_threshold: default_hierarchy_threshold(),
            prefetch_count: default_prefetch_count(),
            min_click_text_length: default_min_click_text_length(),
            min_ocr_text_length: default_min_ocr_text_length(),
            notification_ms: default_notification_ms(),
        }
    }
}

/// Limits applied to synthesis and OCR requests
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RequestLimits {
    /// Minimum spacing between consecutive synthesis requests
    #[serde(default = "default_request_cooldown_ms")]
    pub request_cooldown_ms: u64,

    /// Pending synthesis requests allowed before failing fast
    #[serde(default = "default_max_pending_requests")]
    pub max_pending_requests: usize,

    #[serde(default = "default_synthesis_timeout_secs")]
    pub synthesis_timeout_secs: u64,

    #[serde(default = "default_ocr_timeout_secs")]
    pub ocr_timeout_secs: u64,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            request_cooldown_ms: default_request_cooldown_ms(),
            max_pending_requests: default_max_pending_requests(),
            synthesis_timeout_secs: default_synthesis_timeout_secs(),
            ocr_timeout_secs: default_ocr_timeout_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Partial settings pushed by the options page or popup.
///
/// Absent fields leave the current snapshot untouched.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    #[serde(default)]
    pub tts_provider: Option<TtsProvider>,
    #[serde(default)]
    pub tts_base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub tts_model: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub speed: Option<f32>,
    #[serde(default)]
    pub ocr_base_url: Option<String>,
    #[serde(default)]
    pub ocr_api_key: Option<String>,
    #[serde(default)]
    pub ocr_model: Option<String>,
}

const MIN_SPEED: f32 = 0.25;
const MAX_SPEED: f32 = 4.0;

fn default_speed() -> f32 {
    1.0
}

fn default_voice() -> String {
    "aura-2-thalia-en".to_string()
}

fn default_ocr_base_url() -> String {
    "https://api.deepinfra.com/v1/openai".to_string()
}

fn default_ocr_model() -> String {
    "deepseek-ai/DeepSeek-OCR".to_string()
}

fn default_max_chunk_length() -> usize {
    1000
}

fn default_min_text_length() -> usize {
    50
}

fn default_container_threshold() -> usize {
    100
}

fn default_hierarchy_threshold() -> usize {
    50
}

fn default_prefetch_count() -> usize {
    2
}

fn default_min_click_text_length() -> usize {
    10
}

fn default_min_ocr_text_length() -> usize {
    10
}

fn default_notification_ms() -> u64 {
    5000
}

fn default_request_cooldown_ms() -> u64 {
    200
}

fn default_max_pending_requests() -> usize {
    3
}

fn default_synthesis_timeout_secs() -> u64 {
    30
}

fn default_ocr_timeout_secs() -> u64 {
    60
}

impl Config {
    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Load a configuration file, writing the defaults first if it is missing
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }

        let config = Config::default();
        config.save(path)?;
        info!("Created default configuration at {}", path.display());
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if !(MIN_SPEED..=MAX_SPEED).contains(&self.speed) {
            return Err(anyhow!(
                "Playback speed must be between {} and {}, got {}",
                MIN_SPEED,
                MAX_SPEED,
                self.speed
            ));
        }

        if self.reading.max_chunk_length == 0 {
            return Err(anyhow!("max_chunk_length must be greater than zero"));
        }

        if self.reading.hierarchy_threshold > self.reading.container_threshold {
            return Err(anyhow!(
                "hierarchy_threshold ({}) must not exceed container_threshold ({})",
                self.reading.hierarchy_threshold,
                self.reading.container_threshold
            ));
        }

        if self.limits.max_pending_requests == 0 {
            return Err(anyhow!("max_pending_requests must be greater than zero"));
        }

        Ok(())
    }

    /// Merge a pushed settings update into this snapshot
    pub fn apply(&mut self, update: SettingsUpdate) {
        if let Some(provider) = update.tts_provider {
            self.tts.provider = provider;
        }
        if let Some(base_url) = update.tts_base_url {
            self.tts.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(api_key) = update.api_key {
            self.tts.api_key = api_key.trim().to_string();
        }
        if let Some(model) = update.tts_model {
            self.tts.model = model;
        }
        if let Some(voice) = update.voice {
            self.tts.voice = voice;
        }
        match update.speed {
            Some(speed) if speed.is_finite() => self.speed = speed.clamp(MIN_SPEED, MAX_SPEED),
            Some(speed) => warn!("Ignoring invalid playback speed {}", speed),
            None => {}
        }
        if let Some(base_url) = update.ocr_base_url {
            self.ocr.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(api_key) = update.ocr_api_key {
            self.ocr.api_key = api_key.trim().to_string();
        }
        if let Some(model) = update.ocr_model {
            self.ocr.model = model;
        }
    }

    /// Voice settings handed to the synthesis collaborator
    pub fn voice_config(&self) -> VoiceConfig {
        let base_url = if self.tts.base_url.is_empty() {
            self.tts.provider.default_base_url().to_string()
        } else {
            self.tts.base_url.clone()
        };
        let model = if self.tts.model.is_empty() {
            self.tts.provider.default_model().to_string()
        } else {
            self.tts.model.clone()
        };

        VoiceConfig {
            provider: self.tts.provider,
            base_url,
            api_key: self.tts.api_key.clone(),
            model,
            voice: self.tts.voice.clone(),
        }
    }

    /// OCR settings handed to the extraction collaborator
    pub fn ocr_config(&self) -> OcrConfig {
        OcrConfig {
            base_url: self.ocr.base_url.clone(),
            api_key: self.ocr.api_key.clone(),
            model: self.ocr.model.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tts: TtsConfig::default(),
            speed: default_speed(),
            ocr: OcrSettings::default(),
            reading: ReadingConfig::default(),
            limits: RequestLimits::default(),
            log_level: LogLevel::default(),
        }
    }
}
