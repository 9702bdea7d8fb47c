// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use guacamayo::app_config::{Config, LogLevel};
use guacamayo::dom::{Document, MonospaceLayout, NodeId};
use guacamayo::providers::mock::{MockImageSource, MockSynthesizer, MockTextExtractor, RecordingAudioSink};
use guacamayo::providers::{LogNotifier, ThrottledSynthesizer};
use guacamayo::reader::selector::normalize_trigger;
use guacamayo::reader::{
    chunk_text, extract_readable_text, Collaborators, ContainerSelector, PlaybackState, ReaderSession,
};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the container hierarchy, extracted text and chunks for a page
    Inspect {
        /// HTML file to read
        #[arg(value_name = "HTML_FILE")]
        input: PathBuf,

        /// CSS selector of the element to start from (defaults to <body>)
        #[arg(short, long)]
        selector: Option<String>,

        /// Override the maximum chunk length
        #[arg(long)]
        max_chunk: Option<usize>,
    },

    /// Read a page with simulated speech and audio, logging progress
    Simulate {
        /// HTML file to read
        #[arg(value_name = "HTML_FILE")]
        input: PathBuf,

        /// CSS selector of the element to start from (defaults to <body>)
        #[arg(short, long)]
        selector: Option<String>,

        /// Simulated playback duration of each chunk in milliseconds
        #[arg(long, default_value_t = 400)]
        chunk_ms: u64,

        /// Simulated synthesis latency in milliseconds
        #[arg(long, default_value_t = 150)]
        latency_ms: u64,
    },

    /// Generate shell completions for guacamayo
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Guacamayo - read web pages aloud
#[derive(Parser, Debug)]
#[command(name = "guacamayo")]
#[command(version)]
#[command(about = "Text-to-speech page reader core")]
#[command(long_about = "Guacamayo selects the readable part of a page, splits it into speech chunks and plays them.

EXAMPLES:
    guacamayo inspect page.html                          # Show what would be read
    guacamayo inspect page.html -s 'article p'           # Start from a specific element
    guacamayo simulate page.html --chunk-ms 200          # Walk through playback with mock audio
    guacamayo completions bash > guacamayo.bash          # Generate bash completions

CONFIGURATION:
    Configuration is stored in guacamayo.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "guacamayo.json")]
    config: PathBuf,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S%.3f");
            let color = Self::color_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "{}{} {:<5} {}\x1B[0m",
                color,
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Trace lets `set_max_level` raise verbosity after the config is read
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "guacamayo", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = Config::load_or_create(&cli.config)?;
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    log::set_max_level(config.log_level.to_level_filter());
    config.validate()?;

    match cli.command {
        Commands::Inspect {
            input,
            selector,
            max_chunk,
        } => {
            if let Some(max_chunk) = max_chunk {
                config.reading.max_chunk_length = max_chunk;
            }
            run_inspect(&input, selector.as_deref(), &config)
        }
        Commands::Simulate {
            input,
            selector,
            chunk_ms,
            latency_ms,
        } => run_simulate(&input, selector.as_deref(), config, chunk_ms, latency_ms).await,
        Commands::Completions { .. } => Ok(()),
    }
}

/// Characters of container text shown by `inspect`
const PREVIEW_CHARS: usize = 60;

/// Parse the page and resolve the starting element
fn load_page(path: &Path, selector: Option<&str>) -> Result<(Document, NodeId)> {
    let html = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read HTML file: {}", path.display()))?;

    let (doc, target) = match selector {
        Some(css) => Document::parse_html_with_target(&html, css)?,
        None => (Document::parse_html(&html), None),
    };
    let target = match (target, selector) {
        (Some(target), _) => target,
        (None, Some(css)) => return Err(anyhow!("No element matches selector '{}'", css)),
        (None, None) => doc.body().ok_or_else(|| anyhow!("Document has no <body>"))?,
    };
    Ok((doc, target))
}

fn describe(doc: &Document, node: NodeId) -> String {
    let tag = doc.tag(node).unwrap_or("?");
    match doc.attr(node, "id") {
        Some(id) => format!("<{} id=\"{}\">", tag, id),
        None => format!("<{}>", tag),
    }
}

fn run_inspect(path: &Path, selector: Option<&str>, config: &Config) -> Result<()> {
    let (doc, target) = load_page(path, selector)?;
    let start = normalize_trigger(&doc, target);
    let container_selector = ContainerSelector::new(&config.reading);

    if let Some(suggested) = container_selector.find_readable_container(&doc, start) {
        println!("Suggested container: {}", describe(&doc, suggested));
    }

    let hierarchy = container_selector.build_hierarchy(&doc, start);
    if hierarchy.is_empty() {
        warn!("No readable content found around {}", describe(&doc, target));
        return Ok(());
    }

    println!("Container hierarchy (innermost first):");
    for (level, node) in hierarchy.containers().iter().enumerate() {
        let text = extract_readable_text(&doc, Some(*node));
        let preview: String = text.chars().take(PREVIEW_CHARS).collect();
        println!(
            "  {}. {} ({} chars) {:?}",
            level + 1,
            describe(&doc, *node),
            text.chars().count(),
            preview
        );
    }

    let Some(current) = hierarchy.current() else {
        return Ok(());
    };
    let text = extract_readable_text(&doc, Some(current));
    let chunks = chunk_text(&text, config.reading.max_chunk_length);

    println!();
    println!("{} chunks (max {} chars):", chunks.len(), config.reading.max_chunk_length);
    for (index, chunk) in chunks.iter().enumerate() {
        println!("  [{}] {}", index + 1, chunk);
    }
    Ok(())
}

async fn run_simulate(
    path: &Path,
    selector: Option<&str>,
    mut config: Config,
    chunk_ms: u64,
    latency_ms: u64,
) -> Result<()> {
    let (doc, target) = load_page(path, selector)?;

    // The mock provider needs no credentials, but the engine still checks for one
    if config.tts.api_key.trim().is_empty() {
        config.tts.api_key = "simulated".to_string();
    }

    let (events_tx, mut events) = mpsc::unbounded_channel();
    let synthesizer = ThrottledSynthesizer::new(MockSynthesizer::slow(latency_ms), &config.limits);
    let layout = Arc::new(MonospaceLayout::new(&doc, 80, 600.0));
    let collaborators = Collaborators {
        synthesizer: Arc::new(synthesizer),
        audio: Arc::new(RecordingAudioSink::auto_ending(Duration::from_millis(chunk_ms), events_tx)),
        notifier: Arc::new(LogNotifier),
        layout,
        image_source: Arc::new(MockImageSource::png()),
        extractor: Arc::new(MockTextExtractor::returning("")),
    };
    let session = ReaderSession::new(doc, config, collaborators);

    let container = session.select_from_trigger(target).await?;
    info!("Reading {}", describe(&session.document().read(), container));

    let mut progress = session.subscribe();
    let engine = session.engine().clone();
    let watcher = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let snapshot = progress.borrow_and_update().clone();
            match snapshot.progress_label() {
                Some(label) => info!(
                    "{:?} {} ({} highlight boxes)",
                    snapshot.state,
                    label,
                    engine.highlighter().overlay().len()
                ),
                None => debug!("{:?}", snapshot.state),
            }
        }
    });

    session.start().await?;
    while session.engine().state() != PlaybackState::Idle {
        let Some(event) = events.recv().await else {
            break;
        };
        session.dispatch(event.into()).await?;
    }

    let (hits, misses, hit_rate) = session.engine().cache().stats();
    info!(
        "Finished reading. Cache hits: {}, misses: {} ({:.0}% hit rate)",
        hits,
        misses,
        hit_rate * 100.0
    );
    watcher.abort();
    Ok(())
}
