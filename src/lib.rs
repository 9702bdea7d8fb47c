/*!
 * # Guacamayo - read web pages aloud
 *
 * The reading core of a text-to-speech page reader.
 *
 * ## Features
 *
 * - Pick the readable container around a click and widen or narrow it
 * - Extract clean, speakable text from a subtree
 * - Split text into sentence-aligned chunks for synthesis
 * - Play chunks in order with prefetching, caching and cancellation
 * - Highlight the playing chunk and keep it in view
 * - Click anywhere in the text to seek to that chunk
 * - Read text recovered from images through an OCR service
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `dom`: The document model and layout capability
 * - `reader`: Selection, extraction, chunking, playback and highlighting:
 *   - `reader::engine`: The playback state machine
 *   - `reader::session`: Input handling for one reading session
 *   - `reader::ocr`: Text from images
 * - `providers`: Collaborator traits (speech, audio, OCR, notifications)
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod dom;
pub mod errors;
pub mod providers;
pub mod reader;

// Re-export main types for easier usage
pub use app_config::{Config, SettingsUpdate};
pub use dom::{Document, NodeId};
pub use errors::{ExtractionError, PlaybackError, ReaderError, Severity, SynthesisError};
pub use reader::{PlaybackEngine, PlaybackState, ReaderSession, SessionCommand};
