/*!
 * The in-page reading core.
 *
 * Data flows through the submodules in this order:
 * - `selector`: picks the readable container and its ancestor hierarchy
 * - `extract`: turns a subtree into clean, speakable text
 * - `chunker`: splits that text into bounded speech units
 * - `engine`: the playback state machine with prefetch and caching
 * - `highlight`: maps the playing chunk back to on-screen rectangles
 * - `seek`: maps a click on the page to a chunk index
 * - `ocr`: the image pipeline feeding extracted text into the engine
 * - `session`: one reading session, wiring everything to user input
 */

use parking_lot::RwLock;
use std::sync::Arc;

use crate::dom::Document;

pub mod cache;
pub mod chunker;
pub mod engine;
pub mod extract;
pub mod highlight;
pub mod ocr;
pub mod seek;
pub mod selector;
pub mod session;

pub use cache::AudioCache;
pub use chunker::chunk_text;
pub use engine::{ContentSource, PlaybackEngine, PlaybackSnapshot, PlaybackState};
pub use extract::extract_readable_text;
pub use highlight::{HighlightOutcome, Highlighter};
pub use ocr::{OcrFlow, OcrText};
pub use selector::{ContainerHierarchy, ContainerSelector};
pub use session::{Collaborators, CommandReply, NavigationKey, ReaderSession, SessionCommand};

/// The live document, shared between the session and the highlighter
pub type SharedDocument = Arc<RwLock<Document>>;

/// Class installed on the selected container
pub const SELECTED_CLASS: &str = "guacamayo-selected";
