/*!
 * Chunk highlighting.
 *
 * Locates the text of the playing chunk inside the selected container,
 * converts the match into per-node text ranges and asks the layout for the
 * rectangles covering them. The rectangles form the highlight overlay, and
 * the first one is scrolled into the upper third of the viewport.
 *
 * Matching runs on a lowercase, whitespace-collapsed view of the
 * container's text. If the full chunk is not found, the first eight and
 * then the first five words are tried before giving up.
 */

use log::debug;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::SharedDocument;
use super::extract::is_excluded;
use crate::dom::layout::TextRange;
use crate::dom::{Document, LayoutProvider, NodeId, Rect};

/// Word-prefix lengths tried when the full chunk is not found
const FALLBACK_PREFIX_WORDS: &[usize] = &[8, 5];

/// Result of highlighting one chunk
#[derive(Debug, Clone, PartialEq)]
pub enum HighlightOutcome {
    /// Overlay rectangles in document coordinates and the scroll target
    Highlighted { rects: Vec<Rect>, scroll_top: f64 },
    /// The chunk text could not be located; nothing is drawn
    NoMatch,
}

/// Searchable view of a container's text.
///
/// Each character of `text` remembers the text node and raw character
/// offset it came from; collapsed whitespace maps to `None`.
#[derive(Debug, Default)]
struct TextIndex {
    text: String,
    origins: Vec<Option<(NodeId, usize)>>,
}

impl TextIndex {
    fn build(doc: &Document, container: NodeId) -> Self {
        let mut index = TextIndex::default();
        let mut pending_space = false;

        for node in visible_text_nodes(doc, container) {
            let Some(raw) = doc.text(node) else { continue };
            for (offset, ch) in raw.chars().enumerate() {
                if ch.is_whitespace() {
                    pending_space = !index.text.is_empty();
                    continue;
                }
                if pending_space {
                    index.text.push(' ');
                    index.origins.push(None);
                    pending_space = false;
                }
                for lower in fold_case(ch) {
                    index.text.push(lower);
                    index.origins.push(Some((node, offset)));
                }
            }
        }
        index
    }

    /// Character span of the best match for `needle`
    fn find(&self, needle: &str) -> Option<(usize, usize)> {
        let words: Vec<&str> = needle.split(' ').collect();
        let candidates = std::iter::once(needle.to_string()).chain(
            FALLBACK_PREFIX_WORDS
                .iter()
                .map(|&n| words[..n.min(words.len())].join(" ")),
        );

        for candidate in candidates {
            if candidate.is_empty() {
                continue;
            }
            if let Some(byte_start) = self.text.find(&candidate) {
                let start = self.text[..byte_start].chars().count();
                let end = (start + needle.chars().count()).min(self.origins.len());
                return Some((start, end));
            }
        }
        None
    }

    /// Per-node ranges covering the characters in `[start, end)`
    fn ranges(&self, start: usize, end: usize) -> Vec<TextRange> {
        let mut spans: BTreeMap<NodeId, (usize, usize)> = BTreeMap::new();
        for (node, offset) in self.origins[start..end].iter().flatten() {
            spans
                .entry(*node)
                .and_modify(|(lo, hi)| {
                    *lo = (*lo).min(*offset);
                    *hi = (*hi).max(offset + 1);
                })
                .or_insert((*offset, offset + 1));
        }
        spans
            .into_iter()
            .map(|(node, (start, end))| TextRange { node, start, end })
            .collect()
    }
}

/// Text nodes under `container` in document order, skipping excluded subtrees
fn visible_text_nodes(doc: &Document, container: NodeId) -> Vec<NodeId> {
    let mut nodes = Vec::new();
    let mut stack = vec![container];
    while let Some(node) = stack.pop() {
        if doc.text(node).is_some() {
            nodes.push(node);
        } else if node == container || !is_excluded(doc, node) {
            stack.extend(doc.children(node).iter().rev().copied());
        }
    }
    nodes
}

/// Per-character lowercasing shared by the index and the needle.
///
/// `str::to_lowercase` is context sensitive (a word-final 'Σ' becomes 'ς'),
/// which the per-node index cannot reproduce.
fn fold_case(ch: char) -> std::char::ToLowercase {
    ch.to_lowercase()
}

fn normalize_for_match(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .flat_map(fold_case)
        .collect()
}

/// Locate `chunk` inside `container`, returning the text ranges it covers.
///
/// Returns `None` when no match is found.
pub fn find_chunk_ranges(doc: &Document, container: NodeId, chunk: &str) -> Option<Vec<TextRange>> {
    let needle = normalize_for_match(chunk);
    if needle.is_empty() {
        return None;
    }
    let index = TextIndex::build(doc, container);
    let (start, end) = index.find(&needle)?;
    let ranges = index.ranges(start, end);
    (!ranges.is_empty()).then_some(ranges)
}

/// Draws the overlay for the playing chunk
#[derive(Debug, Clone)]
pub struct Highlighter {
    doc: SharedDocument,
    layout: Arc<dyn LayoutProvider>,
    overlay: Arc<Mutex<Vec<Rect>>>,
}

impl Highlighter {
    pub fn new(doc: SharedDocument, layout: Arc<dyn LayoutProvider>) -> Self {
        Self {
            doc,
            layout,
            overlay: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Replace the overlay with the rectangles for `chunk` and scroll to it
    pub fn highlight(&self, chunk: &str, container: NodeId) -> HighlightOutcome {
        self.clear();

        let doc = self.doc.read();
        let Some(ranges) = find_chunk_ranges(&doc, container, chunk) else {
            debug!("No highlight match for chunk starting {:?}", preview(chunk));
            return HighlightOutcome::NoMatch;
        };

        let viewport = self.layout.viewport();
        let rects: Vec<Rect> = ranges
            .iter()
            .flat_map(|range| self.layout.client_rects(&doc, range))
            .filter(Rect::has_area)
            .map(|rect| Rect {
                top: rect.top + viewport.scroll_y,
                left: rect.left + viewport.scroll_x,
                ..rect
            })
            .collect();
        drop(doc);

        let Some(first) = rects.first() else {
            return HighlightOutcome::NoMatch;
        };
        let scroll_top = (first.top - viewport.height / 3.0).max(0.0);
        self.layout.scroll_to(scroll_top);

        *self.overlay.lock() = rects.clone();
        HighlightOutcome::Highlighted { rects, scroll_top }
    }

    /// Remove every highlight box
    pub fn clear(&self) {
        self.overlay.lock().clear();
    }

    /// Current overlay rectangles in document coordinates
    pub fn overlay(&self) -> Vec<Rect> {
        self.overlay.lock().clone()
    }
}

fn preview(text: &str) -> String {
    text.chars().take(30).collect()
}
