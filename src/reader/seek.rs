/*!
 * Click-to-seek.
 *
 * Maps the text under a click to the chunk that contains it. Containment
 * is tried first; failing that, chunks are scored by how many of the
 * click's leading words they contain.
 */

use super::extract::extract_readable_text;
use crate::dom::{Document, NodeId};

/// Prefix of a chunk that may be contained in the clicked text
pub const CONTAINMENT_PREFIX_CHARS: usize = 50;

/// Leading click words considered for overlap scoring
pub const OVERLAP_WINDOW_WORDS: usize = 10;

/// Click words must be longer than this to count
pub const OVERLAP_MIN_WORD_CHARS: usize = 3;

/// Minimum overlapping words for a scored match
pub const OVERLAP_MIN_SCORE: usize = 2;

/// Elements whose text is used as the click target
const CLICK_TARGET_TAGS: &[&str] = &["p", "span", "div", "article"];

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Index of the chunk best matching `clicked`, if any
pub fn find_chunk_for_click<S: AsRef<str>>(chunks: &[S], clicked: &str) -> Option<usize> {
    let click = normalize(clicked);
    if click.is_empty() {
        return None;
    }

    let normalized: Vec<String> = chunks.iter().map(|c| normalize(c.as_ref())).collect();

    let contained = normalized.iter().position(|chunk| {
        let prefix: String = chunk.chars().take(CONTAINMENT_PREFIX_CHARS).collect();
        chunk.contains(&click) || (!prefix.is_empty() && click.contains(&prefix))
    });
    if contained.is_some() {
        return contained;
    }

    let click_words: Vec<&str> = click
        .split(' ')
        .take(OVERLAP_WINDOW_WORDS)
        .filter(|w| w.chars().count() > OVERLAP_MIN_WORD_CHARS)
        .collect();

    let mut best: Option<(usize, usize)> = None;
    for (index, chunk) in normalized.iter().enumerate() {
        let chunk_words: Vec<&str> = chunk.split(' ').collect();
        let score = click_words.iter().filter(|w| chunk_words.contains(w)).count();
        if score > best.map_or(0, |(_, s)| s) {
            best = Some((index, score));
        }
    }

    best.filter(|&(_, score)| score >= OVERLAP_MIN_SCORE)
        .map(|(index, _)| index)
}

/// The element whose text represents a click on `target`
pub fn resolve_click_target(doc: &Document, target: NodeId) -> Option<NodeId> {
    doc.closest(target, |doc, n| {
        doc.tag(n).is_some_and(|t| CLICK_TARGET_TAGS.contains(&t))
            || doc.attr(n, "data-testid") == Some("tweetText")
    })
}

/// Readable text under a click, or `None` when it is too short to match
pub fn clicked_text(doc: &Document, target: NodeId, min_length: usize) -> Option<String> {
    let element = resolve_click_target(doc, target)?;
    let text = extract_readable_text(doc, Some(element));
    (text.chars().count() >= min_length).then_some(text)
}
