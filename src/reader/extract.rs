/*!
 * Readable text extraction.
 *
 * Reads the text content of a subtree while skipping non-content elements
 * (scripts, navigation, forms, embedded frames and the like) and
 * normalizes whitespace. The live document is never modified.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::dom::{Document, NodeData, NodeId};

/// Elements whose content is never read aloud
pub const EXCLUDED_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "form", "button", "input",
    "textarea", "select", "noscript", "iframe", "frame", "frameset", "object", "embed",
];

static WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+").expect("Invalid whitespace regex")
});

/// Whether `node` is an element with an excluded tag
pub fn is_excluded(doc: &Document, node: NodeId) -> bool {
    doc.tag(node).is_some_and(|tag| EXCLUDED_TAGS.contains(&tag))
}

/// Collapse every whitespace run to a single space and trim
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_REGEX.replace_all(text, " ").trim().to_string()
}

/// Extract speakable plain text from the subtree rooted at `element`.
///
/// Excluded descendants are skipped; the root itself is always read.
/// An absent element yields an empty string.
pub fn extract_readable_text(doc: &Document, element: Option<NodeId>) -> String {
    let Some(root) = element else {
        return String::new();
    };

    let mut raw = String::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        match doc.data(node) {
            Some(NodeData::Text(text)) => raw.push_str(text),
            Some(NodeData::Element(_)) | Some(NodeData::Document) => {
                if node != root && is_excluded(doc, node) {
                    continue;
                }
                stack.extend(doc.children(node).iter().rev().copied());
            }
            Some(NodeData::Comment(_)) | None => {}
        }
    }

    normalize_whitespace(&raw)
}

/// Length in characters of the readable text under `element`
pub fn readable_length(doc: &Document, element: NodeId) -> usize {
    extract_readable_text(doc, Some(element)).chars().count()
}
