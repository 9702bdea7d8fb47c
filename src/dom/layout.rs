/*!
 * Rendering capability used for highlighting and auto-scroll.
 *
 * The reading core only needs three things from a renderer: the screen
 * rectangles covering a piece of a text node, the current viewport, and a
 * way to scroll. `MonospaceLayout` answers those for a fixed character
 * grid, which keeps highlight tests and simulations deterministic.
 */

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Debug;

use super::{Document, NodeId};

/// Character span `[start, end)` inside a single text node's raw content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub node: NodeId,
    pub start: usize,
    pub end: usize,
}

/// Rectangle in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub width: f64,
    pub height: f64,
}

/// Renderer capability
pub trait LayoutProvider: Send + Sync + Debug {
    /// Viewport-relative rectangles covering `range`, one per line box
    fn client_rects(&self, doc: &Document, range: &TextRange) -> Vec<Rect>;

    fn viewport(&self) -> Viewport;

    /// Smooth-scroll so that document coordinate `top` is at the viewport top
    fn scroll_to(&self, top: f64);
}

const NON_RENDERED_TAGS: &[&str] = &["head", "script", "style", "noscript", "template", "title"];

/// Fixed-grid layout: every character occupies one cell, text flows
/// continuously in document order and wraps every `columns` cells.
#[derive(Debug)]
pub struct MonospaceLayout {
    columns: usize,
    char_width: f64,
    line_height: f64,
    /// Grid offset of each rendered text node's first character
    offsets: HashMap<NodeId, usize>,
    viewport: Mutex<Viewport>,
}

impl MonospaceLayout {
    pub fn new(doc: &Document, columns: usize, viewport_height: f64) -> Self {
        let columns = columns.max(1);
        let char_width = 8.0;
        let line_height = 20.0;

        let mut offsets = HashMap::new();
        let mut cursor = 0;
        for node in doc.descendants(doc.root()) {
            let Some(text) = doc.text(node) else { continue };
            let hidden = doc
                .ancestors(node)
                .any(|a| doc.tag(a).is_some_and(|t| NON_RENDERED_TAGS.contains(&t)));
            if hidden {
                continue;
            }
            offsets.insert(node, cursor);
            cursor += text.chars().count();
        }

        Self {
            columns,
            char_width,
            line_height,
            offsets,
            viewport: Mutex::new(Viewport {
                scroll_x: 0.0,
                scroll_y: 0.0,
                width: columns as f64 * char_width,
                height: viewport_height,
            }),
        }
    }

    pub fn line_height(&self) -> f64 {
        self.line_height
    }
}

impl LayoutProvider for MonospaceLayout {
    fn client_rects(&self, _doc: &Document, range: &TextRange) -> Vec<Rect> {
        let Some(&base) = self.offsets.get(&range.node) else {
            return Vec::new();
        };
        let viewport = *self.viewport.lock();

        let mut rects = Vec::new();
        let mut cell = base + range.start;
        let end = base + range.end;
        while cell < end {
            let line = cell / self.columns;
            let line_end = ((line + 1) * self.columns).min(end);
            rects.push(Rect {
                top: line as f64 * self.line_height - viewport.scroll_y,
                left: (cell % self.columns) as f64 * self.char_width - viewport.scroll_x,
                width: (line_end - cell) as f64 * self.char_width,
                height: self.line_height,
            });
            cell = line_end;
        }
        rects
    }

    fn viewport(&self) -> Viewport {
        *self.viewport.lock()
    }

    fn scroll_to(&self, top: f64) {
        self.viewport.lock().scroll_y = top.max(0.0);
    }
}
