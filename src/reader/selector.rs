/*!
 * Readable container selection.
 *
 * Starting from the element a user pointed at, walks up the ancestor chain
 * (stopping below `<body>`) looking for elements that hold enough text.
 */

use log::debug;

use super::extract::readable_length;
use crate::app_config::ReadingConfig;
use crate::dom::{Document, NodeId};

/// Tags treated as interactive when resolving a selection trigger
const INTERACTIVE_TAGS: &[&str] = &["button", "input", "textarea", "select", "a"];

/// Fallback containers for an interactive trigger
const TRIGGER_FALLBACK_TAGS: &[&str] = &["article", "section", "main", "div", "p"];

/// Ordered readable ancestors, innermost first, with a cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHierarchy {
    containers: Vec<NodeId>,
    index: usize,
}

impl ContainerHierarchy {
    pub fn new(containers: Vec<NodeId>) -> Self {
        Self { containers, index: 0 }
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn containers(&self) -> &[NodeId] {
        &self.containers
    }

    /// The currently selected container
    pub fn current(&self) -> Option<NodeId> {
        self.containers.get(self.index).copied()
    }

    /// Whether there is more than one scope to move between
    pub fn can_navigate(&self) -> bool {
        self.containers.len() > 1
    }

    /// Move the cursor by `direction` (positive widens, negative narrows).
    ///
    /// Returns the new container, or `None` when the move would leave
    /// `[0, len)`; the cursor is unchanged in that case.
    pub fn navigate(&mut self, direction: isize) -> Option<NodeId> {
        let target = self.index.checked_add_signed(direction)?;
        if target >= self.containers.len() {
            return None;
        }
        self.index = target;
        self.current()
    }

    /// Move to the next enclosing container
    pub fn widen(&mut self) -> Option<NodeId> {
        self.navigate(1)
    }

    /// Move to the next inner container
    pub fn narrow(&mut self) -> Option<NodeId> {
        self.navigate(-1)
    }
}

/// Finds readable containers around a starting element
#[derive(Debug, Clone, Copy)]
pub struct ContainerSelector {
    container_threshold: usize,
    hierarchy_threshold: usize,
}

impl Default for ContainerSelector {
    fn default() -> Self {
        Self::new(&ReadingConfig::default())
    }
}

impl ContainerSelector {
    pub fn new(config: &ReadingConfig) -> Self {
        Self {
            container_threshold: config.container_threshold,
            hierarchy_threshold: config.hierarchy_threshold,
        }
    }

    /// First element from `start` upward whose text is longer than the container threshold
    pub fn find_readable_container(&self, doc: &Document, start: NodeId) -> Option<NodeId> {
        candidates(doc, start)
            .find(|&n| readable_length(doc, n) > self.container_threshold)
    }

    /// Every element from `start` upward whose text is longer than the hierarchy threshold
    pub fn build_hierarchy(&self, doc: &Document, start: NodeId) -> ContainerHierarchy {
        let containers: Vec<NodeId> = candidates(doc, start)
            .filter(|&n| readable_length(doc, n) > self.hierarchy_threshold)
            .collect();
        debug!("Built container hierarchy with {} levels", containers.len());
        ContainerHierarchy::new(containers)
    }
}

/// Elements from `start` upward, stopping below `<body>` and the root
fn candidates(doc: &Document, start: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    let body = doc.body();
    doc.self_and_ancestors(start)
        .take_while(move |&n| Some(n) != body && n != doc.root())
        .filter(move |&n| doc.is_element(n))
}

/// Replace an interactive trigger element with its closest readable block.
///
/// Right-clicking a link or button should read the surrounding content,
/// not the control itself.
pub fn normalize_trigger(doc: &Document, target: NodeId) -> NodeId {
    let interactive = doc.tag(target).is_some_and(|t| INTERACTIVE_TAGS.contains(&t))
        || doc.closest_tag(target, &["button", "input", "textarea", "select"]).is_some();
    if !interactive {
        return target;
    }
    doc.closest_tag(target, TRIGGER_FALLBACK_TAGS).unwrap_or(target)
}
