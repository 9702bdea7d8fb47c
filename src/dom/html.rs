/*!
 * Building documents from HTML markup.
 *
 * Parsing is delegated to `scraper` (html5ever underneath); the parsed tree
 * is copied into the arena so the reading core never depends on the
 * parser's node types.
 */

use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Node, Selector};

use super::{Document, ElementData, NodeId};

impl Document {
    /// Parse a full HTML document
    pub fn parse_html(html: &str) -> Document {
        let parsed = Html::parse_document(html);
        let mut doc = Document::new();
        let root = doc.root();
        let mut found = None;
        copy_element(&mut doc, root, parsed.root_element(), &[], &mut found);
        doc
    }

    /// Parse a document and resolve the first element matching `css`.
    ///
    /// The resolved node plays the role of the element a user right-clicked.
    pub fn parse_html_with_target(html: &str, css: &str) -> Result<(Document, Option<NodeId>)> {
        let selector =
            Selector::parse(css).map_err(|e| anyhow!("Invalid selector '{}': {:?}", css, e))?;
        let parsed = Html::parse_document(html);
        let targets: Vec<ElementRef<'_>> = parsed.select(&selector).take(1).collect();

        let mut doc = Document::new();
        let root = doc.root();
        let mut found = None;
        copy_element(&mut doc, root, parsed.root_element(), &targets, &mut found);
        Ok((doc, found))
    }
}

fn copy_element(
    doc: &mut Document,
    parent: NodeId,
    element: ElementRef<'_>,
    targets: &[ElementRef<'_>],
    found: &mut Option<NodeId>,
) {
    let value = element.value();
    let data = ElementData {
        tag: value.name().to_ascii_lowercase(),
        id: value.id().map(str::to_string),
        classes: value.classes().map(str::to_string).collect(),
        attrs: value
            .attrs()
            .filter(|(name, _)| *name != "id" && *name != "class")
            .map(|(name, val)| (name.to_string(), val.to_string()))
            .collect(),
    };
    let id = doc.append_element_data(parent, data);
    if found.is_none() && targets.contains(&element) {
        *found = Some(id);
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                doc.append_text(id, &text.text);
            }
            Node::Comment(comment) => {
                doc.append_comment(id, &comment.comment);
            }
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    copy_element(doc, id, child_element, targets, found);
                }
            }
            _ => {}
        }
    }
}
