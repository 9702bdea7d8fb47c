/*!
 * Tests for readable container selection
 */

use guacamayo::app_config::ReadingConfig;
use guacamayo::dom::Document;
use guacamayo::reader::selector::normalize_trigger;
use guacamayo::reader::{ContainerHierarchy, ContainerSelector};

use crate::common::story_page;

#[test]
fn test_readable_container_should_need_more_than_threshold() {
    let doc = Document::parse_html(&story_page());
    let selector = ContainerSelector::default();
    let p1 = doc.element_by_id("p1").unwrap();

    // 54 characters: enough for the hierarchy, not for a readable container
    assert_eq!(selector.find_readable_container(&doc, p1), doc.element_by_id("story"));
    assert_eq!(selector.build_hierarchy(&doc, p1).current(), Some(p1));
}

#[test]
fn test_hierarchy_should_never_include_body() {
    let doc = Document::parse_html(&story_page());
    let selector = ContainerSelector::default();
    let story = doc.element_by_id("story").unwrap();

    let hierarchy = selector.build_hierarchy(&doc, story);

    assert_eq!(hierarchy.len(), 2);
    assert!(hierarchy.containers().iter().all(|&n| doc.tag(n) != Some("body")));
}

#[test]
fn test_custom_thresholds_should_change_hierarchy() {
    let doc = Document::parse_html(&story_page());
    let config = ReadingConfig {
        hierarchy_threshold: 150,
        container_threshold: 150,
        ..ReadingConfig::default()
    };
    let selector = ContainerSelector::new(&config);
    let p1 = doc.element_by_id("p1").unwrap();

    let hierarchy = selector.build_hierarchy(&doc, p1);

    assert_eq!(hierarchy.containers()[0], doc.element_by_id("story").unwrap());
}

#[test]
fn test_button_trigger_should_resolve_to_enclosing_section() {
    let doc = Document::parse_html(
        "<body><section id='s'><p>Some text</p><div><button id='b'><span id='icon'>+</span></button></div></section></body>",
    );
    let icon = doc.element_by_id("icon").unwrap();

    let resolved = normalize_trigger(&doc, icon);

    assert_eq!(doc.tag(resolved), Some("div"));
}

#[test]
fn test_plain_trigger_should_be_kept() {
    let doc = Document::parse_html("<body><p id='p'>Text</p></body>");
    let p = doc.element_by_id("p").unwrap();

    assert_eq!(normalize_trigger(&doc, p), p);
}

#[test]
fn test_empty_hierarchy_should_not_navigate() {
    let mut hierarchy = ContainerHierarchy::new(Vec::new());

    assert!(hierarchy.is_empty());
    assert!(!hierarchy.can_navigate());
    assert_eq!(hierarchy.current(), None);
    assert_eq!(hierarchy.widen(), None);
    assert_eq!(hierarchy.narrow(), None);
}
