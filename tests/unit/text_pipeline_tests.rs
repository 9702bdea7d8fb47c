/*!
 * Tests for text extraction and chunking
 */

use guacamayo::dom::Document;
use guacamayo::reader::{chunk_text, extract_readable_text};

use crate::common::{story_page, SENTENCES, TEST_MAX_CHUNK};

#[test]
fn test_story_should_extract_without_page_chrome() {
    let doc = Document::parse_html(&story_page());
    let body = doc.body().unwrap();

    let text = extract_readable_text(&doc, Some(body));

    assert_eq!(text, SENTENCES.join(" "));
}

#[test]
fn test_extraction_should_be_idempotent() {
    let html = "<body><div id='c'><h2>Title</h2>\n<p>Some   text,\twith <em>odd</em>\n spacing.</p>\
                <aside>Related links</aside><p>More text.</p></div></body>";
    let doc = Document::parse_html(html);
    let first = extract_readable_text(&doc, doc.element_by_id("c"));

    let again = Document::parse_html(&format!("<body><div id='c'>{}</div></body>", first));
    let second = extract_readable_text(&again, again.element_by_id("c"));

    assert_eq!(first, second);
    assert!(!first.contains("Related"));
}

#[test]
fn test_extraction_of_missing_element_should_be_empty() {
    let doc = Document::parse_html("<body><p>Text</p></body>");
    assert_eq!(extract_readable_text(&doc, None), "");
}

#[test]
fn test_story_should_chunk_one_sentence_per_chunk() {
    let chunks = chunk_text(&SENTENCES.join(" "), TEST_MAX_CHUNK);
    assert_eq!(chunks, SENTENCES.map(String::from).to_vec());
}

#[test]
fn test_chunks_should_respect_limit_and_keep_every_word() {
    let text = "Parrots talk. ".repeat(30)
        + "A deliberately long sentence without any stops that keeps going well past the limit "
        + "so the word fallback has to split it.";

    for max_length in [20, 45, 80, 200] {
        let chunks = chunk_text(&text, max_length);

        assert!(chunks.iter().all(|c| c.chars().count() <= max_length), "limit {}", max_length);
        let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.split_whitespace()).collect();
        let original: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(rejoined, original);
    }
}

#[test]
fn test_oversized_word_should_become_its_own_chunk() {
    let word = "a".repeat(30);
    let chunks = chunk_text(&format!("Short start. {} end.", word), 10);

    assert!(chunks.contains(&word));
}
