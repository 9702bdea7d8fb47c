/*!
 * Integration tests for reading text recovered from images
 */

use guacamayo::errors::{ExtractionError, ReaderError, Severity, SynthesisError};
use guacamayo::providers::mock::{MockSynthesizer, MockTextExtractor, RecordingAudioSink};
use guacamayo::reader::{ContentSource, NavigationKey, PlaybackState};

use crate::common::{story_page, test_config, Harness, SENTENCES};

const IMAGE_URL: &str = "https://example.com/menu.png";

fn ocr_harness(extractor: MockTextExtractor) -> Harness {
    Harness::with_extractor(
        &story_page(),
        test_config(),
        MockSynthesizer::working(),
        RecordingAudioSink::new(),
        extractor,
    )
}

#[tokio::test]
async fn test_extracted_text_should_play_without_highlighting() {
    let raw = format!("  {}\n{}\n\n{}  {}  ", SENTENCES[0], SENTENCES[1], SENTENCES[2], SENTENCES[3]);
    let harness = ocr_harness(MockTextExtractor::returning(raw));

    let text = harness.session.read_image(IMAGE_URL).await.unwrap();
    assert!(text.preview().starts_with(SENTENCES[0]));

    harness.session.play_extracted_text(text.text()).await.unwrap();

    let engine = harness.session.engine();
    assert_eq!(engine.state(), PlaybackState::Playing);
    assert_eq!(engine.source(), Some(ContentSource::Ocr));
    assert_eq!(engine.chunks().as_slice(), SENTENCES.map(String::from).as_slice());
    assert!(engine.highlighter().overlay().is_empty());
    assert!(!engine.click_seek_enabled());
}

#[tokio::test]
async fn test_extracted_text_should_replace_selection() {
    let harness = ocr_harness(MockTextExtractor::returning(SENTENCES.join(" ")));
    harness.start_story().await;

    harness.session.play_extracted_text(&SENTENCES.join(" ")).await.unwrap();

    assert!(harness.session.selection().is_none());
    assert_eq!(harness.session.engine().source(), Some(ContentSource::Ocr));
    assert_eq!(harness.sink.play_count(), 2);
}

#[tokio::test]
async fn test_escape_should_stop_image_reading() {
    let harness = ocr_harness(MockTextExtractor::returning(SENTENCES.join(" ")));
    harness.session.play_extracted_text(&SENTENCES.join(" ")).await.unwrap();

    assert!(harness.session.handle_key(NavigationKey::Escape).await.unwrap());
    assert_eq!(harness.session.engine().state(), PlaybackState::Idle);
}

#[tokio::test]
async fn test_missing_ocr_key_should_not_call_service() {
    let mut config = test_config();
    config.ocr.api_key.clear();
    let extractor = MockTextExtractor::returning("never used");
    let harness = Harness::with_extractor(
        &story_page(),
        config,
        MockSynthesizer::working(),
        RecordingAudioSink::new(),
        extractor,
    );

    let result = harness.session.read_image(IMAGE_URL).await;

    assert_eq!(result, Err(ReaderError::Extraction(ExtractionError::MissingApiKey)));
    assert_eq!(harness.extractor.call_count(), 0);
    assert_eq!(harness.notifier.notices()[0].severity, Severity::Error);
}

#[tokio::test]
async fn test_blank_image_should_report_no_text() {
    let harness = ocr_harness(MockTextExtractor::returning("   \n  "));

    let result = harness.session.read_image(IMAGE_URL).await;

    assert_eq!(result, Err(ReaderError::Extraction(ExtractionError::NoTextFound)));
    assert_eq!(
        harness.notifier.messages(),
        vec!["No readable text found in image.".to_string()]
    );
}

#[tokio::test]
async fn test_missing_tts_key_should_block_image_playback() {
    let mut config = test_config();
    config.tts.api_key.clear();
    let harness = Harness::new(&story_page(), config, MockSynthesizer::working(), RecordingAudioSink::new());

    let result = harness.session.play_extracted_text(&SENTENCES.join(" ")).await;

    assert_eq!(result, Err(ReaderError::Synthesis(SynthesisError::MissingApiKey)));
    assert_eq!(harness.synth.request_count(), 0);
    assert_eq!(harness.notifier.notices().len(), 1);
}
