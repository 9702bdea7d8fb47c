/*!
 * Integration tests for the playback engine: start, prefetch, cancellation
 * and completion, driven through a reading session with mock collaborators.
 */

use std::sync::Arc;

use guacamayo::errors::{ReaderError, Severity, SynthesisError};
use guacamayo::providers::mock::{AudioCall, MockSynthesizer, RecordingAudioSink};
use guacamayo::reader::{PlaybackState, SessionCommand};

use crate::common::{settle, story_page, test_config, Harness, SENTENCES};

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_start_should_synthesize_only_first_chunk_before_playing() {
    let harness = Harness::story();

    harness.start_story().await;

    assert_eq!(harness.synth.requests(), texts(&SENTENCES[..1]));
    assert_eq!(harness.sink.played_texts(), texts(&SENTENCES[..1]));
    assert_eq!(harness.session.engine().state(), PlaybackState::Playing);
    assert_eq!(harness.session.engine().chunks().len(), 4);

    settle().await;
    assert_eq!(harness.synth.requests(), texts(&SENTENCES[..3]));
}

#[tokio::test]
async fn test_audio_end_should_play_next_chunk_from_cache() {
    let harness = Harness::story();
    harness.start_story().await;
    settle().await;

    harness.session.dispatch(harness.sink.ended_event().into()).await.unwrap();
    settle().await;

    assert_eq!(harness.session.engine().current_index(), 1);
    assert_eq!(harness.sink.played_texts(), texts(&SENTENCES[..2]));
    // Chunk 1 came from the cache; the prefetch window moved on to chunk 3
    assert_eq!(harness.synth.requests(), texts(&SENTENCES));
    assert!(harness.session.engine().cache().contains(2));
    assert!(harness.session.engine().cache().contains(3));
}

#[tokio::test]
async fn test_reading_every_chunk_should_return_to_idle() {
    let harness = Harness::story();
    harness.start_story().await;

    for _ in 0..SENTENCES.len() {
        settle().await;
        harness.session.dispatch(harness.sink.ended_event().into()).await.unwrap();
    }

    let engine = harness.session.engine();
    assert_eq!(engine.state(), PlaybackState::Idle);
    assert_eq!(harness.sink.played_texts(), texts(&SENTENCES));
    assert_eq!(harness.synth.request_count(), SENTENCES.len());
    assert!(engine.cache().is_empty());
    assert!(engine.highlighter().overlay().is_empty());
    assert_eq!(engine.snapshot().progress_label(), None);
}

#[tokio::test]
async fn test_short_container_should_not_start() {
    let html = "<body><main><p id='short'>Parrots can live for more than 60 years.</p></main></body>";
    let harness = Harness::new(html, test_config(), MockSynthesizer::working(), RecordingAudioSink::new());
    let short = harness.element("short");

    let result = harness.session.engine().start(Some(short)).await;

    assert_eq!(
        result,
        Err(ReaderError::InsufficientText {
            length: 40,
            minimum: 50
        })
    );
    assert_eq!(harness.session.engine().state(), PlaybackState::Idle);
    assert_eq!(harness.synth.request_count(), 0);
    assert_eq!(harness.notifier.notices()[0].severity, Severity::Warning);
}

#[tokio::test]
async fn test_play_without_selection_should_fail() {
    let harness = Harness::story();

    let result = harness.session.dispatch(SessionCommand::Play).await;

    assert_eq!(result, Err(ReaderError::NoSelection));
    assert_eq!(harness.sink.play_count(), 0);
}

#[tokio::test]
async fn test_stop_during_synthesis_should_never_play() {
    let (synth, gate) = MockSynthesizer::working().gated();
    let harness = Arc::new(Harness::new(&story_page(), test_config(), synth, RecordingAudioSink::new()));
    harness
        .session
        .select_from_trigger(harness.element("story"))
        .await
        .unwrap();

    let starter = Arc::clone(&harness);
    let task = tokio::spawn(async move { starter.session.start().await });
    settle().await;
    assert_eq!(harness.session.engine().state(), PlaybackState::Loading);
    assert_eq!(harness.synth.request_count(), 1);

    harness.session.dispatch(SessionCommand::Stop).await.unwrap();
    gate.release(10);

    assert!(task.await.unwrap().is_ok());
    settle().await;
    assert_eq!(harness.sink.play_count(), 0);
    assert_eq!(harness.session.engine().state(), PlaybackState::Idle);
    assert!(harness.session.engine().cache().is_empty());
}

#[tokio::test]
async fn test_prefetch_finishing_after_stop_should_be_discarded() {
    let (synth, gate) = MockSynthesizer::working().gated();
    let harness = Harness::new(&story_page(), test_config(), synth, RecordingAudioSink::new());

    gate.release(1);
    harness.start_story().await;
    settle().await;
    assert_eq!(harness.synth.request_count(), 2);

    harness.session.engine().stop().await;
    gate.release(10);
    settle().await;

    assert!(harness.session.engine().cache().is_empty());
    assert_eq!(harness.sink.play_count(), 1);
}

#[tokio::test]
async fn test_prefetch_finishing_after_jump_should_be_discarded() {
    let (synth, gate) = MockSynthesizer::working().gated();
    let harness = Arc::new(Harness::new(&story_page(), test_config(), synth, RecordingAudioSink::new()));

    gate.release(1);
    harness.start_story().await;
    settle().await;
    // Chunk 1 is being prefetched and waits on the gate
    assert_eq!(harness.synth.requests(), texts(&SENTENCES[..2]));
    let abandoned = harness.session.engine().generation();

    let jumper = Arc::clone(&harness);
    let task = tokio::spawn(async move { jumper.session.engine().jump_to_chunk(3).await });
    settle().await;
    assert_ne!(harness.session.engine().generation(), abandoned);
    assert_eq!(harness.synth.request_count(), 3);

    // The first permit answers the old prefetch of chunk 1
    gate.release(1);
    settle().await;
    assert!(harness.session.engine().cache().is_empty());

    gate.release(10);
    assert!(task.await.unwrap().is_ok());
    settle().await;

    let engine = harness.session.engine();
    assert_eq!(engine.current_index(), 3);
    assert_eq!(engine.state(), PlaybackState::Playing);
    assert!(!engine.cache().contains(1));
    assert!(engine.cache().is_empty());
    assert_eq!(harness.sink.played_texts(), texts(&[SENTENCES[0], SENTENCES[3]]));
}

#[tokio::test]
async fn test_skip_forward_should_jump_once() {
    let harness = Harness::story();
    harness.start_story().await;
    settle().await;

    harness.session.dispatch(SessionCommand::SkipForward).await.unwrap();

    let stops = harness.sink.calls().iter().filter(|c| **c == AudioCall::Stop).count();
    assert_eq!(stops, 1);
    assert_eq!(harness.sink.played_texts(), texts(&SENTENCES[..2]));
    assert_eq!(harness.session.engine().current_index(), 1);

    harness.session.dispatch(SessionCommand::SkipBack).await.unwrap();
    assert_eq!(harness.session.engine().current_index(), 0);
}

#[tokio::test]
async fn test_skip_back_on_first_chunk_should_do_nothing() {
    let harness = Harness::story();
    harness.start_story().await;

    harness.session.dispatch(SessionCommand::SkipBack).await.unwrap();

    assert_eq!(harness.sink.play_count(), 1);
    assert!(!harness.sink.calls().contains(&AudioCall::Stop));
}

#[tokio::test]
async fn test_synthesis_failure_should_surface_and_stop() {
    let synth = MockSynthesizer::failing(SynthesisError::Unauthorized("bad key".to_string()));
    let harness = Harness::new(&story_page(), test_config(), synth, RecordingAudioSink::new());
    harness
        .session
        .select_from_trigger(harness.element("story"))
        .await
        .unwrap();

    let result = harness.session.start().await;

    assert!(matches!(result, Err(ReaderError::Synthesis(SynthesisError::Unauthorized(_)))));
    assert_eq!(harness.session.engine().state(), PlaybackState::Idle);
    let notices = harness.notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].severity, Severity::Error);
    assert!(notices[0].message.contains("Invalid API key"));
}

#[tokio::test]
async fn test_prefetch_failure_should_stay_quiet() {
    let synth = MockSynthesizer::fail_after(1, SynthesisError::RateLimited("slow down".to_string()));
    let harness = Harness::new(&story_page(), test_config(), synth, RecordingAudioSink::new());

    harness.start_story().await;
    settle().await;

    // The failed prefetch stops the window early and nothing is shown
    assert_eq!(harness.synth.request_count(), 2);
    assert!(harness.notifier.notices().is_empty());
    assert_eq!(harness.session.engine().state(), PlaybackState::Playing);
}

#[tokio::test]
async fn test_progress_should_be_published_to_subscribers() {
    let harness = Harness::story();
    let progress = harness.session.subscribe();

    harness.start_story().await;
    harness.session.dispatch(SessionCommand::Pause).await.unwrap();

    let snapshot = progress.borrow().clone();
    assert_eq!(snapshot.state, PlaybackState::Paused);
    assert_eq!(snapshot.total_chunks, 4);
    assert_eq!(snapshot.progress_label().as_deref(), Some("1/4"));
}

#[tokio::test]
async fn test_speed_change_should_apply_clamped_value() {
    let harness = Harness::story();
    harness.start_story().await;
    settle().await;

    harness.session.dispatch(SessionCommand::SetSpeed(9.0)).await.unwrap();
    harness.session.dispatch(harness.sink.ended_event().into()).await.unwrap();

    let calls = harness.sink.calls();
    assert!(calls.contains(&AudioCall::SetSpeed(4.0)));
    assert!(matches!(calls.last(), Some(AudioCall::Play { speed, .. }) if *speed == 4.0));
}

#[tokio::test]
async fn test_rejected_play_should_notify_and_reset() {
    let harness = Harness::new(&story_page(), test_config(), MockSynthesizer::working(), RecordingAudioSink::rejecting());
    harness
        .session
        .select_from_trigger(harness.element("story"))
        .await
        .unwrap();

    let result = harness.session.start().await;

    assert!(matches!(result, Err(ReaderError::Playback(_))));
    assert_eq!(harness.session.engine().state(), PlaybackState::Idle);
    assert_eq!(
        harness.notifier.messages(),
        vec!["Audio playback could not start. Please try again.".to_string()]
    );
}

#[tokio::test]
async fn test_audio_end_while_paused_should_be_ignored() {
    let harness = Harness::story();
    harness.start_story().await;
    harness.session.dispatch(SessionCommand::Pause).await.unwrap();

    harness.session.dispatch(harness.sink.ended_event().into()).await.unwrap();

    assert_eq!(harness.session.engine().current_index(), 0);
    assert_eq!(harness.sink.play_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_auto_ending_sink_should_drive_whole_session() {
    let (events_tx, mut events) = tokio::sync::mpsc::unbounded_channel();
    let sink = RecordingAudioSink::auto_ending(std::time::Duration::from_millis(500), events_tx);
    let harness = Harness::new(&story_page(), test_config(), MockSynthesizer::working(), sink);

    harness.start_story().await;
    while harness.session.engine().state() != PlaybackState::Idle {
        let event = events.recv().await.unwrap();
        harness.session.dispatch(event.into()).await.unwrap();
    }

    assert_eq!(harness.sink.played_texts(), texts(&SENTENCES));
}
