/*!
 * Integration tests for reading sessions: selection, hierarchy navigation,
 * keyboard and wheel input, and click-to-seek.
 */

use guacamayo::errors::ReaderError;
use guacamayo::providers::mock::AudioCall;
use guacamayo::reader::{NavigationKey, PlaybackState, SELECTED_CLASS};

use crate::common::{settle, Harness, SENTENCES};

fn has_marker(harness: &Harness, id: &str) -> bool {
    harness
        .session
        .document()
        .read()
        .has_class(harness.element(id), SELECTED_CLASS)
}

#[tokio::test]
async fn test_hierarchy_should_run_innermost_to_outermost() {
    let harness = Harness::story();
    let p0 = harness.element("p0");

    harness.session.select_from_trigger(p0).await.unwrap();

    let hierarchy = harness.session.selection().unwrap();
    let expected = vec![p0, harness.element("story"), harness.element("main")];
    assert_eq!(hierarchy.containers(), expected.as_slice());
    assert_eq!(hierarchy.index(), 0);
}

#[tokio::test]
async fn test_navigation_should_stop_at_hierarchy_bounds() {
    let harness = Harness::story();
    harness.session.select_from_trigger(harness.element("p0")).await.unwrap();

    assert_eq!(harness.session.navigate_hierarchy(-1), None);
    assert_eq!(harness.session.navigate_hierarchy(1), Some(harness.element("story")));
    assert_eq!(harness.session.navigate_hierarchy(1), Some(harness.element("main")));
    assert_eq!(harness.session.navigate_hierarchy(1), None);

    assert!(has_marker(&harness, "main"));
    assert!(!has_marker(&harness, "story"));
    assert!(!has_marker(&harness, "p0"));
}

#[tokio::test]
async fn test_short_trigger_should_select_readable_ancestor() {
    let harness = Harness::story();

    // The span's own text is long enough, so it is the innermost level
    let selected = harness.session.select_from_trigger(harness.element("tail")).await.unwrap();
    assert_eq!(selected, harness.element("tail"));
    assert_eq!(harness.session.selection().unwrap().len(), 4);
}

#[tokio::test]
async fn test_trigger_outside_readable_content_should_fail() {
    let harness = Harness::story();
    let nav = harness.session.document().read().elements_by_tag("nav")[0];

    let result = harness.session.select_from_trigger(nav).await;

    assert_eq!(result, Err(ReaderError::NoReadableContent));
    assert!(harness.session.selection().is_none());
}

#[tokio::test]
async fn test_keys_without_selection_should_pass_through() {
    let harness = Harness::story();

    for key in [NavigationKey::Space, NavigationKey::Escape, NavigationKey::ArrowUp] {
        assert!(!harness.session.handle_key(key).await.unwrap());
    }
    assert_eq!(harness.sink.play_count(), 0);
}

#[tokio::test]
async fn test_arrow_keys_should_skip_while_playing() {
    let harness = Harness::story();
    harness.start_story().await;
    settle().await;

    assert!(harness.session.handle_key(NavigationKey::ArrowRight).await.unwrap());
    assert_eq!(harness.session.engine().current_index(), 1);
    assert!(harness.session.handle_key(NavigationKey::ArrowLeft).await.unwrap());
    assert_eq!(harness.session.engine().current_index(), 0);

    harness.session.handle_key(NavigationKey::Space).await.unwrap();
    assert_eq!(harness.session.engine().state(), PlaybackState::Paused);
    assert!(!harness.session.handle_key(NavigationKey::ArrowRight).await.unwrap());
}

#[tokio::test]
async fn test_escape_should_stop_and_clear_selection() {
    let harness = Harness::story();
    harness.start_story().await;

    assert!(harness.session.handle_key(NavigationKey::Escape).await.unwrap());

    assert_eq!(harness.session.engine().state(), PlaybackState::Idle);
    assert!(harness.session.selection().is_none());
    assert!(!has_marker(&harness, "story"));
    assert!(harness.sink.calls().contains(&AudioCall::Stop));
}

#[tokio::test]
async fn test_new_selection_should_stop_current_playback() {
    let harness = Harness::story();
    harness.start_story().await;

    harness.session.select_from_trigger(harness.element("p1")).await.unwrap();

    assert_eq!(harness.session.engine().state(), PlaybackState::Idle);
    assert!(has_marker(&harness, "p1"));
    assert!(!has_marker(&harness, "story"));
}

#[tokio::test]
async fn test_wheel_should_be_ignored_while_playing() {
    let harness = Harness::story();
    harness.session.select_from_trigger(harness.element("p1")).await.unwrap();

    assert!(harness.session.handle_wheel(-120.0, harness.element("p1")));
    assert_eq!(harness.session.selected_container(), Some(harness.element("story")));

    harness.session.start().await.unwrap();
    assert!(!harness.session.handle_wheel(120.0, harness.element("p1")));
    assert_eq!(harness.session.selected_container(), Some(harness.element("story")));
}

#[tokio::test]
async fn test_click_on_later_chunk_should_jump_once() {
    let harness = Harness::story();
    harness.start_story().await;
    settle().await;

    let jumped = harness.session.handle_click(harness.element("p1")).await.unwrap();

    assert_eq!(jumped, Some(2));
    let stops = harness.sink.calls().iter().filter(|c| **c == AudioCall::Stop).count();
    assert_eq!(stops, 1);
    assert_eq!(
        harness.sink.played_texts(),
        vec![SENTENCES[0].to_string(), SENTENCES[2].to_string()]
    );
}

#[tokio::test]
async fn test_end_of_chunk_queued_before_click_should_not_skip_jump_target() {
    let harness = Harness::story();
    harness.start_story().await;
    settle().await;
    let queued = harness.sink.ended_event();

    harness.session.handle_click(harness.element("p1")).await.unwrap();
    harness.session.dispatch(queued.into()).await.unwrap();

    assert_eq!(harness.session.engine().current_index(), 2);
    assert_eq!(harness.session.engine().state(), PlaybackState::Playing);
    assert_eq!(
        harness.sink.played_texts(),
        vec![SENTENCES[0].to_string(), SENTENCES[2].to_string()]
    );

    // The end of the jumped-to chunk still advances
    harness.session.dispatch(harness.sink.ended_event().into()).await.unwrap();
    assert_eq!(harness.session.engine().current_index(), 3);
}

#[tokio::test]
async fn test_click_on_current_chunk_should_not_jump() {
    let harness = Harness::story();
    harness.start_story().await;

    // The first paragraph holds chunks 0 and 1; the prefix of chunk 0 wins
    let jumped = harness.session.handle_click(harness.element("p0")).await.unwrap();

    assert_eq!(jumped, None);
    assert_eq!(harness.sink.play_count(), 1);
}

#[tokio::test]
async fn test_click_while_idle_should_do_nothing() {
    let harness = Harness::story();
    harness.session.select_from_trigger(harness.element("story")).await.unwrap();

    let jumped = harness.session.handle_click(harness.element("p2")).await.unwrap();

    assert_eq!(jumped, None);
    assert_eq!(harness.sink.play_count(), 0);
}

#[tokio::test]
async fn test_playing_chunk_should_be_highlighted() {
    let harness = Harness::story();
    harness.start_story().await;

    let overlay = harness.session.engine().highlighter().overlay();
    assert!(!overlay.is_empty());
    assert!(overlay.iter().all(|rect| rect.width > 0.0 && rect.height > 0.0));
}
