//! Mount, unmount, stale results and failed reads.

use std::time::Duration;

use composer_api::{EntityId, RouteId, SgSnapshot};
use pretty_assertions::assert_eq;
use serde_json::json;

use super::{TestComposer, empty_lsa_route, empty_sg_route, mounted, settle};
use crate::animation::IntervalFrames;
use crate::binding::{BindingState, BindingStore, LsaBindings, SgBindings};
use crate::composer::{ComposerError, NoticeLevel};
use crate::config::ComposerConfig;
use crate::fetch::{FetchRequest, FetchResult};
use crate::metadata_cache::CacheLookup;
use crate::test_support::{FakeBackend, RecordingDispatcher};

#[test]
fn test_results_from_previous_mount_are_dropped() {
    let old_route = FakeBackend::new();
    old_route.set_bindings(json!({"sgIds": [1, 2], "confirmed": [1]}));
    let new_route = empty_sg_route();

    let mut composer = TestComposer::<SgBindings>::new(RecordingDispatcher::new());
    composer.mount(ComposerConfig::new(RouteId::from(1)));
    let stale = composer.dispatcher_mut().drain();

    composer.mount(ComposerConfig::new(RouteId::from(2)));
    for (ticket, request) in stale {
        assert!(!composer.apply(FetchResult::run(ticket, request, &old_route)));
    }
    assert!(composer.store().is_empty());

    settle(&mut composer, &new_route);
    assert!(composer.view().bindings_loaded);
    assert!(composer.store().is_empty());
}

#[test]
fn test_results_after_unmount_are_dropped() {
    let backend = FakeBackend::new();
    backend.set_bindings(json!({"sgIds": [4], "confirmed": []}));

    let mut composer = TestComposer::<SgBindings>::new(RecordingDispatcher::new());
    composer.mount(ComposerConfig::new(RouteId::from(1)));
    composer.unmount();

    for result in composer.dispatcher_mut().run_all(&backend) {
        assert!(!composer.apply(result));
    }
    assert!(composer.store().is_empty());
    assert!(!composer.is_mounted());
    assert!(matches!(
        composer.click_entity(&EntityId::from(4)),
        Err(ComposerError::NotMounted)
    ));
}

#[test]
fn test_malformed_bindings_fail_closed() {
    let backend = empty_lsa_route();
    backend.set_bindings(json!({"detail": "Not found."}));
    let composer = mounted::<LsaBindings>(&backend);

    let view = composer.view();
    assert!(view.bindings_loaded);
    assert!(!view.editable);
    assert!(view.rows.is_empty());
    assert!(view.has_errors());
    assert!(crate::cli::render_composer(&view).contains("read only until the bindings load"));
}

#[test]
fn test_malformed_bindings_refuse_edits_until_reloaded() {
    let backend = empty_sg_route();
    backend.set_bindings(json!({"detail": "Not found."}));
    let mut composer = mounted::<SgBindings>(&backend);
    let a = EntityId::from(3);

    assert!(matches!(composer.click_entity(&a), Err(ComposerError::NotLoaded)));
    assert!(matches!(composer.submit(), Err(ComposerError::NotLoaded)));

    backend.set_bindings(json!({"sgIds": [3], "confirmed": []}));
    assert_eq!(composer.retry_failed(), 1);
    settle(&mut composer, &backend);

    assert!(composer.view().editable);
    assert!(!composer.view().has_errors());
    assert_eq!(composer.click_entity(&a).unwrap(), BindingState::Confirmed);
}

#[test]
fn test_edits_refused_before_bindings_arrive() {
    let backend = empty_sg_route();
    backend.set_bindings(json!({"sgIds": [1], "confirmed": []}));
    let mut composer = TestComposer::<SgBindings>::new(RecordingDispatcher::new());
    composer.mount(ComposerConfig::new(RouteId::from(1)));
    let x = EntityId::from(9);

    assert!(!composer.view().editable);
    assert!(matches!(composer.click_entity(&x), Err(ComposerError::NotLoaded)));
    assert!(matches!(composer.toggle_checkbox(&x), Err(ComposerError::NotLoaded)));
    assert!(matches!(composer.remove(&x), Err(ComposerError::NotLoaded)));

    settle(&mut composer, &backend);
    assert_eq!(
        composer.store().snapshot(),
        SgSnapshot {
            sg_ids: vec![EntityId::from(1)],
            confirmed: vec![],
        }
    );

    composer.click_entity(&x).unwrap();
    composer.click_entity(&x).unwrap();
    assert_eq!(composer.store().state(&x), BindingState::Confirmed);
    assert_eq!(composer.store().state(&EntityId::from(1)), BindingState::Selected);
}

#[test]
fn test_failed_read_can_be_retried() {
    let backend = empty_sg_route();
    backend.set_bindings(json!({"sgIds": [8], "confirmed": []}));
    backend.fail_next(1);

    let mut composer = mounted::<SgBindings>(&backend);
    // The bindings request went out first and failed
    assert!(composer.store().is_empty());
    let errors: Vec<_> = composer
        .view()
        .notices_of(NoticeLevel::Error)
        .map(|n| n.key.clone())
        .collect();
    assert_eq!(errors, vec!["bindings of route 1".to_string()]);

    assert_eq!(composer.retry_failed(), 1);
    settle(&mut composer, &backend);

    assert_eq!(composer.store().state(&EntityId::from(8)), BindingState::Selected);
    assert!(!composer.view().has_errors());
    assert_eq!(composer.retry_failed(), 0);
}

#[test]
fn test_failure_notice_hints_retry_only_for_server_errors() {
    let backend = empty_sg_route();
    backend.set_bindings(json!({"sgIds": [], "confirmed": []}));
    backend.fail_next(1);
    let mut composer = mounted::<SgBindings>(&backend);

    let message = |composer: &TestComposer<SgBindings>, key: &str| {
        composer
            .view()
            .notices_of(NoticeLevel::Error)
            .find(|n| n.key == key)
            .map(|n| n.message.clone())
    };
    let unavailable = message(&composer, "bindings of route 1").unwrap();
    assert!(unavailable.ends_with("retry to send it again"));

    // No region is known for this SG, the backend answers 404
    composer.focus_entity(&EntityId::from(77)).unwrap();
    settle(&mut composer, &backend);
    let missing = message(&composer, "region of SG 77").unwrap();
    assert!(missing.contains("HTTP 404"));
    assert!(!missing.contains("retry"));
}

#[test]
fn test_hover_fetches_once_and_then_hits() {
    let backend = empty_sg_route();
    backend.set_metadata(
        EntityId::from(3),
        json!({"pk": 3, "fields": {"lane_type": "KFZ", "signal_group_id": "hamburg/1_2"}}),
    );
    let mut composer = mounted::<SgBindings>(&backend);
    let calls = backend.calls();
    let x = EntityId::from(3);

    assert_eq!(composer.hover(&x), CacheLookup::Pending);
    assert_eq!(composer.hover(&x), CacheLookup::Pending);
    assert_eq!(
        composer
            .dispatcher()
            .count(|r| matches!(r, FetchRequest::Metadata { .. })),
        1
    );
    assert!(composer.view().loading);

    settle(&mut composer, &backend);
    assert_eq!(backend.calls(), calls + 1);

    for _ in 0..3 {
        assert!(matches!(composer.hover(&x), CacheLookup::Fresh(_)));
    }
    assert!(composer.dispatcher().queue.is_empty());
    assert_eq!(backend.calls(), calls + 1);
}

#[test]
fn test_failed_hover_needs_retry() {
    let backend = empty_sg_route();
    let mut composer = mounted::<SgBindings>(&backend);
    let x = EntityId::from(42);

    composer.hover(&x);
    settle(&mut composer, &backend);
    assert!(matches!(composer.hover(&x), CacheLookup::Failed(_)));
    assert!(composer.dispatcher().queue.is_empty());

    backend.set_metadata(x.clone(), json!({"pk": 42}));
    // Nothing is re-sent; the lookup is forgotten so the next hover fetches
    assert_eq!(composer.retry_failed(), 0);
    assert!(composer.dispatcher().queue.is_empty());
    assert_eq!(composer.hover(&x), CacheLookup::Pending);
    settle(&mut composer, &backend);
    assert_eq!(composer.hover(&x), CacheLookup::Fresh(json!({"pk": 42})));
}

#[test]
fn test_remount_clears_state() {
    let backend = empty_sg_route();
    let mut composer = mounted::<SgBindings>(&backend);
    composer.click_entity(&EntityId::from(1)).unwrap();
    composer.resize(800, 600);

    composer.mount(ComposerConfig::new(RouteId::from(2)));
    assert!(composer.store().is_empty());
    assert!(!composer.view().bindings_loaded);
    assert_eq!(composer.view().viewport.width, 800);
    assert_eq!(composer.view().route_id, Some(RouteId::from(2)));
}

#[test]
fn test_unmount_cancels_trip_animation() {
    let backend = empty_sg_route();
    let mut composer = TestComposer::<SgBindings>::new(RecordingDispatcher::new())
        .with_frames(|| IntervalFrames::new(Duration::from_millis(1)));
    assert!(composer.animation_token().is_none());
    assert_eq!(composer.view().trip_progress, None);

    composer.mount(ComposerConfig::new(RouteId::from(1)));
    settle(&mut composer, &backend);
    let token = composer.animation_token().unwrap();
    assert!(!token.is_cancelled());
    assert!(composer.view().trip_progress.is_some());

    composer.unmount();
    assert!(token.is_cancelled());
    assert!(composer.animation_token().is_none());
    assert_eq!(composer.view().trip_progress, None);
}

#[test]
fn test_remount_restarts_trip_animation() {
    let mut composer = TestComposer::<LsaBindings>::new(RecordingDispatcher::new())
        .with_frames(|| IntervalFrames::new(Duration::from_millis(1)));
    composer.mount(ComposerConfig::new(RouteId::from(1)));
    let first = composer.animation_token().unwrap();

    composer.mount(ComposerConfig::new(RouteId::from(2)));
    let second = composer.animation_token().unwrap();
    assert!(first.is_cancelled());
    assert!(!second.is_cancelled());
}
