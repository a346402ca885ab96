// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! End-to-end sessions through the host entry points of `BatchRenderer`.
#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;
use std::rc::Rc;

use shapebatch_core::{
    adapter_collection_name, BatchConfig, BatchRenderer, DrawEvent, DrawOutcome, EventKind, Gate,
    PassState, SelectEvent, SelectOutcome,
};
use shapebatch_mock::{MockBackend, MockShape};
use shapebatch_port::{
    AdapterId, CameraMatrices, Collection, FixedCapabilities, FrameStamp, Hit, RenderParamsKey,
    ShapeAdapter, ViewportContext, ViewportRect,
};

const V2: ViewportContext = ViewportContext::Viewport2;
const LEGACY: ViewportContext = ViewportContext::Legacy;

fn renderer() -> BatchRenderer<MockBackend> {
    BatchRenderer::new(
        BatchConfig::default(),
        MockBackend::new(),
        FixedCapabilities::default(),
    )
    .unwrap()
}

fn draw(stamp: u64) -> DrawEvent {
    DrawEvent {
        stamp: Some(FrameStamp(stamp)),
        pass_id: None,
        camera: CameraMatrices::default(),
        viewport: ViewportRect::sized(800, 600),
    }
}

/// Viewport 2.0 draw followed by the host's end-of-pass notification.
fn refresh(r: &mut BatchRenderer<MockBackend>, stamp: u64) {
    r.on_draw(V2, &draw(stamp)).unwrap();
    r.on_end_of_pass(V2).unwrap();
}

fn select(stamp: u64) -> SelectEvent {
    SelectEvent {
        stamp: Some(FrameStamp(stamp)),
        camera: CameraMatrices::default(),
        viewport: ViewportRect::sized(800, 600),
        single_selection: false,
    }
}

fn shape(id: u64, context: ViewportContext, key: RenderParamsKey) -> Rc<MockShape> {
    MockShape::new(AdapterId(id), context, key, format!("/World/obj{id}")).shared()
}

/// Collection names per submitted work item, as sets.
fn submitted_sets(backend: &MockBackend) -> Vec<BTreeSet<String>> {
    let mut sets: Vec<BTreeSet<String>> = backend
        .submissions
        .last()
        .unwrap()
        .items
        .iter()
        .map(|item| item.collections.iter().map(|c| c.name.clone()).collect())
        .collect();
    sets.sort();
    sets
}

fn names(ids: &[u64]) -> BTreeSet<String> {
    ids.iter()
        .map(|id| adapter_collection_name(V2, AdapterId(*id)))
        .collect()
}

#[test]
fn two_keys_render_as_two_items_then_shrink_on_remove() {
    let k1 = RenderParamsKey::lit();
    let k2 = RenderParamsKey::lit().with_refine_level(2);
    let mut r = renderer();
    let a = shape(1, V2, k1.clone());
    let b = shape(2, V2, k1.clone());
    let c = shape(3, V2, k2);
    for s in [&a, &b, &c] {
        r.register_adapter(s.clone()).unwrap();
    }

    assert_eq!(
        r.on_draw(V2, &draw(1)).unwrap(),
        DrawOutcome::Rendered { items: 2 }
    );
    assert_eq!(r.backend().submissions.len(), 1);
    assert_eq!(submitted_sets(r.backend()), vec![names(&[1, 2]), names(&[3])]);

    assert!(r.unregister_adapter(&*b).unwrap());
    let bucket = r.registry().context(V2).bucket(&k1).unwrap();
    assert_eq!(bucket.len(), 1);
    assert!(bucket.contains(AdapterId(1)));

    r.on_draw(V2, &draw(2)).unwrap();
    assert_eq!(submitted_sets(r.backend()), vec![names(&[1]), names(&[3])]);
}

#[test]
fn reset_returns_to_initial_construction() {
    let mut r = renderer();
    r.register_adapter(shape(1, V2, RenderParamsKey::lit())).unwrap();
    r.register_adapter(shape(2, LEGACY, RenderParamsKey::lit())).unwrap();
    r.backend_mut().add_hit(Hit::new(AdapterId(1), "/World/obj1", 0.2));
    refresh(&mut r, 7);
    r.on_select(V2, &select(7)).unwrap();
    assert!(!r.selection().is_empty());

    r.reset();

    assert!(r.registry().is_empty());
    assert!(r.selection().is_empty());
    assert!(r.collections().is_empty());
    for context in ViewportContext::ALL {
        assert_eq!(r.state(context), PassState::Idle);
    }
    assert_eq!(
        r.gate().gate(EventKind::Render, V2),
        Gate::Stamp { last: None }
    );
    assert_eq!(
        r.gate().gate(EventKind::Render, LEGACY),
        Gate::Flag { armed: true }
    );
    // The same stamp draws again after reset.
    assert_eq!(
        r.on_draw(V2, &draw(7)).unwrap(),
        DrawOutcome::Rendered { items: 0 }
    );
}

#[test]
fn consecutive_selections_replace_cached_hits() {
    let mut r = renderer();
    r.register_adapter(shape(1, V2, RenderParamsKey::lit())).unwrap();
    r.register_adapter(shape(2, V2, RenderParamsKey::lit())).unwrap();
    r.backend_mut().add_hit(Hit::new(AdapterId(1), "/World/obj1", 0.3));
    refresh(&mut r, 1);
    r.on_select(V2, &select(1)).unwrap();
    assert!(r.resolve(AdapterId(1)).is_some());

    r.backend_mut().clear_hits();
    r.backend_mut().add_hit(Hit::new(AdapterId(2), "/World/obj2", 0.6));
    assert!(matches!(
        r.on_select(V2, &select(2)).unwrap(),
        SelectOutcome::Computed(_)
    ));
    assert!(r.resolve(AdapterId(1)).is_none());
    assert_eq!(r.selected_hits().len(), 1);
    assert_eq!(r.nearest_hit(AdapterId(2)).map(|h| h.depth), Some(0.6));
}

#[test]
fn selection_in_one_context_invalidates_the_other() {
    let mut r = renderer();
    r.register_adapter(shape(1, V2, RenderParamsKey::lit())).unwrap();
    r.register_adapter(shape(2, LEGACY, RenderParamsKey::lit())).unwrap();
    r.backend_mut().add_hit(Hit::new(AdapterId(1), "/World/obj1", 0.3));
    r.backend_mut().add_hit(Hit::new(AdapterId(2), "/World/obj2", 0.4));

    // Legacy passes end with the draw itself.
    r.on_draw(LEGACY, &draw(1)).unwrap();
    r.on_select(LEGACY, &select(1)).unwrap();
    assert_eq!(r.state(LEGACY), PassState::SelectionComputed);
    assert!(r.resolve(AdapterId(2)).is_some());

    refresh(&mut r, 1);
    r.on_select(V2, &select(1)).unwrap();
    assert!(r.resolve(AdapterId(2)).is_none());
    assert!(r.resolve(AdapterId(1)).is_some());
    assert_eq!(r.state(LEGACY), PassState::SelectionPending);

    // The legacy context recomputes instead of trusting the replaced cache.
    assert!(matches!(
        r.on_select(LEGACY, &select(1)).unwrap(),
        SelectOutcome::Computed(_)
    ));
    assert!(r.resolve(AdapterId(2)).is_some());
}

#[test]
fn registration_in_wrong_context_is_rejected_without_mutation() {
    let mut r = renderer();
    r.register_adapter(shape(1, V2, RenderParamsKey::lit())).unwrap();
    assert!(r
        .register_adapter(shape(1, LEGACY, RenderParamsKey::lit()))
        .is_err());
    assert_eq!(r.registry().adapter_count(), 1);
    assert!(r
        .register_adapter(shape(0, V2, RenderParamsKey::lit()))
        .is_err());
    assert_eq!(r.registry().adapter_count(), 1);
}

#[test]
fn repeated_callbacks_within_a_frame_do_no_extra_work() {
    let mut r = renderer();
    r.register_adapter(shape(1, V2, RenderParamsKey::lit())).unwrap();
    r.register_adapter(shape(2, LEGACY, RenderParamsKey::lit())).unwrap();
    r.backend_mut().add_hit(Hit::new(AdapterId(1), "/World/obj1", 0.3));
    for _ in 0..4 {
        r.on_draw(V2, &draw(5)).unwrap();
    }
    r.on_end_of_pass(V2).unwrap();
    for _ in 0..4 {
        r.on_select(V2, &select(5)).unwrap();
    }
    assert_eq!(r.backend().submissions.len(), 1);
    assert_eq!(r.backend().queries.len(), 1);
    assert_eq!(r.backend().saves, 1);

    // Legacy draws carry no stamp; one render request yields one submission.
    r.on_render_requested(LEGACY);
    for _ in 0..4 {
        r.on_draw(LEGACY, &draw(5)).unwrap();
    }
    for _ in 0..4 {
        r.on_select(LEGACY, &select(5)).unwrap();
    }
    assert_eq!(r.backend().submissions.len(), 2);
    assert_eq!(r.backend().queries.len(), 2);
}

#[test]
fn legacy_select_needs_no_end_of_pass() {
    let mut r = renderer();
    r.register_adapter(shape(2, LEGACY, RenderParamsKey::lit())).unwrap();
    r.backend_mut().add_hit(Hit::new(AdapterId(2), "/World/obj2", 0.4));
    r.on_draw(LEGACY, &draw(1)).unwrap();
    assert!(matches!(
        r.on_select(LEGACY, &select(1)).unwrap(),
        SelectOutcome::Computed(_)
    ));
    assert_eq!(r.nearest_hit(AdapterId(2)).map(|h| h.depth), Some(0.4));
}

#[test]
fn custom_collection_follows_its_adapter() {
    let mut r = renderer();
    let a = shape(1, V2, RenderParamsKey::lit());
    r.register_adapter(a.clone()).unwrap();
    r.backend_mut().add_hit(Hit::new(AdapterId(1), "/World/obj1/mesh", 0.25));
    let mut custom = Collection::new("highlight", vec![], vec![]);
    assert!(r.populate_custom_collection(AdapterId(1), &mut custom));

    r.draw_custom_collection(
        V2,
        &custom,
        RenderParamsKey::lit().with_wireframe_color([255, 200, 0, 255]),
        &CameraMatrices::default(),
        ViewportRect::sized(800, 600),
    )
    .unwrap();
    let item = &r.backend().submissions[0].items[0];
    assert_eq!(item.params.tag.as_deref(), Some("highlight"));
    assert_eq!(item.collections[0].root_paths, a.root_paths());

    let hit = r
        .test_intersection_custom_collection(&custom, &CameraMatrices::default())
        .unwrap();
    assert_eq!(hit.map(|h| h.depth), Some(0.25));
}
