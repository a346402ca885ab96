// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Headless shape adapters and render backend for testing.
//!
//! [`MockBackend`] draws nothing. It records what the engine hands it and
//! answers intersection queries from a scripted list of scene hits, so the
//! engine's bucketing, gating and caching can be verified without a GPU.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use shapebatch_port::{
    AdapterId, BackendError, Collection, Hit, HitSet, IntersectMode, IntersectParams, PrimPath,
    RenderBackend, RenderParamsKey, RenderSubmission, RenderTag, ShapeAdapter, ViewportContext,
};

/// Mock shape adapter.
///
/// Render params, roots and visibility sit behind interior mutability so a
/// test can change them while the adapter is registered.
#[derive(Debug)]
pub struct MockShape {
    id: AdapterId,
    context: ViewportContext,
    params: RefCell<RenderParamsKey>,
    roots: RefCell<Vec<PrimPath>>,
    tags: RefCell<Vec<RenderTag>>,
    visible: Cell<bool>,
}

impl MockShape {
    /// Create a visible adapter with a single root path.
    pub fn new(
        id: AdapterId,
        context: ViewportContext,
        params: RenderParamsKey,
        root: impl Into<PrimPath>,
    ) -> Self {
        Self {
            id,
            context,
            params: RefCell::new(params),
            roots: RefCell::new(vec![root.into()]),
            tags: RefCell::new(vec![RenderTag::geometry()]),
            visible: Cell::new(true),
        }
    }

    /// Wrap in an `Rc` for registration.
    pub fn shared(self) -> Rc<Self> {
        Rc::new(self)
    }

    /// Change the render params the adapter reports.
    pub fn set_params(&self, params: RenderParamsKey) {
        *self.params.borrow_mut() = params;
    }

    /// Change the root paths the adapter reports.
    pub fn set_roots(&self, roots: Vec<PrimPath>) {
        *self.roots.borrow_mut() = roots;
    }

    /// Change the render tags the adapter reports.
    pub fn set_tags(&self, tags: Vec<RenderTag>) {
        *self.tags.borrow_mut() = tags;
    }

    /// Show or hide the adapter.
    pub fn set_visible(&self, visible: bool) {
        self.visible.set(visible);
    }
}

impl ShapeAdapter for MockShape {
    fn id(&self) -> AdapterId {
        self.id
    }

    fn viewport_context(&self) -> ViewportContext {
        self.context
    }

    fn render_params(&self) -> RenderParamsKey {
        self.params.borrow().clone()
    }

    fn root_paths(&self) -> Vec<PrimPath> {
        self.roots.borrow().clone()
    }

    fn render_tags(&self) -> Vec<RenderTag> {
        self.tags.borrow().clone()
    }

    fn is_visible(&self) -> bool {
        self.visible.get()
    }
}

/// Mock render backend.
///
/// Every call is recorded in a public field for inspection. Queries only
/// see scripted hits under the collection's roots, and nothing at all when
/// the collection shares no render tag with the query.
#[derive(Debug, Default)]
pub struct MockBackend {
    /// Submitted passes, in order.
    pub submissions: Vec<RenderSubmission>,
    /// Intersection queries, in order.
    pub queries: Vec<(IntersectParams, Collection)>,
    /// Dirty marks as `(collection name, version)`.
    pub dirtied: Vec<(String, u64)>,
    /// Number of `save_state` calls.
    pub saves: u32,
    /// Number of `restore_state` calls.
    pub restores: u32,
    /// Make every `submit` fail.
    pub fail_submit: bool,
    scene: Vec<Hit>,
    failing_roots: HashSet<PrimPath>,
}

impl MockBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hit to the scripted scene.
    pub fn add_hit(&mut self, hit: Hit) {
        self.scene.push(hit);
    }

    /// Remove every scripted hit.
    pub fn clear_hits(&mut self) {
        self.scene.clear();
    }

    /// Make queries over any collection rooted at `root` fail.
    pub fn fail_root(&mut self, root: PrimPath) {
        self.failing_roots.insert(root);
    }

    /// Items submitted by the most recent pass.
    pub fn last_item_count(&self) -> Option<usize> {
        self.submissions.last().map(|s| s.items.len())
    }
}

impl RenderBackend for MockBackend {
    fn submit(&mut self, submission: &RenderSubmission) -> Result<(), BackendError> {
        if self.fail_submit {
            return Err(BackendError::SubmitFailed(format!(
                "{} items rejected",
                submission.items.len()
            )));
        }
        self.submissions.push(submission.clone());
        Ok(())
    }

    fn query(
        &mut self,
        params: &IntersectParams,
        collection: &Collection,
    ) -> Result<HitSet, BackendError> {
        self.queries.push((params.clone(), collection.clone()));
        if let Some(root) = collection
            .root_paths
            .iter()
            .find(|root| self.failing_roots.contains(*root))
        {
            return Err(BackendError::QueryFailed {
                collection: collection.name.clone(),
                reason: format!("root {root} unavailable"),
            });
        }
        if !params.render_tags.iter().any(|tag| collection.has_tag(tag)) {
            return Ok(HitSet::new());
        }
        let hits: HitSet = self
            .scene
            .iter()
            .filter(|hit| collection.contains_path(&hit.object_path))
            .cloned()
            .collect();
        Ok(match params.mode {
            IntersectMode::All => hits,
            IntersectMode::Nearest => hits.nearest().cloned().into_iter().collect(),
        })
    }

    fn save_state(&mut self) -> Result<(), BackendError> {
        self.saves += 1;
        Ok(())
    }

    fn restore_state(&mut self) -> Result<(), BackendError> {
        self.restores += 1;
        Ok(())
    }

    fn mark_collection_dirty(&mut self, collection: &Collection) {
        self.dirtied
            .push((collection.name.clone(), collection.version));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use shapebatch_port::{CameraMatrices, ViewportRect};

    fn params(mode: IntersectMode) -> IntersectParams {
        IntersectParams {
            view: shapebatch_port::IDENTITY,
            projection: shapebatch_port::IDENTITY,
            resolution: [64, 64],
            alpha_threshold: 0.1,
            render_tags: vec![RenderTag::geometry()],
            mode,
        }
    }

    fn collection(roots: &[&str]) -> Collection {
        Collection::new(
            "test",
            roots.iter().copied().map(PrimPath::from).collect(),
            vec![RenderTag::geometry()],
        )
    }

    fn scene() -> MockBackend {
        let mut backend = MockBackend::new();
        backend.add_hit(Hit::new(AdapterId(1), "/a/mesh", 0.7));
        backend.add_hit(Hit::new(AdapterId(2), "/b/mesh", 0.2));
        backend.add_hit(Hit::new(AdapterId(3), "/c/mesh", 0.1));
        backend
    }

    #[test]
    fn query_filters_by_collection_roots() {
        let mut backend = scene();
        let hits = backend
            .query(&params(IntersectMode::All), &collection(&["/a", "/b"]))
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(backend.queries.len(), 1);
    }

    #[test]
    fn query_without_shared_tag_hits_nothing() {
        let mut backend = scene();
        let guides = Collection::new(
            "guides",
            vec![PrimPath::from("/a")],
            vec![RenderTag::guide()],
        );
        let hits = backend.query(&params(IntersectMode::All), &guides).unwrap();
        assert_eq!(hits.len(), 0);
    }

    #[test]
    fn nearest_mode_returns_one_hit() {
        let mut backend = scene();
        let hits = backend
            .query(&params(IntersectMode::Nearest), &collection(&["/a", "/b"]))
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits.nearest().map(|h| h.owner), Some(AdapterId(2)));
    }

    #[test]
    fn failing_root_fails_query() {
        let mut backend = scene();
        backend.fail_root(PrimPath::from("/b"));
        assert!(backend
            .query(&params(IntersectMode::All), &collection(&["/a", "/b"]))
            .is_err());
        assert!(backend
            .query(&params(IntersectMode::All), &collection(&["/a"]))
            .is_ok());
    }

    #[test]
    fn submit_records_or_fails() {
        let mut backend = MockBackend::new();
        let submission = RenderSubmission {
            context: ViewportContext::Legacy,
            camera: CameraMatrices::default(),
            viewport: ViewportRect::sized(8, 8),
            items: Vec::new(),
        };
        backend.submit(&submission).unwrap();
        assert_eq!(backend.last_item_count(), Some(0));
        backend.fail_submit = true;
        assert!(backend.submit(&submission).is_err());
        assert_eq!(backend.submissions.len(), 1);
    }

    #[test]
    fn shape_changes_are_visible_through_trait() {
        let shape = MockShape::new(
            AdapterId(4),
            ViewportContext::Viewport2,
            RenderParamsKey::default(),
            "/x",
        );
        shape.set_params(RenderParamsKey::lit());
        shape.set_visible(false);
        shape.set_roots(vec![PrimPath::from("/y")]);
        let adapter: &dyn ShapeAdapter = &shape;
        assert_eq!(adapter.render_params(), RenderParamsKey::lit());
        assert!(!adapter.is_visible());
        assert_eq!(adapter.root_paths(), vec![PrimPath::from("/y")]);
    }
}
