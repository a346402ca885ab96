// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The explicitly owned batching context behind the host entry points.

use shapebatch_port::{
    nearest_hit, AdapterId, BackendError, CameraMatrices, Collection, FixedCapabilities,
    FrameStamp, Hit, HitSet, HostCapabilities, PassId, RenderBackend, RenderParamsKey,
    ShapeAdapter, ViewportContext, ViewportRect,
};
use tracing::{debug, error, info, instrument, warn};

use crate::collections::{adapter_collection_name, replace_contents, CollectionTracker};
use crate::config::{BatchConfig, ConfigError, EndOfPass};
use crate::error::{BatchError, RegistryError, SequenceError};
use crate::executor::BatchExecutor;
use crate::gate::{EventKind, FrameGate, GateKind};
use crate::registry::{AdapterHandle, BucketRegistry};
use crate::selection::{SelectionCache, SelectionReport, SelectionRequest, SelectionResolver};
use crate::state::{PassEvent, PassState};

/// A host draw callback.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawEvent {
    /// Host frame stamp; required by stamp-gated contexts.
    pub stamp: Option<FrameStamp>,
    /// Host render pass, when the host names its passes.
    pub pass_id: Option<PassId>,
    /// Camera for the draw.
    pub camera: CameraMatrices,
    /// Viewport being drawn.
    pub viewport: ViewportRect,
}

/// A host selection callback.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectEvent {
    /// Host selection stamp; required by stamp-gated contexts.
    pub stamp: Option<FrameStamp>,
    /// Pick camera (projection restricted to the pick region).
    pub camera: CameraMatrices,
    /// Viewport being picked in.
    pub viewport: ViewportRect,
    /// Point pick wanting only the nearest hit.
    pub single_selection: bool,
}

/// What a draw callback did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawOutcome {
    /// A batched pass was submitted with this many work items.
    Rendered {
        /// Work items submitted.
        items: usize,
    },
    /// This frame was already drawn.
    Deduplicated,
}

/// What a selection callback did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectOutcome {
    /// A new selection was computed.
    Computed(SelectionReport),
    /// This frame's selection was already computed; the cache is current.
    Cached,
}

/// Batching context: registry, gates, pass states and selection cache for
/// every viewport context, plus the backend they drive.
///
/// Construct one per host session and pass it to every callback.
pub struct BatchRenderer<B, H = FixedCapabilities> {
    config: BatchConfig,
    backend: B,
    host: H,
    registry: BucketRegistry,
    gate: FrameGate,
    states: [PassState; ViewportContext::COUNT],
    cache: SelectionCache,
    collections: CollectionTracker,
    resolver: SelectionResolver,
}

impl<B, H> BatchRenderer<B, H>
where
    B: RenderBackend,
    H: HostCapabilities,
{
    /// Build a context from a validated config.
    pub fn new(config: BatchConfig, backend: B, host: H) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            gate: FrameGate::new(config.gate_kinds()),
            resolver: SelectionResolver::new(&config),
            registry: BucketRegistry::new(),
            states: [PassState::Idle; ViewportContext::COUNT],
            cache: SelectionCache::new(),
            collections: CollectionTracker::new(),
            config,
            backend,
            host,
        })
    }

    /// Register (or re-bucket) an adapter entering the scene.
    pub fn register_adapter(&mut self, adapter: AdapterHandle) -> Result<bool, RegistryError> {
        self.registry.insert(&adapter)
    }

    /// Unregister an adapter leaving the scene.
    pub fn unregister_adapter(
        &mut self,
        adapter: &dyn ShapeAdapter,
    ) -> Result<bool, RegistryError> {
        let removed = self.registry.remove(adapter)?;
        if removed {
            self.collections
                .forget(&adapter_collection_name(adapter.viewport_context(), adapter.id()));
        }
        Ok(removed)
    }

    /// Re-evaluate a registered adapter's render params after a host-side
    /// display change. Returns whether it moved buckets.
    pub fn refresh_adapter(
        &mut self,
        context: ViewportContext,
        id: AdapterId,
    ) -> Result<bool, RegistryError> {
        let handle = self
            .registry
            .lookup(context, id)
            .cloned()
            .ok_or_else(|| {
                error!(%id, %context, "coding error: refresh of unregistered adapter");
                RegistryError::UnknownAdapter { id, context }
            })?;
        self.registry.insert(&handle)
    }

    /// Registered adapter by identity.
    pub fn shape_adapter(
        &self,
        context: ViewportContext,
        id: AdapterId,
    ) -> Option<&AdapterHandle> {
        self.registry.lookup(context, id)
    }

    /// Draw callback.
    ///
    /// Renders every bucket of `context` in one submission unless this frame
    /// (or this named pass, within the current refresh) was already drawn.
    /// A pass id counts as drawn even when the frame gate then skips it. Any
    /// render clears the shared selection cache. A backend failure still
    /// completes the pass transition, so the next frame proceeds normally.
    #[instrument(skip(self, event), fields(context = %context))]
    pub fn on_draw(
        &mut self,
        context: ViewportContext,
        event: &DrawEvent,
    ) -> Result<DrawOutcome, BatchError> {
        self.require_stamp(context, EventKind::Render, event.stamp)?;
        if let Some(pass) = &event.pass_id {
            if !self.gate.mark_pass_drawn(context, pass) {
                return Ok(DrawOutcome::Deduplicated);
            }
        }
        if !self
            .gate
            .update_if_changed(EventKind::Render, context, event.stamp)
        {
            return Ok(DrawOutcome::Deduplicated);
        }
        self.transition(context, PassEvent::BeginRender)?;
        self.invalidate_selection(context);

        let result = BatchExecutor::render_batches(
            context,
            self.registry.context(context),
            &event.camera,
            event.viewport,
            &mut self.collections,
            &mut self.backend,
        );
        self.transition(context, PassEvent::RenderExecuted)?;
        if self.config.context(context).end_of_pass == EndOfPass::Immediate {
            self.finish_pass(context)?;
        }

        match result {
            Ok(items) => Ok(DrawOutcome::Rendered { items }),
            Err(err) => {
                warn!(error = %err, "render pass failed");
                Err(err.into())
            }
        }
    }

    /// Host request for a fresh image in `context`.
    ///
    /// Re-arms the render gate so the next draw passes even without a new
    /// stamp. Flag-gated contexts draw nothing until this is called again.
    #[instrument(skip(self), fields(context = %context))]
    pub fn on_render_requested(&mut self, context: ViewportContext) {
        self.gate.rearm(EventKind::Render, context);
    }

    /// Native end-of-pass notification.
    ///
    /// Re-arms selection and forgets the render passes drawn this refresh.
    #[instrument(skip(self), fields(context = %context))]
    pub fn on_end_of_pass(&mut self, context: ViewportContext) -> Result<(), SequenceError> {
        self.finish_pass(context).inspect_err(|err| {
            warn!(error = %err, "rejected end-of-pass");
        })
    }

    /// Selection callback.
    ///
    /// Computes a fresh selection at most once per selection frame; repeated
    /// calls read the cache. Read results with [`resolve`](Self::resolve).
    #[instrument(skip(self, event), fields(context = %context, single = event.single_selection))]
    pub fn on_select(
        &mut self,
        context: ViewportContext,
        event: &SelectEvent,
    ) -> Result<SelectOutcome, BatchError> {
        self.require_stamp(context, EventKind::Select, event.stamp)?;
        self.states[context.index()]
            .ensure_selectable(context)
            .inspect_err(|err| warn!(error = %err, "rejected select"))?;
        if !self
            .gate
            .update_if_changed(EventKind::Select, context, event.stamp)
        {
            return Ok(SelectOutcome::Cached);
        }

        let depth_selection = self.host.depth_selection_enabled().unwrap_or_else(|| {
            debug!("depth selection capability unresolved; using aggregated queries");
            false
        });
        self.invalidate_selection(context);
        let request = SelectionRequest {
            context,
            camera: &event.camera,
            single_selection: event.single_selection,
            depth_selection,
        };
        let report = self.resolver.compute_selection(
            self.registry.context(context),
            &request,
            &mut self.collections,
            &mut self.backend,
            &mut self.cache,
        );
        self.transition(context, PassEvent::SelectionComputed)?;
        Ok(SelectOutcome::Computed(report))
    }

    /// Run (or reuse) the selection for `event` and return `id`'s hits.
    pub fn test_intersection(
        &mut self,
        context: ViewportContext,
        id: AdapterId,
        event: &SelectEvent,
    ) -> Result<Option<&HitSet>, BatchError> {
        self.on_select(context, event)?;
        Ok(self.cache.resolve(id))
    }

    /// Draw `collection` on its own with `params`, outside the batching.
    ///
    /// Gates, pass state and the selection cache are left alone.
    #[instrument(skip_all, fields(context = %context, collection = %collection.name))]
    pub fn draw_custom_collection(
        &mut self,
        context: ViewportContext,
        collection: &Collection,
        params: RenderParamsKey,
        camera: &CameraMatrices,
        viewport: ViewportRect,
    ) -> Result<(), BackendError> {
        BatchExecutor::render_collection(
            context,
            collection,
            params,
            camera,
            viewport,
            &mut self.backend,
        )
        .inspect_err(|err| warn!(error = %err, "custom collection draw failed"))
    }

    /// Nearest hit inside `collection`, or `None` if nothing was hit.
    ///
    /// Runs a fresh query every call; gates and the cache are bypassed.
    pub fn test_intersection_custom_collection(
        &mut self,
        collection: &Collection,
        camera: &CameraMatrices,
    ) -> Result<Option<Hit>, BackendError> {
        self.resolver.intersect_collection(collection, camera, &mut self.backend)
    }

    /// Point `collection` at the roots and render tags of adapter `id`.
    ///
    /// Viewport 2.0 registrations win over legacy ones. The collection is
    /// rewritten and marked dirty only when the roots differ. Returns `false`
    /// if `id` is not registered.
    pub fn populate_custom_collection(
        &mut self,
        id: AdapterId,
        collection: &mut Collection,
    ) -> bool {
        let Some(adapter) = [ViewportContext::Viewport2, ViewportContext::Legacy]
            .into_iter()
            .find_map(|context| self.registry.lookup(context, id))
            .cloned()
        else {
            debug!(%id, collection = %collection.name, "no adapter to populate from");
            return false;
        };
        let roots = adapter.root_paths();
        if !collection.has_roots(&roots) {
            replace_contents(collection, roots, adapter.render_tags(), &mut self.backend);
        }
        true
    }

    /// Cached hits for one adapter.
    pub fn resolve(&self, id: AdapterId) -> Option<&HitSet> {
        self.cache.resolve(id)
    }

    /// Every cached hit from the latest selection.
    pub fn selected_hits(&self) -> HitSet {
        self.cache.hits()
    }

    /// Nearest cached hit for one adapter.
    pub fn nearest_hit(&self, id: AdapterId) -> Option<&Hit> {
        self.cache.resolve(id).and_then(nearest_hit)
    }

    /// Tear down and rebuild every registry, gate, state and cache.
    ///
    /// Used when the host's scene is replaced wholesale. Config, backend and
    /// host capabilities are kept.
    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        info!(
            adapters = self.registry.adapter_count(),
            "resetting batch renderer"
        );
        self.registry = BucketRegistry::new();
        self.gate = FrameGate::new(self.config.gate_kinds());
        self.states = [PassState::Idle; ViewportContext::COUNT];
        self.cache = SelectionCache::new();
        self.collections = CollectionTracker::new();
    }

    /// Active config.
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Bucket registry.
    pub fn registry(&self) -> &BucketRegistry {
        &self.registry
    }

    /// Frame gates.
    pub fn gate(&self) -> &FrameGate {
        &self.gate
    }

    /// Pass state of `context`.
    pub fn state(&self, context: ViewportContext) -> PassState {
        self.states[context.index()]
    }

    /// Selection cache.
    pub fn selection(&self) -> &SelectionCache {
        &self.cache
    }

    /// Collection tracker.
    pub fn collections(&self) -> &CollectionTracker {
        &self.collections
    }

    /// Render backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Render backend, mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn require_stamp(
        &self,
        context: ViewportContext,
        kind: EventKind,
        stamp: Option<FrameStamp>,
    ) -> Result<(), SequenceError> {
        if stamp.is_none() && self.gate.kind(context) == GateKind::Stamp {
            warn!(%context, %kind, "stamp-gated event without a frame stamp");
            return Err(SequenceError::MissingStamp { context, kind });
        }
        Ok(())
    }

    fn transition(
        &mut self,
        context: ViewportContext,
        event: PassEvent,
    ) -> Result<(), SequenceError> {
        let slot = &mut self.states[context.index()];
        *slot = slot.on(event, context)?;
        Ok(())
    }

    fn finish_pass(&mut self, context: ViewportContext) -> Result<(), SequenceError> {
        self.transition(context, PassEvent::EndOfPass)?;
        self.gate.rearm(EventKind::Select, context);
        self.gate.clear_passes(context);
        Ok(())
    }

    /// Clear the shared cache; contexts whose results were dropped may
    /// compute their selection again.
    fn invalidate_selection(&mut self, initiator: ViewportContext) {
        for dropped in self.cache.clear() {
            if dropped == initiator {
                continue;
            }
            let slot = &mut self.states[dropped.index()];
            if let Ok(next) = slot.on(PassEvent::CacheInvalidated, dropped) {
                *slot = next;
            }
            self.gate.rearm(EventKind::Select, dropped);
            debug!(context = %dropped, by = %initiator, "selection invalidated");
        }
    }
}
