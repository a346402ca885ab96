// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Adapter, backend, and host capability traits.

use crate::{
    AdapterId, BackendError, CameraMatrices, Collection, HitSet, Mat4, ParamsDigest, PrimPath,
    RenderParamsKey, RenderTag, ViewportContext, ViewportRect,
};

/// A host drawable exposed to the batching engine.
///
/// Adapters are owned by the host; the engine holds shared handles while they
/// are registered. Every method is called on the host's callback thread.
pub trait ShapeAdapter {
    /// Stable identity for the lifetime of the registration.
    fn id(&self) -> AdapterId;

    /// Viewport context this adapter draws in. Fixed for its lifetime.
    fn viewport_context(&self) -> ViewportContext;

    /// Current render parameters.
    ///
    /// May change between calls when the host toggles display modes.
    fn render_params(&self) -> RenderParamsKey;

    /// Scene roots making up this adapter's render payload.
    fn root_paths(&self) -> Vec<PrimPath>;

    /// Render tags included in this adapter's payload.
    fn render_tags(&self) -> Vec<RenderTag> {
        vec![RenderTag::geometry()]
    }

    /// Whether the adapter should contribute to draws and picks right now.
    fn is_visible(&self) -> bool {
        true
    }
}

/// Number of hits an intersection query reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntersectMode {
    /// Only the single nearest hit.
    Nearest,
    /// Every unique hit.
    All,
}

/// Parameters for one intersection query.
#[derive(Clone, Debug, PartialEq)]
pub struct IntersectParams {
    /// World-to-view transform.
    pub view: Mat4,
    /// Pick-restricted projection.
    pub projection: Mat4,
    /// Query-space sample grid (width, height).
    pub resolution: [u32; 2],
    /// Coverage below which a sample does not count as a hit.
    pub alpha_threshold: f32,
    /// Only geometry carrying one of these tags is tested.
    pub render_tags: Vec<RenderTag>,
    /// Nearest-only or all hits.
    pub mode: IntersectMode,
}

/// One bucket's worth of render work.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderWorkItem {
    /// Shared render parameters of every collection in the item.
    pub params: RenderParamsKey,
    /// Digest of `params`.
    pub digest: ParamsDigest,
    /// One collection per visible adapter in the bucket.
    pub collections: Vec<Collection>,
}

/// A complete render pass: every work item for one viewport context.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderSubmission {
    /// Context being drawn.
    pub context: ViewportContext,
    /// Camera for the pass.
    pub camera: CameraMatrices,
    /// Viewport rectangle for the pass.
    pub viewport: ViewportRect,
    /// Work items in bucket iteration order.
    pub items: Vec<RenderWorkItem>,
}

/// Rendering and intersection engine behind the batcher.
///
/// Calls block until the backend finishes; there is no cancellation.
pub trait RenderBackend {
    /// Execute every work item of a pass in one submission.
    fn submit(&mut self, submission: &RenderSubmission) -> Result<(), BackendError>;

    /// Run one intersection query against `collection`.
    ///
    /// `Ok` with an empty set means nothing was hit.
    fn query(
        &mut self,
        params: &IntersectParams,
        collection: &Collection,
    ) -> Result<HitSet, BackendError>;

    /// Save ambient render state before a pass.
    fn save_state(&mut self) -> Result<(), BackendError>;

    /// Restore the state saved by the matching [`save_state`](RenderBackend::save_state).
    fn restore_state(&mut self) -> Result<(), BackendError>;

    /// Invalidate any backend state cached for `collection.name`.
    fn mark_collection_dirty(&mut self, collection: &Collection);
}

/// Host-side capability queries.
pub trait HostCapabilities {
    /// Whether area selection should resolve per-bucket depth ordering.
    ///
    /// `None` means the host could not answer; the engine then issues
    /// aggregated queries, the cheaper mode.
    fn depth_selection_enabled(&self) -> Option<bool>;
}

/// Capabilities fixed at construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FixedCapabilities {
    /// Answer for [`HostCapabilities::depth_selection_enabled`].
    pub depth_selection: Option<bool>,
}

impl HostCapabilities for FixedCapabilities {
    fn depth_selection_enabled(&self) -> Option<bool> {
        self.depth_selection
    }
}
