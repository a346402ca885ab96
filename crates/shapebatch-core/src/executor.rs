// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Flattening buckets into one batched render submission.

use shapebatch_port::{
    BackendError, CameraMatrices, Collection, RenderBackend, RenderParamsKey, RenderSubmission,
    RenderWorkItem, ViewportContext, ViewportRect,
};
use tracing::debug;

use crate::collections::{adapter_collection_name, CollectionTracker};
use crate::registry::ContextBuckets;

/// Builds and submits render passes.
#[derive(Clone, Copy, Debug, Default)]
pub struct BatchExecutor;

impl BatchExecutor {
    /// One work item per bucket with at least one visible adapter, in bucket
    /// iteration order. Each visible adapter contributes one collection.
    pub fn flatten(
        context: ViewportContext,
        buckets: &ContextBuckets,
        tracker: &mut CollectionTracker,
        backend: &mut dyn RenderBackend,
    ) -> Vec<RenderWorkItem> {
        buckets
            .buckets()
            .filter_map(|bucket| {
                let collections: Vec<Collection> = bucket
                    .adapters()
                    .filter(|adapter| adapter.is_visible())
                    .map(|adapter| {
                        tracker.sync(
                            adapter_collection_name(context, adapter.id()),
                            adapter.root_paths(),
                            adapter.render_tags(),
                            &mut *backend,
                        )
                    })
                    .collect();
                if collections.is_empty() {
                    return None;
                }
                Some(RenderWorkItem {
                    params: bucket.key().clone(),
                    digest: bucket.digest(),
                    collections,
                })
            })
            .collect()
    }

    /// Submit every bucket of `context` as a single pass.
    ///
    /// Ambient backend state is saved once before and restored once after the
    /// submission, even if the submission fails. Returns the number of work
    /// items submitted; an empty pass submits nothing.
    pub fn render_batches(
        context: ViewportContext,
        buckets: &ContextBuckets,
        camera: &CameraMatrices,
        viewport: ViewportRect,
        tracker: &mut CollectionTracker,
        backend: &mut dyn RenderBackend,
    ) -> Result<usize, BackendError> {
        let items = Self::flatten(context, buckets, tracker, backend);
        if items.is_empty() {
            debug!(%context, "nothing to draw");
            return Ok(0);
        }
        let submission = RenderSubmission {
            context,
            camera: *camera,
            viewport,
            items,
        };
        Self::submit_pass(&submission, backend)
    }

    /// Draw one caller-owned collection as a single-item pass.
    ///
    /// The params are bucketed under the collection's name, so the backend
    /// never merges the item with a regular bucket.
    pub fn render_collection(
        context: ViewportContext,
        collection: &Collection,
        params: RenderParamsKey,
        camera: &CameraMatrices,
        viewport: ViewportRect,
        backend: &mut dyn RenderBackend,
    ) -> Result<(), BackendError> {
        let params = params.with_tag(collection.name.clone());
        let submission = RenderSubmission {
            context,
            camera: *camera,
            viewport,
            items: vec![RenderWorkItem {
                digest: params.digest(),
                params,
                collections: vec![collection.clone()],
            }],
        };
        Self::submit_pass(&submission, backend).map(drop)
    }

    fn submit_pass(
        submission: &RenderSubmission,
        backend: &mut dyn RenderBackend,
    ) -> Result<usize, BackendError> {
        backend.save_state()?;
        let submitted = backend.submit(submission);
        let restored = backend.restore_state();
        submitted?;
        restored?;
        debug!(
            context = %submission.context,
            items = submission.items.len(),
            "batch submitted"
        );
        Ok(submission.items.len())
    }
}
