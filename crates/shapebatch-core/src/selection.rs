// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Intersection queries and the per-adapter hit cache.
//!
//! The cache is replaced wholesale by each computed selection and cleared by
//! each render pass; it is never patched incrementally.

use rustc_hash::{FxHashMap, FxHashSet};
use shapebatch_port::{
    AdapterId, BackendError, CameraMatrices, Collection, Hit, HitSet, IntersectMode,
    IntersectParams, PrimPath, RenderBackend, RenderTag, ViewportContext,
};
use tracing::{debug, warn};

use crate::collections::{
    bucket_collection_name, bucket_collection_prefix, viewport_collection_name, CollectionTracker,
};
use crate::config::BatchConfig;
use crate::registry::{Bucket, ContextBuckets};

/// Hits grouped by owning adapter.
#[derive(Debug, Default)]
pub struct SelectionCache {
    by_owner: FxHashMap<AdapterId, HitSet>,
    contributors: [bool; ViewportContext::COUNT],
}

impl SelectionCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every cached hit. Returns the contexts whose results were dropped.
    pub fn clear(&mut self) -> Vec<ViewportContext> {
        self.by_owner.clear();
        let dropped = ViewportContext::ALL
            .into_iter()
            .filter(|ctx| self.contributors[ctx.index()])
            .collect();
        self.contributors = [false; ViewportContext::COUNT];
        dropped
    }

    /// Hits for one adapter; pure read.
    pub fn resolve(&self, id: AdapterId) -> Option<&HitSet> {
        self.by_owner.get(&id)
    }

    /// Number of adapters with at least one hit.
    pub fn len(&self) -> usize {
        self.by_owner.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.by_owner.is_empty()
    }

    /// Total hits across all adapters.
    pub fn hit_count(&self) -> usize {
        self.by_owner.values().map(HitSet::len).sum()
    }

    /// Adapters with hits, in no particular order.
    pub fn owners(&self) -> impl Iterator<Item = AdapterId> + '_ {
        self.by_owner.keys().copied()
    }

    /// Every cached hit, grouped by owner in identity order.
    pub fn hits(&self) -> HitSet {
        let mut owners: Vec<AdapterId> = self.by_owner.keys().copied().collect();
        owners.sort_unstable();
        owners
            .iter()
            .filter_map(|id| self.by_owner.get(id))
            .flat_map(|set| set.iter().cloned())
            .collect()
    }

    /// Whether `context` has results in the cache.
    pub fn has_results_from(&self, context: ViewportContext) -> bool {
        self.contributors[context.index()]
    }

    fn merge(&mut self, hits: HitSet) -> usize {
        let mut added = 0;
        for hit in hits {
            if self.by_owner.entry(hit.owner).or_default().insert(hit) {
                added += 1;
            }
        }
        added
    }
}

/// How a selection pass queried the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionMode {
    /// One query over the whole-viewport collection.
    Aggregated,
    /// One query per bucket, preserving depth ordering across buckets.
    PerBucket,
}

/// Outcome of one computed selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectionReport {
    /// Query strategy used.
    pub mode: SelectionMode,
    /// Queries issued.
    pub queries: usize,
    /// Queries that failed and were skipped.
    pub failed: usize,
    /// Distinct hits cached.
    pub hits: usize,
}

/// Inputs for [`SelectionResolver::compute_selection`].
#[derive(Clone, Copy, Debug)]
pub struct SelectionRequest<'a> {
    /// Context being picked.
    pub context: ViewportContext,
    /// Pick camera.
    pub camera: &'a CameraMatrices,
    /// Point pick wanting only the nearest hit.
    pub single_selection: bool,
    /// Host allows per-bucket depth-ordered area selection.
    pub depth_selection: bool,
}

impl SelectionRequest<'_> {
    /// Strategy implied by the request.
    ///
    /// Per-bucket queries are only worth their cost for area selections that
    /// need depth ordering; everything else is one aggregated query.
    pub fn mode(&self) -> SelectionMode {
        if self.single_selection || !self.depth_selection {
            SelectionMode::Aggregated
        } else {
            SelectionMode::PerBucket
        }
    }
}

/// Issues intersection queries and rebuilds the selection cache.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectionResolver {
    resolution: [u32; 2],
    alpha_threshold: f32,
    render_tags: Vec<RenderTag>,
}

impl SelectionResolver {
    /// Resolver using the pick settings of `config`.
    pub fn new(config: &BatchConfig) -> Self {
        Self {
            resolution: config.pick_resolution,
            alpha_threshold: config.alpha_threshold,
            render_tags: config.selection_render_tags.clone(),
        }
    }

    fn params(&self, camera: &CameraMatrices, mode: IntersectMode) -> IntersectParams {
        IntersectParams {
            view: camera.view,
            projection: camera.projection,
            resolution: self.resolution,
            alpha_threshold: self.alpha_threshold,
            render_tags: self.render_tags.clone(),
            mode,
        }
    }

    /// Nearest hit inside a caller-owned collection.
    ///
    /// Bypasses the hit cache and every gate; backend errors propagate.
    pub fn intersect_collection(
        &self,
        collection: &Collection,
        camera: &CameraMatrices,
        backend: &mut dyn RenderBackend,
    ) -> Result<Option<Hit>, BackendError> {
        let params = self.params(camera, IntersectMode::Nearest);
        let hits = backend.query(&params, collection)?;
        Ok(hits.nearest().cloned())
    }

    /// Replace the cache with the hits for `request`.
    ///
    /// A failing query is logged and skipped; the remaining queries still
    /// contribute. Hits owned by adapters not registered in the context are
    /// dropped.
    pub fn compute_selection(
        &self,
        buckets: &ContextBuckets,
        request: &SelectionRequest<'_>,
        tracker: &mut CollectionTracker,
        backend: &mut dyn RenderBackend,
        cache: &mut SelectionCache,
    ) -> SelectionReport {
        cache.clear();
        let mode = request.mode();
        let params = self.params(
            request.camera,
            if request.single_selection {
                IntersectMode::Nearest
            } else {
                IntersectMode::All
            },
        );

        let collections: Vec<Collection> = match mode {
            SelectionMode::Aggregated => {
                let roots: Vec<PrimPath> = buckets.buckets().flat_map(visible_roots).collect();
                if roots.is_empty() {
                    Vec::new()
                } else {
                    let name = viewport_collection_name(request.context);
                    vec![tracker.sync(name, roots, self.render_tags.clone(), backend)]
                }
            }
            SelectionMode::PerBucket => {
                let live: FxHashSet<String> = buckets
                    .buckets()
                    .map(|bucket| bucket_collection_name(request.context, bucket.digest()))
                    .collect();
                tracker.prune(&bucket_collection_prefix(request.context), &live);
                buckets
                    .buckets()
                    .filter_map(|bucket| {
                        let roots = visible_roots(bucket);
                        if roots.is_empty() {
                            return None;
                        }
                        let name = bucket_collection_name(request.context, bucket.digest());
                        Some(tracker.sync(name, roots, self.render_tags.clone(), backend))
                    })
                    .collect()
            }
        };

        let mut report = SelectionReport {
            mode,
            queries: 0,
            failed: 0,
            hits: 0,
        };
        for collection in &collections {
            report.queries += 1;
            match backend.query(&params, collection) {
                Ok(hits) => {
                    let owned: HitSet = hits
                        .into_iter()
                        .filter(|hit| owned_by(buckets, hit))
                        .collect();
                    report.hits += cache.merge(owned);
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        collection = %collection.name,
                        error = %err,
                        "intersection query failed; skipping"
                    );
                }
            }
        }
        if report.queries > 0 {
            cache.contributors[request.context.index()] = true;
        }
        debug!(
            context = %request.context,
            ?mode,
            queries = report.queries,
            failed = report.failed,
            hits = report.hits,
            "selection computed"
        );
        report
    }
}

fn visible_roots(bucket: &Bucket) -> Vec<PrimPath> {
    bucket
        .adapters()
        .filter(|adapter| adapter.is_visible())
        .flat_map(|adapter| adapter.root_paths())
        .collect()
}

fn owned_by(buckets: &ContextBuckets, hit: &Hit) -> bool {
    let known = buckets.contains(hit.owner);
    if !known {
        debug!(owner = %hit.owner, path = %hit.object_path, "dropping hit from unregistered owner");
    }
    known
}
