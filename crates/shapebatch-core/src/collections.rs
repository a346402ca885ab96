// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Collection versioning and dirty tracking.

use rustc_hash::{FxHashMap, FxHashSet};
use shapebatch_port::{
    AdapterId, Collection, ParamsDigest, PrimPath, RenderBackend, RenderTag, ViewportContext,
};
use tracing::debug;

/// Name of the collection carrying one adapter's payload.
pub fn adapter_collection_name(context: ViewportContext, id: AdapterId) -> String {
    format!("{context}/adapter/{}", id.0)
}

/// Name of the per-bucket selection collection.
pub fn bucket_collection_name(context: ViewportContext, digest: ParamsDigest) -> String {
    format!("{context}/bucket/{digest}")
}

/// Prefix shared by every per-bucket selection collection of `context`.
pub fn bucket_collection_prefix(context: ViewportContext) -> String {
    format!("{context}/bucket/")
}

/// Name of the aggregated whole-viewport selection collection.
pub fn viewport_collection_name(context: ViewportContext) -> String {
    format!("{context}/viewport")
}

/// Last known state of every collection handed to the backend.
///
/// A collection is marked dirty on the backend only when its root-path or
/// render-tag list actually changes, so unchanged frames cost no backend
/// invalidation.
#[derive(Debug, Default)]
pub struct CollectionTracker {
    collections: FxHashMap<String, Collection>,
}

impl CollectionTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the tracked collection `name` up to date and return a copy.
    ///
    /// First sight of a name creates a version-zero collection. Later calls
    /// bump the version and call
    /// [`RenderBackend::mark_collection_dirty`] if the roots or tags differ.
    pub fn sync(
        &mut self,
        name: String,
        root_paths: Vec<PrimPath>,
        render_tags: Vec<RenderTag>,
        backend: &mut dyn RenderBackend,
    ) -> Collection {
        if let Some(existing) = self.collections.get_mut(&name) {
            if !existing.has_roots(&root_paths) || existing.render_tags != render_tags {
                replace_contents(existing, root_paths, render_tags, backend);
            }
            return existing.clone();
        }
        let collection = Collection::new(name.clone(), root_paths, render_tags);
        self.collections.insert(name, collection.clone());
        collection
    }

    /// Stop tracking `name`. Returns whether it was tracked.
    pub fn forget(&mut self, name: &str) -> bool {
        self.collections.remove(name).is_some()
    }

    /// Tracked state of `name`.
    pub fn get(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    /// Drop every tracked collection whose name starts with `prefix` and is
    /// not in `live`. Returns how many were dropped.
    pub fn prune(&mut self, prefix: &str, live: &FxHashSet<String>) -> usize {
        let before = self.collections.len();
        self.collections
            .retain(|name, _| !name.starts_with(prefix) || live.contains(name));
        let dropped = before - self.collections.len();
        if dropped > 0 {
            debug!(prefix, dropped, "pruned stale collections");
        }
        dropped
    }

    /// Number of tracked collections.
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    /// Returns `true` if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

/// Overwrite the roots and tags of `collection`, bump its version and mark
/// it dirty on the backend.
pub fn replace_contents(
    collection: &mut Collection,
    root_paths: Vec<PrimPath>,
    render_tags: Vec<RenderTag>,
    backend: &mut dyn RenderBackend,
) {
    collection.root_paths = root_paths;
    collection.render_tags = render_tags;
    collection.version += 1;
    debug!(collection = %collection.name, version = collection.version, "collection dirty");
    backend.mark_collection_dirty(collection);
}
