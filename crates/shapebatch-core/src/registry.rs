// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Buckets of shape adapters sharing render parameters.
//!
//! # Invariants
//!
//! Per viewport context:
//! - an adapter identity sits in at most one bucket;
//! - the identity index holds exactly one entry per bucketed adapter, pointing
//!   at the handle most recently inserted for that identity;
//! - no bucket is ever empty: removing the last adapter deletes the bucket.
//!
//! Contexts never share adapters.

use std::collections::BTreeMap;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use shapebatch_port::{AdapterId, ParamsDigest, RenderParamsKey, ShapeAdapter, ViewportContext};
use tracing::{debug, error};

use crate::error::RegistryError;

/// Shared handle to a host-owned adapter.
pub type AdapterHandle = Rc<dyn ShapeAdapter>;

/// Adapters sharing one [`RenderParamsKey`].
pub struct Bucket {
    key: RenderParamsKey,
    digest: ParamsDigest,
    adapters: BTreeMap<AdapterId, AdapterHandle>,
}

impl Bucket {
    fn new(key: RenderParamsKey) -> Self {
        let digest = key.digest();
        Self {
            key,
            digest,
            adapters: BTreeMap::new(),
        }
    }

    /// Shared render parameters.
    pub fn key(&self) -> &RenderParamsKey {
        &self.key
    }

    /// Digest of [`key`](Bucket::key).
    pub fn digest(&self) -> ParamsDigest {
        self.digest
    }

    /// Number of adapters. Never zero for a bucket reachable from a registry.
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Always `false` for a bucket reachable from a registry.
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Returns `true` if `id` is in this bucket.
    pub fn contains(&self, id: AdapterId) -> bool {
        self.adapters.contains_key(&id)
    }

    /// Adapters in identity order.
    pub fn adapters(&self) -> impl Iterator<Item = &AdapterHandle> {
        self.adapters.values()
    }

    /// Identities in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = AdapterId> + '_ {
        self.adapters.keys().copied()
    }
}

impl core::fmt::Debug for Bucket {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Bucket")
            .field("key", &self.key)
            .field("digest", &self.digest.short())
            .field("adapters", &self.adapters.keys().collect::<Vec<_>>())
            .finish()
    }
}

struct IndexEntry {
    adapter: AdapterHandle,
    key: RenderParamsKey,
}

/// Buckets and identity index for one viewport context.
#[derive(Default)]
pub struct ContextBuckets {
    buckets: FxHashMap<RenderParamsKey, Bucket>,
    index: FxHashMap<AdapterId, IndexEntry>,
}

impl ContextBuckets {
    /// Buckets in map order. Stable within one call chain, not across mutations.
    pub fn buckets(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets.values()
    }

    /// Bucket for an exact key.
    pub fn bucket(&self, key: &RenderParamsKey) -> Option<&Bucket> {
        self.buckets.get(key)
    }

    /// Bucket currently holding `id`.
    pub fn bucket_of(&self, id: AdapterId) -> Option<&Bucket> {
        self.index.get(&id).and_then(|entry| self.buckets.get(&entry.key))
    }

    /// O(1) adapter lookup by identity.
    pub fn lookup(&self, id: AdapterId) -> Option<&AdapterHandle> {
        self.index.get(&id).map(|entry| &entry.adapter)
    }

    /// Returns `true` if `id` is registered here.
    pub fn contains(&self, id: AdapterId) -> bool {
        self.index.contains_key(&id)
    }

    /// Number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of registered adapters.
    pub fn adapter_count(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn insert(&mut self, adapter: &AdapterHandle, key: RenderParamsKey) -> bool {
        let id = adapter.id();
        if let Some(entry) = self.index.get(&id) {
            if entry.key == key && Rc::ptr_eq(&entry.adapter, adapter) {
                return false;
            }
        }
        self.detach(id);
        let bucket = self
            .buckets
            .entry(key.clone())
            .or_insert_with(|| Bucket::new(key.clone()));
        debug!(%id, bucket = %bucket.digest.short(), "bucketed adapter");
        bucket.adapters.insert(id, Rc::clone(adapter));
        self.index.insert(
            id,
            IndexEntry {
                adapter: Rc::clone(adapter),
                key,
            },
        );
        true
    }

    fn detach(&mut self, id: AdapterId) -> bool {
        let Some(entry) = self.index.remove(&id) else {
            return false;
        };
        if let Some(bucket) = self.buckets.get_mut(&entry.key) {
            bucket.adapters.remove(&id);
            if bucket.adapters.is_empty() {
                debug!(bucket = %bucket.digest.short(), "dropped empty bucket");
                self.buckets.remove(&entry.key);
            }
        }
        true
    }
}

/// Per-context bucket registries.
#[derive(Default)]
pub struct BucketRegistry {
    contexts: [ContextBuckets; ViewportContext::COUNT],
}

impl BucketRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket `adapter` under its current render parameters.
    ///
    /// The key is recomputed on every call. Returns `Ok(false)` if the adapter
    /// was already in the right bucket, `Ok(true)` if it was added or moved.
    pub fn insert(&mut self, adapter: &AdapterHandle) -> Result<bool, RegistryError> {
        let context = adapter.viewport_context();
        self.validate(adapter.id(), context)?;
        let key = adapter.render_params();
        Ok(self.contexts[context.index()].insert(adapter, key))
    }

    /// Remove `adapter` from whichever bucket holds it.
    ///
    /// Returns whether anything was removed.
    pub fn remove(&mut self, adapter: &dyn ShapeAdapter) -> Result<bool, RegistryError> {
        let context = adapter.viewport_context();
        self.validate(adapter.id(), context)?;
        Ok(self.contexts[context.index()].detach(adapter.id()))
    }

    /// O(1) adapter lookup by identity.
    pub fn lookup(&self, context: ViewportContext, id: AdapterId) -> Option<&AdapterHandle> {
        self.contexts[context.index()].lookup(id)
    }

    /// Buckets of one context.
    pub fn context(&self, context: ViewportContext) -> &ContextBuckets {
        &self.contexts[context.index()]
    }

    /// Registered adapters across all contexts.
    pub fn adapter_count(&self) -> usize {
        self.contexts.iter().map(ContextBuckets::adapter_count).sum()
    }

    /// Returns `true` if no context holds an adapter.
    pub fn is_empty(&self) -> bool {
        self.contexts.iter().all(ContextBuckets::is_empty)
    }

    fn validate(&self, id: AdapterId, context: ViewportContext) -> Result<(), RegistryError> {
        if !id.is_valid() {
            error!(%context, "coding error: adapter with null identity");
            return Err(RegistryError::InvalidAdapter { context });
        }
        for other in ViewportContext::ALL {
            if other != context && self.contexts[other.index()].contains(id) {
                error!(
                    %id,
                    registered = %other,
                    requested = %context,
                    "coding error: context mismatch"
                );
                return Err(RegistryError::ContextMismatch {
                    id,
                    registered: other,
                    requested: context,
                });
            }
        }
        Ok(())
    }
}
