// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Intersection hits and hit sets.

use rustc_hash::FxHashSet;

use crate::{AdapterId, PrimPath};

/// One intersection-query result.
#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
    /// Adapter whose collection produced the hit.
    pub owner: AdapterId,
    /// Scene path of the object that was hit.
    pub object_path: PrimPath,
    /// Instance index for instanced geometry, `None` otherwise.
    pub instance_index: Option<u32>,
    /// Sub-object (face, point, curve) index, `None` if not resolved.
    pub element_index: Option<u32>,
    /// Normalized device depth; smaller is nearer.
    pub depth: f32,
}

impl Hit {
    /// Hit on a whole object with no instance or element resolution.
    pub fn new(owner: AdapterId, object_path: impl Into<PrimPath>, depth: f32) -> Self {
        Self {
            owner,
            object_path: object_path.into(),
            instance_index: None,
            element_index: None,
            depth,
        }
    }

    /// Set the instance index.
    pub fn with_instance(mut self, index: u32) -> Self {
        self.instance_index = Some(index);
        self
    }

    /// Set the element index.
    pub fn with_element(mut self, index: u32) -> Self {
        self.element_index = Some(index);
        self
    }

    /// Identity used to coalesce duplicate hits.
    pub fn key(&self) -> HitKey {
        HitKey {
            owner: self.owner,
            object_path: self.object_path.clone(),
            instance_index: self.instance_index,
            element_index: self.element_index,
        }
    }
}

/// Identity of a hit: everything except depth.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HitKey {
    /// Owning adapter.
    pub owner: AdapterId,
    /// Object path.
    pub object_path: PrimPath,
    /// Instance index.
    pub instance_index: Option<u32>,
    /// Element index.
    pub element_index: Option<u32>,
}

/// Set of hits with duplicate coalescing.
///
/// Iteration follows insertion order. Inserting a hit whose [`HitKey`] is
/// already present keeps the first record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HitSet {
    hits: Vec<Hit>,
    keys: FxHashSet<HitKey>,
}

impl HitSet {
    /// Empty hit set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a hit. Returns `false` if an equal-keyed hit was already present.
    pub fn insert(&mut self, hit: Hit) -> bool {
        if !self.keys.insert(hit.key()) {
            return false;
        }
        self.hits.push(hit);
        true
    }

    /// Union `other` into `self`, coalescing duplicates.
    pub fn extend(&mut self, other: impl IntoIterator<Item = Hit>) {
        for hit in other {
            self.insert(hit);
        }
    }

    /// Number of distinct hits.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns `true` if nothing was hit.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Returns `true` if a hit with this key is present.
    pub fn contains(&self, key: &HitKey) -> bool {
        self.keys.contains(key)
    }

    /// Iterate hits in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Hit> {
        self.hits.iter()
    }

    /// Nearest hit; see [`nearest_hit`].
    pub fn nearest(&self) -> Option<&Hit> {
        nearest_hit(self)
    }
}

impl FromIterator<Hit> for HitSet {
    fn from_iter<I: IntoIterator<Item = Hit>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl IntoIterator for HitSet {
    type Item = Hit;
    type IntoIter = std::vec::IntoIter<Hit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.into_iter()
    }
}

impl<'a> IntoIterator for &'a HitSet {
    type Item = &'a Hit;
    type IntoIter = std::slice::Iter<'a, Hit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.iter()
    }
}

/// Hit with the smallest depth.
///
/// Linear scan in iteration order; on equal depth the first encountered hit
/// wins. Depths compare with `f32::total_cmp`, so a NaN depth never beats a
/// finite one.
pub fn nearest_hit(hits: &HitSet) -> Option<&Hit> {
    let mut nearest: Option<&Hit> = None;
    for hit in hits {
        match nearest {
            Some(best) if !hit.depth.total_cmp(&best.depth).is_lt() => {}
            _ => nearest = Some(hit),
        }
    }
    nearest
}
