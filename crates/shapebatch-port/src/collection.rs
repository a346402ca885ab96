// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Named, versioned sets of scene roots handed to backends.

use crate::{PrimPath, RenderTag};

/// A named, versioned set of root object paths plus a render-tag list.
///
/// Backends cache per-collection state keyed by `name`; `version` changes
/// whenever the root-path list changes so they know to rebuild it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Collection {
    /// Stable collection name.
    pub name: String,
    /// Root paths whose subtrees belong to the collection.
    pub root_paths: Vec<PrimPath>,
    /// Render tags the collection includes.
    pub render_tags: Vec<RenderTag>,
    /// Bumped each time `root_paths` changes.
    pub version: u64,
}

impl Collection {
    /// Version-zero collection.
    pub fn new(
        name: impl Into<String>,
        root_paths: Vec<PrimPath>,
        render_tags: Vec<RenderTag>,
    ) -> Self {
        Self {
            name: name.into(),
            root_paths,
            render_tags,
            version: 0,
        }
    }

    /// Returns `true` if `roots` equals this collection's root-path list.
    ///
    /// Order-sensitive, matching how backends compare collections.
    pub fn has_roots(&self, roots: &[PrimPath]) -> bool {
        self.root_paths == roots
    }

    /// Returns `true` if `path` lies under any root of the collection.
    pub fn contains_path(&self, path: &PrimPath) -> bool {
        self.root_paths.iter().any(|root| path.has_prefix(root))
    }

    /// Returns `true` if the collection includes `tag`.
    pub fn has_tag(&self, tag: &RenderTag) -> bool {
        self.render_tags.contains(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_paths_under_any_root() {
        let collection = Collection::new(
            "c",
            vec![PrimPath::from("/World/A"), PrimPath::from("/World/B")],
            vec![RenderTag::geometry()],
        );
        assert!(collection.contains_path(&PrimPath::from("/World/A/mesh")));
        assert!(collection.contains_path(&PrimPath::from("/World/B")));
        assert!(!collection.contains_path(&PrimPath::from("/World/C")));
    }

    #[test]
    fn root_comparison_is_order_sensitive() {
        let collection = Collection::new(
            "c",
            vec![PrimPath::from("/a"), PrimPath::from("/b")],
            Vec::new(),
        );
        assert!(collection.has_roots(&[PrimPath::from("/a"), PrimPath::from("/b")]));
        assert!(!collection.has_roots(&[PrimPath::from("/b"), PrimPath::from("/a")]));
    }
}
