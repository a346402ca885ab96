// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identity and token types shared across the port.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Stable handle identifying a shape adapter for the lifetime of its registration.
///
/// `AdapterId::NULL` marks an adapter whose host object is gone; the engine
/// rejects it as a coding error.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AdapterId(pub u64);

impl AdapterId {
    /// The null identity. Never valid for registration.
    pub const NULL: Self = Self(0);

    /// Returns `true` unless this is [`AdapterId::NULL`].
    pub fn is_valid(self) -> bool {
        self != Self::NULL
    }
}

impl fmt::Display for AdapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "adapter#{}", self.0)
    }
}

/// One of the independent viewport front-ends sharing the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewportContext {
    /// Host viewport without a native per-pass frame stamp.
    Legacy,
    /// Host viewport that supplies a unique frame stamp per pass.
    Viewport2,
}

impl ViewportContext {
    /// Number of viewport contexts.
    pub const COUNT: usize = 2;

    /// All contexts in index order.
    pub const ALL: [Self; Self::COUNT] = [Self::Legacy, Self::Viewport2];

    /// Dense index for per-context tables.
    pub const fn index(self) -> usize {
        match self {
            Self::Legacy => 0,
            Self::Viewport2 => 1,
        }
    }
}

impl fmt::Display for ViewportContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Legacy => "legacy",
            Self::Viewport2 => "viewport2",
        })
    }
}

/// Opaque per-event token supplied by the host.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameStamp(pub u64);

/// Absolute, `/`-separated path of an object in the host scene.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrimPath(String);

impl PrimPath {
    /// Wrap a path string.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// The path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if `self` equals `root` or lies beneath it.
    ///
    /// `/World/foo` has prefix `/World` but `/Worldly` does not.
    pub fn has_prefix(&self, root: &Self) -> bool {
        let (path, root) = (self.0.as_str(), root.0.as_str());
        if root == "/" {
            return path.starts_with('/');
        }
        path.strip_prefix(root)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }
}

impl fmt::Display for PrimPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrimPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for PrimPath {
    fn from(path: String) -> Self {
        Self(path)
    }
}

/// Purpose tag filtering which geometry a pass or query sees.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenderTag(String);

impl RenderTag {
    /// Wrap a tag name.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Default purpose for renderable geometry.
    pub fn geometry() -> Self {
        Self::new("geometry")
    }

    /// Guide geometry (construction aids, not rendered in final output).
    pub fn guide() -> Self {
        Self::new("guide")
    }

    /// The tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Host identifier of a render pass within one refresh.
///
/// A viewport may draw the same pass more than once per refresh (for
/// example once per stereo eye); the engine draws each id once until the
/// refresh ends.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PassId(String);

impl PassId {
    /// Wrap a host pass identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_adapter_is_invalid() {
        assert!(!AdapterId::NULL.is_valid());
        assert!(AdapterId(7).is_valid());
    }

    #[test]
    fn context_indices_are_dense() {
        for (i, ctx) in ViewportContext::ALL.iter().enumerate() {
            assert_eq!(ctx.index(), i);
        }
    }

    #[test]
    fn prefix_respects_path_boundaries() {
        let root = PrimPath::from("/World");
        assert!(PrimPath::from("/World").has_prefix(&root));
        assert!(PrimPath::from("/World/Cube").has_prefix(&root));
        assert!(!PrimPath::from("/Worldly").has_prefix(&root));
        assert!(!PrimPath::from("/Other").has_prefix(&root));
        assert!(PrimPath::from("/Other").has_prefix(&PrimPath::from("/")));
    }
}
