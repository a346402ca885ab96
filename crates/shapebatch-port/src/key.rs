// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Render-parameter keys: the value that decides which bucket a shape draws in.

use core::fmt;

/// RGBA color with 8-bit components.
pub type ColorRgba8 = [u8; 4];

/// Shading style applied to a shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ShadingStyle {
    /// Smooth shaded surfaces.
    #[default]
    Smooth = 0,
    /// Flat shaded surfaces.
    Flat = 1,
    /// Wireframe only.
    Wireframe = 2,
    /// Shaded surfaces with a wireframe overlay.
    WireframeOnShaded = 3,
    /// Points only.
    Points = 4,
}

/// Basis used to evaluate curve primitives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum CurveBasis {
    /// Linear segments.
    Linear = 0,
    /// Cubic Bezier.
    Bezier = 1,
    /// Cubic B-spline.
    BSpline = 2,
    /// Catmull-Rom.
    CatmullRom = 3,
}

/// Every visual parameter that affects how a shape is drawn.
///
/// Two shapes with equal keys can be drawn by one backend submission. Keys are
/// built on demand from an adapter; a key computed earlier may be stale because
/// the host can toggle display modes between registrations.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RenderParamsKey {
    /// Surface shading style.
    pub shading: ShadingStyle,
    /// Whether scene lighting applies.
    pub lighting: bool,
    /// Wireframe color override, if any.
    pub wireframe_color: Option<ColorRgba8>,
    /// Curve basis for curve primitives, if the shape has curves.
    pub curve_basis: Option<CurveBasis>,
    /// Refinement (subdivision) level.
    pub refine_level: u8,
    /// Free-form tag distinguishing otherwise identical keys (e.g. a custom shader).
    pub tag: Option<String>,
}

impl RenderParamsKey {
    /// Smooth, lit, unrefined key.
    pub fn lit() -> Self {
        Self {
            lighting: true,
            ..Self::default()
        }
    }

    /// Replace the shading style.
    pub fn with_shading(mut self, shading: ShadingStyle) -> Self {
        self.shading = shading;
        self
    }

    /// Replace the wireframe color.
    pub fn with_wireframe_color(mut self, color: ColorRgba8) -> Self {
        self.wireframe_color = Some(color);
        self
    }

    /// Replace the curve basis.
    pub fn with_curve_basis(mut self, basis: CurveBasis) -> Self {
        self.curve_basis = Some(basis);
        self
    }

    /// Replace the refinement level.
    pub fn with_refine_level(mut self, level: u8) -> Self {
        self.refine_level = level;
        self
    }

    /// Replace the tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Stable content digest of this key.
    ///
    /// BLAKE3 over a fixed, versioned byte encoding, so the value is identical
    /// across processes and platforms (unlike `std::hash::Hash`).
    pub fn digest(&self) -> ParamsDigest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"shapebatch:render-params:v1\0");
        hasher.update(&[self.shading as u8, u8::from(self.lighting)]);
        match self.wireframe_color {
            Some(color) => {
                hasher.update(&[1]);
                hasher.update(&color);
            }
            None => {
                hasher.update(&[0]);
            }
        }
        match self.curve_basis {
            Some(basis) => hasher.update(&[1, basis as u8]),
            None => hasher.update(&[0]),
        };
        hasher.update(&[self.refine_level]);
        match &self.tag {
            Some(tag) => {
                hasher.update(&[1]);
                hasher.update(&(tag.len() as u64).to_le_bytes());
                hasher.update(tag.as_bytes());
            }
            None => {
                hasher.update(&[0]);
            }
        }
        ParamsDigest(*hasher.finalize().as_bytes())
    }
}

/// 32-byte BLAKE3 digest of a [`RenderParamsKey`].
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ParamsDigest(pub [u8; 32]);

impl ParamsDigest {
    /// First eight hex characters, for names and log lines.
    pub fn short(&self) -> String {
        self.0[..4].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for ParamsDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
