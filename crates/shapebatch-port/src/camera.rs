// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Camera and viewport values handed to backends.

/// Column-major 4x4 matrix.
pub type Mat4 = [f32; 16];

/// The 4x4 identity matrix.
pub const IDENTITY: Mat4 = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// View and projection matrices for a draw or selection event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraMatrices {
    /// World-to-view transform.
    pub view: Mat4,
    /// View-to-clip transform.
    ///
    /// For selection events this is the pick-restricted projection supplied by
    /// the host, not the full viewport projection.
    pub projection: Mat4,
}

impl CameraMatrices {
    /// Build camera matrices from explicit view and projection.
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        Self { view, projection }
    }
}

impl Default for CameraMatrices {
    fn default() -> Self {
        Self {
            view: IDENTITY,
            projection: IDENTITY,
        }
    }
}

/// Pixel rectangle of the viewport being drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewportRect {
    /// Left edge in pixels.
    pub x: i32,
    /// Bottom edge in pixels.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ViewportRect {
    /// Viewport anchored at the origin.
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Returns `true` if the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
