// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Port contract for the shape batching engine.
//!
//! This crate defines the seam between three parties:
//!
//! - **Hosts** own drawable objects and expose them as [`ShapeAdapter`]s.
//! - **The engine** (`shapebatch-core`) buckets adapters by [`RenderParamsKey`],
//!   gates redundant work per frame, and resolves picking.
//! - **Backends** implement [`RenderBackend`]: one batched submission per pass and
//!   one intersection query per [`Collection`].
//!
//! # Design Principles
//!
//! - **Backends are dumb**: They draw what they are handed and answer queries.
//!   Bucketing, deduplication and caching live in the engine.
//! - **No time ownership**: Frame stamps come from the host, never the backend.
//! - **Absence is not failure**: An empty [`HitSet`] means nothing was hit;
//!   [`BackendError`] is reserved for queries that could not run.

use thiserror::Error;

mod camera;
mod collection;
mod hit;
mod ident;
mod key;
mod port;

pub use camera::{CameraMatrices, Mat4, ViewportRect, IDENTITY};
pub use collection::Collection;
pub use hit::{nearest_hit, Hit, HitKey, HitSet};
pub use ident::{AdapterId, FrameStamp, PassId, PrimPath, RenderTag, ViewportContext};
pub use key::{ColorRgba8, CurveBasis, ParamsDigest, RenderParamsKey, ShadingStyle};
pub use port::{
    FixedCapabilities, HostCapabilities, IntersectMode, IntersectParams, RenderBackend,
    RenderSubmission, RenderWorkItem, ShapeAdapter,
};

/// Error type for render backend operations.
///
/// A backend returns these only when an operation could not execute. A query
/// that ran and found nothing returns an empty [`HitSet`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// An intersection query failed to execute.
    #[error("intersection query failed for collection {collection}: {reason}")]
    QueryFailed {
        /// Name of the collection being queried.
        collection: String,
        /// Backend-specific reason.
        reason: String,
    },
    /// A batched render submission failed.
    #[error("render submission failed: {0}")]
    SubmitFailed(String),
    /// Saving or restoring ambient render state failed.
    #[error("render state scope error: {0}")]
    StateScope(String),
}
