// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Batched shape rendering and selection resolution.
//!
//! Shape adapters registered with a [`BatchRenderer`] are bucketed by their
//! [`RenderParamsKey`](shapebatch_port::RenderParamsKey). Each draw callback
//! becomes at most one backend submission per viewport context and frame; each
//! selection callback at most one round of intersection queries, whose hits are
//! cached per owning adapter until the next render.
//!
//! The pieces are usable on their own:
//!
//! - [`BucketRegistry`]: adapter membership by render params.
//! - [`FrameGate`]: per-context, per-event deduplication.
//! - [`BatchExecutor`]: bucket flattening and the save/submit/restore pass.
//! - [`SelectionResolver`]: intersection queries into a [`SelectionCache`].

mod collections;
pub mod config;
mod error;
mod executor;
mod gate;
mod registry;
mod renderer;
mod selection;
mod state;

pub use collections::{
    adapter_collection_name, bucket_collection_name, bucket_collection_prefix, replace_contents,
    viewport_collection_name, CollectionTracker,
};
pub use config::{
    BatchConfig, ConfigError, ConfigService, ConfigStore, ContextConfig, EndOfPass,
    MemoryConfigStore, CONFIG_KEY, MAX_PICK_RESOLUTION,
};
pub use error::{BatchError, RegistryError, SequenceError};
pub use executor::BatchExecutor;
pub use gate::{EventKind, FrameGate, Gate, GateKind};
pub use registry::{AdapterHandle, Bucket, BucketRegistry, ContextBuckets};
pub use renderer::{BatchRenderer, DrawEvent, DrawOutcome, SelectEvent, SelectOutcome};
pub use selection::{
    SelectionCache, SelectionMode, SelectionReport, SelectionRequest, SelectionResolver,
};
pub use state::{PassEvent, PassState};
