// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error types for the batching engine.

use shapebatch_port::{AdapterId, BackendError, ViewportContext};
use thiserror::Error;

use crate::config::ConfigError;
use crate::gate::EventKind;

/// Registry misuse. Always a coding error on the host side; the registry is
/// left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The adapter reported [`AdapterId::NULL`].
    #[error("coding error: adapter with null identity in {context}")]
    InvalidAdapter {
        /// Context the adapter claimed.
        context: ViewportContext,
    },
    /// The identity is already registered under a different context.
    #[error("coding error: {id} is registered in {registered}, not {requested}")]
    ContextMismatch {
        /// Offending identity.
        id: AdapterId,
        /// Context holding the existing registration.
        registered: ViewportContext,
        /// Context the adapter now reports.
        requested: ViewportContext,
    },
    /// No adapter with this identity is registered in the context.
    #[error("{id} is not registered in {context}")]
    UnknownAdapter {
        /// Requested identity.
        id: AdapterId,
        /// Context searched.
        context: ViewportContext,
    },
}

/// A host event arrived out of order for the pass state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SequenceError {
    /// Selection requested before anything was drawn.
    #[error("select in {context} before any draw")]
    SelectBeforeRender {
        /// Context of the event.
        context: ViewportContext,
    },
    /// Selection requested before the pass that produced the image ended.
    #[error("select in {context} before the draw pass ended")]
    SelectBeforeEndOfPass {
        /// Context of the event.
        context: ViewportContext,
    },
    /// End-of-pass notification with no pass in flight.
    #[error("end-of-pass in {context} with no draw pass in flight")]
    EndOfPassWithoutRender {
        /// Context of the event.
        context: ViewportContext,
    },
    /// A render completion arrived with no render in flight.
    #[error("render completion in {context} with no render started")]
    RenderNotStarted {
        /// Context of the event.
        context: ViewportContext,
    },
    /// A stamp-gated context received an event without a frame stamp.
    #[error("{kind} event in {context} carries no frame stamp")]
    MissingStamp {
        /// Context of the event.
        context: ViewportContext,
        /// Kind of event.
        kind: EventKind,
    },
}

/// Umbrella error for host entry points.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Registry misuse.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Out-of-order host event.
    #[error(transparent)]
    Sequence(#[from] SequenceError),
    /// Backend failure during a render pass.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// Invalid or unreadable configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
