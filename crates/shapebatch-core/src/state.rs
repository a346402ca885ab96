// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-context pass state machine.
//!
//! ```text
//! Idle --draw--> RenderPending --executed--> Rendered --end-of-pass--> SelectionPending
//!                     ^                                                       |
//!                     +------------- any draw ---------- SelectionComputed <--+ select
//! ```
//!
//! Events that do not fit the current state are rejected with a
//! [`SequenceError`] and leave the state unchanged.

use shapebatch_port::ViewportContext;

use crate::error::SequenceError;

/// Where a viewport context is in its draw/select cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PassState {
    /// Nothing drawn since construction or reset.
    #[default]
    Idle,
    /// A draw passed the gate; the batch is being executed.
    RenderPending,
    /// The batch executed; waiting for end-of-pass.
    Rendered,
    /// The pass ended; a selection may be computed.
    SelectionPending,
    /// Selection computed and cached for the current image.
    SelectionComputed,
}

/// Input to the pass state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassEvent {
    /// A draw passed the render gate.
    BeginRender,
    /// The batched submission returned (successfully or not).
    RenderExecuted,
    /// The pass ended (host notification or immediate).
    EndOfPass,
    /// A selection was computed.
    SelectionComputed,
    /// The shared selection cache was cleared by another context.
    CacheInvalidated,
}

impl PassState {
    /// Apply `event`, returning the next state.
    pub fn on(self, event: PassEvent, context: ViewportContext) -> Result<Self, SequenceError> {
        match (self, event) {
            (_, PassEvent::BeginRender) => Ok(Self::RenderPending),
            (Self::RenderPending, PassEvent::RenderExecuted) => Ok(Self::Rendered),
            (Self::Rendered, PassEvent::EndOfPass) => Ok(Self::SelectionPending),
            // Duplicate end-of-pass for a pass that already ended.
            (Self::SelectionPending | Self::SelectionComputed, PassEvent::EndOfPass) => Ok(self),
            (Self::Idle | Self::RenderPending, PassEvent::EndOfPass) => {
                Err(SequenceError::EndOfPassWithoutRender { context })
            }
            (_, PassEvent::SelectionComputed) => {
                self.ensure_selectable(context)?;
                Ok(Self::SelectionComputed)
            }
            (Self::SelectionComputed, PassEvent::CacheInvalidated) => Ok(Self::SelectionPending),
            (_, PassEvent::CacheInvalidated) => Ok(self),
            (_, PassEvent::RenderExecuted) => Err(SequenceError::RenderNotStarted { context }),
        }
    }

    /// Reject selection unless the drawn pass has ended.
    pub fn ensure_selectable(self, context: ViewportContext) -> Result<(), SequenceError> {
        match self {
            Self::SelectionPending | Self::SelectionComputed => Ok(()),
            Self::Rendered => Err(SequenceError::SelectBeforeEndOfPass { context }),
            Self::Idle | Self::RenderPending => Err(SequenceError::SelectBeforeRender { context }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTX: ViewportContext = ViewportContext::Viewport2;

    fn drive(events: &[PassEvent]) -> Result<PassState, SequenceError> {
        events
            .iter()
            .try_fold(PassState::Idle, |state, event| state.on(*event, CTX))
    }

    #[test]
    fn full_cycle() {
        let state = drive(&[
            PassEvent::BeginRender,
            PassEvent::RenderExecuted,
            PassEvent::EndOfPass,
            PassEvent::SelectionComputed,
        ]);
        assert_eq!(state, Ok(PassState::SelectionComputed));
    }

    #[test]
    fn draw_invalidates_selection() {
        let state = drive(&[
            PassEvent::BeginRender,
            PassEvent::RenderExecuted,
            PassEvent::EndOfPass,
            PassEvent::SelectionComputed,
            PassEvent::BeginRender,
        ]);
        assert_eq!(state, Ok(PassState::RenderPending));
    }

    #[test]
    fn select_before_draw_is_rejected() {
        assert_eq!(
            PassState::Idle.on(PassEvent::SelectionComputed, CTX),
            Err(SequenceError::SelectBeforeRender { context: CTX })
        );
    }

    #[test]
    fn select_before_end_of_pass_is_rejected() {
        assert_eq!(
            PassState::Rendered.ensure_selectable(CTX),
            Err(SequenceError::SelectBeforeEndOfPass { context: CTX })
        );
    }

    #[test]
    fn end_of_pass_without_draw_is_rejected() {
        assert_eq!(
            PassState::Idle.on(PassEvent::EndOfPass, CTX),
            Err(SequenceError::EndOfPassWithoutRender { context: CTX })
        );
    }

    #[test]
    fn completion_without_render_is_rejected() {
        for state in [PassState::Idle, PassState::Rendered, PassState::SelectionComputed] {
            assert_eq!(
                state.on(PassEvent::RenderExecuted, CTX),
                Err(SequenceError::RenderNotStarted { context: CTX })
            );
        }
    }

    #[test]
    fn duplicate_end_of_pass_is_harmless() {
        assert_eq!(
            PassState::SelectionComputed.on(PassEvent::EndOfPass, CTX),
            Ok(PassState::SelectionComputed)
        );
    }

    #[test]
    fn invalidation_demotes_only_computed_selection() {
        assert_eq!(
            PassState::SelectionComputed.on(PassEvent::CacheInvalidated, CTX),
            Ok(PassState::SelectionPending)
        );
        assert_eq!(
            PassState::Rendered.on(PassEvent::CacheInvalidated, CTX),
            Ok(PassState::Rendered)
        );
    }
}
