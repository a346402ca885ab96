// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-frame deduplication of render and selection work.
//!
//! Each (event kind, viewport context) pair owns one [`Gate`]. A stamp gate
//! opens whenever the host's frame stamp differs from the last committed one.
//! A flag gate opens while armed; opening disarms it and only
//! [`FrameGate::rearm`] arms it again. Both answer through the same
//! `bool`-returning [`FrameGate::update_if_changed`].
//!
//! Hosts that name their render passes also get per-pass dedup: a pass id
//! draws once per refresh, checked before the stamp gate.

use core::fmt;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use shapebatch_port::{FrameStamp, PassId, ViewportContext};
use tracing::debug;

/// Which kind of host event a gate deduplicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Draw callbacks.
    Render,
    /// Selection callbacks.
    Select,
}

impl EventKind {
    const fn index(self) -> usize {
        match self {
            Self::Render => 0,
            Self::Select => 1,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Render => "render",
            Self::Select => "select",
        })
    }
}

/// Gating strategy for a viewport context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    /// The host supplies a unique stamp per pass.
    Stamp,
    /// The host supplies no stamp; an explicit re-arm marks the next frame.
    Flag,
}

/// State of one gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gate {
    /// Last committed stamp, `None` when fresh or re-armed.
    Stamp {
        /// Last stamp that opened the gate.
        last: Option<FrameStamp>,
    },
    /// Whether the next event may pass.
    Flag {
        /// `true` until an event passes.
        armed: bool,
    },
}

impl Gate {
    /// Freshly constructed gate of `kind`. Fresh gates always open once.
    pub const fn new(kind: GateKind) -> Self {
        match kind {
            GateKind::Stamp => Self::Stamp { last: None },
            GateKind::Flag => Self::Flag { armed: true },
        }
    }

    /// Strategy of this gate.
    pub const fn kind(&self) -> GateKind {
        match self {
            Self::Stamp { .. } => GateKind::Stamp,
            Self::Flag { .. } => GateKind::Flag,
        }
    }

    fn update_if_changed(&mut self, stamp: Option<FrameStamp>) -> bool {
        match self {
            Self::Stamp { last } => {
                let Some(stamp) = stamp else {
                    return false;
                };
                if *last == Some(stamp) {
                    return false;
                }
                if last.is_some_and(|prev| stamp < prev) {
                    debug!(?stamp, previous = ?last, "frame stamp went backwards");
                }
                *last = Some(stamp);
                true
            }
            Self::Flag { armed } => core::mem::replace(armed, false),
        }
    }

    fn rearm(&mut self) {
        match self {
            Self::Stamp { last } => *last = None,
            Self::Flag { armed } => *armed = true,
        }
    }
}

/// Gates for every (event kind, viewport context) pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameGate {
    gates: [[Gate; 2]; ViewportContext::COUNT],
    drawn_passes: [FxHashSet<PassId>; ViewportContext::COUNT],
}

impl FrameGate {
    /// Build gates; `kinds` is indexed by [`ViewportContext::index`].
    ///
    /// Render and select gates of a context share its strategy.
    pub fn new(kinds: [GateKind; ViewportContext::COUNT]) -> Self {
        Self {
            gates: kinds.map(|kind| [Gate::new(kind), Gate::new(kind)]),
            drawn_passes: core::array::from_fn(|_| FxHashSet::default()),
        }
    }

    /// Returns `true` and commits if this event starts new work.
    ///
    /// Stamp gates compare `stamp` with the last committed one and never open
    /// without a stamp. Flag gates ignore `stamp`.
    pub fn update_if_changed(
        &mut self,
        kind: EventKind,
        context: ViewportContext,
        stamp: Option<FrameStamp>,
    ) -> bool {
        let opened = self.gate_mut(kind, context).update_if_changed(stamp);
        debug!(%kind, %context, ?stamp, opened, "frame gate");
        opened
    }

    /// Let the next event of `kind` in `context` through regardless of stamp.
    pub fn rearm(&mut self, kind: EventKind, context: ViewportContext) {
        self.gate_mut(kind, context).rearm();
    }

    /// Record `pass` as drawn in `context` for the current refresh.
    ///
    /// Returns `false` if it was already drawn.
    pub fn mark_pass_drawn(&mut self, context: ViewportContext, pass: &PassId) -> bool {
        let fresh = self.drawn_passes[context.index()].insert(pass.clone());
        if !fresh {
            debug!(%context, %pass, "render pass already drawn this refresh");
        }
        fresh
    }

    /// Forget the passes drawn in `context`; the refresh ended.
    pub fn clear_passes(&mut self, context: ViewportContext) {
        self.drawn_passes[context.index()].clear();
    }

    /// Current state of a gate.
    pub fn gate(&self, kind: EventKind, context: ViewportContext) -> Gate {
        self.gates[context.index()][kind.index()]
    }

    /// Strategy used by `context`.
    pub fn kind(&self, context: ViewportContext) -> GateKind {
        self.gates[context.index()][0].kind()
    }

    fn gate_mut(&mut self, kind: EventKind, context: ViewportContext) -> &mut Gate {
        &mut self.gates[context.index()][kind.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const V2: ViewportContext = ViewportContext::Viewport2;
    const LEGACY: ViewportContext = ViewportContext::Legacy;

    fn gates() -> FrameGate {
        FrameGate::new([GateKind::Flag, GateKind::Stamp])
    }

    #[test]
    fn stamp_gate_opens_once_per_stamp() {
        let mut gate = gates();
        assert!(gate.update_if_changed(EventKind::Render, V2, Some(FrameStamp(1))));
        assert!(!gate.update_if_changed(EventKind::Render, V2, Some(FrameStamp(1))));
        assert!(gate.update_if_changed(EventKind::Render, V2, Some(FrameStamp(2))));
    }

    #[test]
    fn stamp_gate_stays_shut_without_stamp() {
        let mut gate = gates();
        assert!(!gate.update_if_changed(EventKind::Render, V2, None));
    }

    #[test]
    fn regressing_stamp_counts_as_changed() {
        let mut gate = gates();
        assert!(gate.update_if_changed(EventKind::Select, V2, Some(FrameStamp(9))));
        assert!(gate.update_if_changed(EventKind::Select, V2, Some(FrameStamp(3))));
    }

    #[test]
    fn pass_ids_dedup_until_cleared() {
        let mut gate = gates();
        let left = PassId::new("left");
        assert!(gate.mark_pass_drawn(V2, &left));
        assert!(!gate.mark_pass_drawn(V2, &left));
        assert!(gate.mark_pass_drawn(V2, &PassId::new("right")));
        assert!(gate.mark_pass_drawn(LEGACY, &left));
        gate.clear_passes(V2);
        assert!(gate.mark_pass_drawn(V2, &left));
        assert!(!gate.mark_pass_drawn(LEGACY, &left));
    }

    #[test]
    fn flag_gate_opens_once_until_rearmed() {
        let mut gate = gates();
        assert!(gate.update_if_changed(EventKind::Render, LEGACY, None));
        assert!(!gate.update_if_changed(EventKind::Render, LEGACY, Some(FrameStamp(5))));
        gate.rearm(EventKind::Render, LEGACY);
        assert!(gate.update_if_changed(EventKind::Render, LEGACY, None));
    }

    #[test]
    fn rearmed_stamp_gate_accepts_same_stamp() {
        let mut gate = gates();
        assert!(gate.update_if_changed(EventKind::Select, V2, Some(FrameStamp(4))));
        gate.rearm(EventKind::Select, V2);
        assert!(gate.update_if_changed(EventKind::Select, V2, Some(FrameStamp(4))));
    }

    #[test]
    fn kinds_and_contexts_are_independent() {
        let mut gate = gates();
        assert!(gate.update_if_changed(EventKind::Render, V2, Some(FrameStamp(1))));
        assert!(gate.update_if_changed(EventKind::Select, V2, Some(FrameStamp(1))));
        assert!(gate.update_if_changed(EventKind::Render, LEGACY, None));
        assert!(gate.update_if_changed(EventKind::Select, LEGACY, None));
        assert_eq!(gate.kind(LEGACY), GateKind::Flag);
        assert_eq!(gate.kind(V2), GateKind::Stamp);
    }

    proptest! {
        #[test]
        fn same_stamp_opens_exactly_once(stamp in any::<u64>(), repeats in 1usize..64) {
            let mut gate = gates();
            let opened = (0..repeats)
                .filter(|_| gate.update_if_changed(EventKind::Render, V2, Some(FrameStamp(stamp))))
                .count();
            prop_assert_eq!(opened, 1);
        }

        #[test]
        fn flag_opens_exactly_once_without_rearm(repeats in 1usize..64) {
            let mut gate = gates();
            let opened = (0..repeats)
                .filter(|_| gate.update_if_changed(EventKind::Select, LEGACY, None))
                .count();
            prop_assert_eq!(opened, 1);
        }
    }
}
