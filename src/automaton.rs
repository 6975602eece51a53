//! The immutable automaton arena.
//!
//! A `Dfa` owns a flat array of states; every edge is an index into that
//! array, which represents the cyclic transition graph without reference
//! counting. Nothing here is mutated after `DfaBuilder::build` returns, so a
//! `Dfa` may be shared freely across threads; all per-match mutable state
//! lives in the executor's locals.

use crate::bytesearch::LoopScan;
use crate::matchers::{Matcher, UnifiedMatcher};
use crate::transition::{LazyTransition, PartialTransition, TransitionId};

/// Identifier of a state in the automaton arena.
pub type StateId = u16;

/// State flag: reaching this state constitutes a match.
pub const FLAG_FINAL: u8 = 1 << 0;

/// State flag: reaching this state constitutes a match, but only with the
/// cursor at the true end of the input.
pub const FLAG_ANCHORED_FINAL: u8 = 1 << 1;

/// The capture-tracking side of a state.
#[derive(Debug)]
pub(crate) struct CgState {
    /// Transition committed when leaving through each successor slot.
    /// Aligned 1:1 with the state's successors.
    pub(crate) transitions: Box<[TransitionId]>,

    /// Every transition that can enter this state. With a single entry the
    /// executor skips the predecessor dispatch.
    pub(crate) preceding: Box<[TransitionId]>,

    /// Applied to the result row when this state finalizes unanchored.
    pub(crate) final_partial: PartialTransition,

    /// Applied to the result row when this state finalizes anchored.
    pub(crate) anchored_final_partial: PartialTransition,
}

/// One DFA state: flags, prioritized outgoing edges, and the accelerators
/// derived for it at build time.
#[derive(Debug)]
pub struct State {
    pub(crate) flags: u8,
    pub(crate) successors: Box<[StateId]>,
    pub(crate) matchers: Box<[Matcher]>,
    pub(crate) unified: Option<UnifiedMatcher>,

    /// Slot of the edge looping back to this state, if any.
    pub(crate) loop_to_self: Option<u8>,

    /// Bulk scanner for the bytes that leave the self-loop.
    pub(crate) loop_scan: Option<LoopScan>,

    /// When the self-looping state has exactly one alternative edge and that
    /// edge accepts every loop-exiting byte, its slot; the executor then
    /// leaves the loop without re-testing matchers.
    pub(crate) loop_exit_slot: Option<u8>,

    pub(crate) cg: Option<CgState>,
}

impl State {
    #[inline(always)]
    pub fn is_final(&self) -> bool {
        self.flags & FLAG_FINAL != 0
    }

    #[inline(always)]
    pub fn is_anchored_final(&self) -> bool {
        self.flags & FLAG_ANCHORED_FINAL != 0
    }

    /// \return the state entered through successor slot \p slot.
    #[inline(always)]
    pub(crate) fn successor(&self, slot: u8) -> StateId {
        self.successors[slot as usize]
    }

    /// \return the slot of the first outgoing edge accepting \p b, or None.
    #[inline(always)]
    pub(crate) fn match_symbol(&self, b: u8) -> Option<u8> {
        match self.unified {
            Some(ref unified) => unified.lookup(b),
            None => self.matchers.iter().position(|m| m.matches(b)).map(|i| i as u8),
        }
    }

    #[inline(always)]
    pub(crate) fn loop_to_self(&self) -> Option<u8> {
        self.loop_to_self
    }

    #[inline(always)]
    pub(crate) fn loop_scan(&self) -> Option<&LoopScan> {
        self.loop_scan.as_ref()
    }

    #[inline(always)]
    pub(crate) fn loop_exit_slot(&self) -> Option<u8> {
        self.loop_exit_slot
    }

    #[inline(always)]
    pub(crate) fn cg(&self) -> Option<&CgState> {
        self.cg.as_ref()
    }
}

/// A compiled automaton, ready to execute. Immutable and shareable.
#[derive(Debug)]
pub struct Dfa {
    pub(crate) states: Box<[State]>,
    pub(crate) lazy: Box<[LazyTransition]>,
    pub(crate) initial: StateId,
    pub(crate) entry_transition: TransitionId,
    pub(crate) groups: u16,
    pub(crate) rows: u8,
}

impl Dfa {
    #[inline(always)]
    pub(crate) fn state(&self, id: StateId) -> &State {
        &self.states[id as usize]
    }

    #[inline(always)]
    pub(crate) fn lazy(&self, id: TransitionId) -> &LazyTransition {
        &self.lazy[id as usize]
    }

    #[inline(always)]
    pub(crate) fn initial(&self) -> StateId {
        self.initial
    }

    #[inline(always)]
    pub(crate) fn entry_transition(&self) -> TransitionId {
        self.entry_transition
    }

    /// \return whether this automaton tracks capture-group boundaries.
    #[inline(always)]
    pub fn tracks_captures(&self) -> bool {
        self.groups > 0
    }

    /// \return the number of capture groups reported per match. Group 0 is
    /// the overall match and is always present.
    pub fn group_count(&self) -> usize {
        if self.tracks_captures() {
            self.groups as usize
        } else {
            1
        }
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    #[inline(always)]
    pub(crate) fn groups(&self) -> u16 {
        self.groups
    }

    #[inline(always)]
    pub(crate) fn rows(&self) -> u8 {
        self.rows
    }
}
