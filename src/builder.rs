//! Assembly and validation of automata.
//!
//! `DfaBuilder` is the boundary between an external compiler front end and
//! the execution core. The front end declares states, prioritized edges, and
//! capture-group transition tables; `build` validates the structural
//! invariants the executor relies on and derives the per-state accelerators
//! (unified matchers, self-loop bulk scanners).

use smallvec::SmallVec;
use thiserror::Error;
use tracing::debug;

use crate::automaton::{CgState, Dfa, State, StateId, FLAG_ANCHORED_FINAL, FLAG_FINAL};
use crate::bytesearch::{ByteBitmap, LoopScan};
use crate::matchers::{Matcher, UnifiedMatcher};
use crate::transition::{LazyTransition, PartialTransition, TransitionId, RESULT_ROW};

/// Structural defects caught at build time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("no initial state set")]
    NoInitialState,

    #[error("capture tracking requires an entry transition for the initial state")]
    NoEntryTransition,

    #[error("entry transition {0} is not a predecessor of the initial state")]
    BadEntryTransition(TransitionId),

    #[error("state {0} does not exist")]
    UnknownState(StateId),

    #[error("transition {0} does not exist")]
    UnknownTransition(TransitionId),

    #[error("too many states")]
    TooManyStates,

    #[error("too many transitions")]
    TooManyTransitions,

    #[error("state {0} has too many outgoing edges")]
    TooManyEdges(StateId),

    #[error("state {state} has {transitions} capture transitions for {successors} successors")]
    MisalignedTransitions {
        state: StateId,
        transitions: usize,
        successors: usize,
    },

    #[error("state {0} is missing its capture-entry data")]
    MissingCaptureEntry(StateId),

    #[error("state {0} carries capture data but the automaton tracks no groups")]
    UnexpectedCaptureData(StateId),

    #[error("state {0} has an empty predecessor set")]
    NoPredecessors(StateId),

    #[error("transition {transition} has {arity} per-successor entries but state {state} has {successors} successors")]
    ArityMismatch {
        transition: TransitionId,
        state: StateId,
        arity: usize,
        successors: usize,
    },

    #[error("edge {state}:{slot} commits transition {transition}, which its target does not list as a predecessor")]
    UnlistedPredecessor {
        state: StateId,
        slot: u8,
        transition: TransitionId,
    },

    #[error("row {row} out of range for {rows} tracked rows")]
    RowOutOfRange { row: u8, rows: u8 },

    #[error("boundary slot {slot} out of range for {groups} groups")]
    SlotOutOfRange { slot: u16, groups: u16 },

    #[error("reorder of arity {arity} is not a permutation of {rows} rows")]
    BadReorder { arity: usize, rows: u8 },
}

struct StateInProgress {
    flags: u8,
    targets: SmallVec<[StateId; 4]>,
    matchers: SmallVec<[Matcher; 4]>,
    transitions: SmallVec<[TransitionId; 4]>,
    entry: Option<CaptureEntry>,
}

struct CaptureEntry {
    preceding: Box<[TransitionId]>,
    final_partial: PartialTransition,
    anchored_final_partial: PartialTransition,
}

/// Builder for a `Dfa`.
///
/// An automaton built with `groups == 0` is a plain recognizer: it reports
/// match extents only and must carry no capture data. With `groups > 0`
/// every state needs capture-entry data and every edge a transition id.
pub struct DfaBuilder {
    groups: u16,
    rows: u8,
    accelerate_loops: bool,
    states: Vec<StateInProgress>,
    lazy: Vec<LazyTransition>,
    initial: Option<StateId>,
    entry_transition: Option<TransitionId>,
}

impl DfaBuilder {
    /// Start an automaton tracking \p groups capture groups (group 0 is the
    /// overall match) across \p rows tracked rows.
    pub fn new(groups: u16, rows: u8) -> DfaBuilder {
        DfaBuilder {
            groups,
            rows,
            accelerate_loops: true,
            states: Vec::new(),
            lazy: Vec::new(),
            initial: None,
            entry_transition: None,
        }
    }

    /// Start a plain recognizer with no capture tracking.
    pub fn plain() -> DfaBuilder {
        DfaBuilder::new(0, 0)
    }

    /// Enable or disable the self-loop bulk scanners. On by default;
    /// disabling forces symbol-at-a-time stepping through loops.
    pub fn loop_acceleration(&mut self, enabled: bool) -> &mut Self {
        self.accelerate_loops = enabled;
        self
    }

    /// Declare a new state. \p flags is a combination of `FLAG_FINAL` and
    /// `FLAG_ANCHORED_FINAL`.
    pub fn add_state(&mut self, flags: u8) -> StateId {
        let id = self.states.len() as StateId;
        self.states.push(StateInProgress {
            flags: flags & (FLAG_FINAL | FLAG_ANCHORED_FINAL),
            targets: SmallVec::new(),
            matchers: SmallVec::new(),
            transitions: SmallVec::new(),
            entry: None,
        });
        id
    }

    /// Register a lazy transition and \return its id.
    pub fn add_transition(&mut self, transition: LazyTransition) -> TransitionId {
        let id = self.lazy.len() as TransitionId;
        self.lazy.push(transition);
        id
    }

    /// Append an edge to \p from, accepting bytes per \p matcher and leading
    /// to \p to. Edges are tested in the order they are added; the first
    /// match wins. \return the new edge's successor slot.
    pub fn add_edge(&mut self, from: StateId, matcher: Matcher, to: StateId) -> Result<u8, BuildError> {
        let state = self
            .states
            .get_mut(from as usize)
            .ok_or(BuildError::UnknownState(from))?;
        let slot = state.targets.len();
        state.targets.push(to);
        state.matchers.push(matcher);
        Ok(slot as u8)
    }

    /// Like `add_edge`, additionally recording \p transition as the id
    /// committed when the edge is taken. Required for every edge of a
    /// capture-tracking automaton.
    pub fn add_tracked_edge(
        &mut self,
        from: StateId,
        matcher: Matcher,
        to: StateId,
        transition: TransitionId,
    ) -> Result<u8, BuildError> {
        let slot = self.add_edge(from, matcher, to)?;
        self.states[from as usize].transitions.push(transition);
        Ok(slot)
    }

    /// Attach the capture-entry data of \p state: the transitions that can
    /// enter it and the two partial transitions applied to the result row
    /// when it finalizes.
    pub fn set_capture_entry(
        &mut self,
        state: StateId,
        preceding: Vec<TransitionId>,
        final_partial: PartialTransition,
        anchored_final_partial: PartialTransition,
    ) -> Result<(), BuildError> {
        let s = self
            .states
            .get_mut(state as usize)
            .ok_or(BuildError::UnknownState(state))?;
        s.entry = Some(CaptureEntry {
            preceding: preceding.into_boxed_slice(),
            final_partial,
            anchored_final_partial,
        });
        Ok(())
    }

    /// Declare \p state as the state every match attempt starts in.
    pub fn set_initial(&mut self, state: StateId) {
        self.initial = Some(state);
    }

    /// Declare the transition that virtually enters the initial state at the
    /// start of an attempt. Its per-successor effects seed the tracking data.
    pub fn set_entry_transition(&mut self, entering: TransitionId) {
        self.entry_transition = Some(entering);
    }

    fn check_partial(&self, partial: &PartialTransition) -> Result<(), BuildError> {
        let reorder = partial.reorder();
        if !reorder.is_empty() {
            if reorder.len() != self.rows as usize {
                return Err(BuildError::BadReorder {
                    arity: reorder.len(),
                    rows: self.rows,
                });
            }
            let mut seen = [false; 256];
            for &r in reorder {
                if r >= self.rows || seen[r as usize] {
                    return Err(BuildError::BadReorder {
                        arity: reorder.len(),
                        rows: self.rows,
                    });
                }
                seen[r as usize] = true;
            }
        }
        let row_ok = |row: u8| row == RESULT_ROW || row < self.rows;
        for copy in partial.copies() {
            for row in [copy.src, copy.dst] {
                if !row_ok(row) {
                    return Err(BuildError::RowOutOfRange { row, rows: self.rows });
                }
            }
        }
        for op in partial.ops() {
            if !row_ok(op.row) {
                return Err(BuildError::RowOutOfRange {
                    row: op.row,
                    rows: self.rows,
                });
            }
            if op.slot as u32 >= self.groups as u32 * 2 {
                return Err(BuildError::SlotOutOfRange {
                    slot: op.slot,
                    groups: self.groups,
                });
            }
        }
        Ok(())
    }

    fn check_lazy_table(&self) -> Result<(), BuildError> {
        for lazy in &self.lazy {
            for partial in lazy.all_partials() {
                self.check_partial(partial)?;
            }
        }
        Ok(())
    }

    /// Validate the automaton, derive the per-state accelerators, and
    /// produce the immutable `Dfa`.
    pub fn build(self) -> Result<Dfa, BuildError> {
        let tracks = self.groups > 0;
        let initial = self.initial.ok_or(BuildError::NoInitialState)?;
        if initial as usize >= self.states.len() {
            return Err(BuildError::UnknownState(initial));
        }
        if self.states.len() > StateId::MAX as usize {
            return Err(BuildError::TooManyStates);
        }
        if self.lazy.len() > TransitionId::MAX as usize {
            return Err(BuildError::TooManyTransitions);
        }
        self.check_lazy_table()?;

        for (id, s) in self.states.iter().enumerate() {
            let id = id as StateId;
            // u8::MAX is the unified matcher's "no edge" marker.
            if s.targets.len() >= u8::MAX as usize {
                return Err(BuildError::TooManyEdges(id));
            }
            for &t in &s.targets {
                if t as usize >= self.states.len() {
                    return Err(BuildError::UnknownState(t));
                }
            }
            if tracks {
                if s.transitions.len() != s.targets.len() {
                    return Err(BuildError::MisalignedTransitions {
                        state: id,
                        transitions: s.transitions.len(),
                        successors: s.targets.len(),
                    });
                }
                let entry = s.entry.as_ref().ok_or(BuildError::MissingCaptureEntry(id))?;
                if entry.preceding.is_empty() {
                    return Err(BuildError::NoPredecessors(id));
                }
                for &t in entry.preceding.iter() {
                    let lazy = self
                        .lazy
                        .get(t as usize)
                        .ok_or(BuildError::UnknownTransition(t))?;
                    if lazy.arity() != s.targets.len() {
                        return Err(BuildError::ArityMismatch {
                            transition: t,
                            state: id,
                            arity: lazy.arity(),
                            successors: s.targets.len(),
                        });
                    }
                }
                self.check_partial(&entry.final_partial)?;
                self.check_partial(&entry.anchored_final_partial)?;
            } else if s.entry.is_some() || !s.transitions.is_empty() {
                return Err(BuildError::UnexpectedCaptureData(id));
            }
        }

        // Edge wiring: the transition an edge commits must be one its target
        // accepts as a predecessor.
        if tracks {
            for (id, s) in self.states.iter().enumerate() {
                for (slot, (&target, &t)) in s.targets.iter().zip(&s.transitions).enumerate() {
                    let accepted = self.states[target as usize]
                        .entry
                        .as_ref()
                        .map(|e| e.preceding.contains(&t))
                        .unwrap_or(false);
                    if !accepted {
                        return Err(BuildError::UnlistedPredecessor {
                            state: id as StateId,
                            slot: slot as u8,
                            transition: t,
                        });
                    }
                }
            }
        }

        let entry_transition = if tracks {
            let entering = self.entry_transition.ok_or(BuildError::NoEntryTransition)?;
            let accepted = self.states[initial as usize]
                .entry
                .as_ref()
                .map(|e| e.preceding.contains(&entering))
                .unwrap_or(false);
            if !accepted {
                return Err(BuildError::BadEntryTransition(entering));
            }
            entering
        } else {
            0
        };

        let states: Vec<State> = self
            .states
            .into_iter()
            .enumerate()
            .map(|(id, s)| {
                let unified = (s.targets.len() >= 2).then(|| UnifiedMatcher::build(&s.matchers));
                let resolve = |b: u8| match unified {
                    Some(ref u) => u.lookup(b),
                    None => s.matchers.iter().position(|m| m.matches(b)).map(|i| i as u8),
                };
                let loop_to_self = s
                    .targets
                    .iter()
                    .position(|&t| t as usize == id)
                    .map(|i| i as u8);
                let mut loop_scan = None;
                let mut loop_exit_slot = None;
                if let (Some(loop_slot), true) = (loop_to_self, self.accelerate_loops) {
                    // A byte stays in the loop only if the self-loop edge is
                    // the one that wins; everything else exits.
                    let mut exits = ByteBitmap::default();
                    for b in 0..=255u8 {
                        if resolve(b) != Some(loop_slot) {
                            exits.set(b);
                        }
                    }
                    if s.targets.len() == 2 {
                        let other = 1 - loop_slot;
                        if (0..=255u8).all(|b| !exits.contains(b) || resolve(b) == Some(other)) {
                            loop_exit_slot = Some(other);
                        }
                    }
                    loop_scan = Some(LoopScan::from_exit_set(&exits));
                }
                State {
                    flags: s.flags,
                    successors: s.targets.into_vec().into_boxed_slice(),
                    matchers: s.matchers.into_vec().into_boxed_slice(),
                    unified,
                    loop_to_self,
                    loop_scan,
                    loop_exit_slot,
                    cg: s.entry.map(|e| CgState {
                        transitions: s.transitions.into_vec().into_boxed_slice(),
                        preceding: e.preceding,
                        final_partial: e.final_partial,
                        anchored_final_partial: e.anchored_final_partial,
                    }),
                }
            })
            .collect();

        debug!(
            states = states.len(),
            transitions = self.lazy.len(),
            groups = self.groups,
            rows = self.rows,
            "built automaton"
        );
        Ok(Dfa {
            states: states.into_boxed_slice(),
            lazy: self.lazy.into_boxed_slice(),
            initial,
            entry_transition,
            groups: self.groups,
            rows: self.rows,
        })
    }
}
