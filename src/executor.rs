//! The state-stepping core.
//!
//! One `Executor` drives one match attempt: starting in the automaton's
//! initial state, it repeatedly asks the current state to find a successor,
//! following the returned slot until a state reports none. Each
//! `find_successor` call may consume many symbols when the state loops to
//! itself; self-looping states on forward scans hand the symbol loop to a
//! vectorized bulk scanner and afterwards reconcile the capture-group
//! bookkeeping for the span it skipped, so that acceleration is invisible in
//! the results.
//!
//! Capture bookkeeping is lazy: the updates for entering a state are not
//! known until the state is left, because the edge taken out selects which
//! partial transition applies. The executor therefore carries the id of the
//! transition that entered the current state and resolves it against the
//! exit slot on every commit. Every partial is applied at the position the
//! current state was entered, which is the cursor index at commit time.

use core::marker::PhantomData;

use crate::automaton::{CgState, Dfa, State};
use crate::bytesearch::LoopScan;
use crate::cursor::Direction;
use crate::dispatch;
use crate::input::Input;
use crate::transition::{Export, TrackingData, TransitionId};

/// The raw outcome of a successful attempt: exported boundary cells, two per
/// group, `NOT_SET` where a group did not participate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawMatch {
    pub(crate) boundaries: Box<[i32]>,
    pub(crate) export: Export,
}

/// Mutable state of one attempt. Never outlives it.
struct Locals {
    index: usize,
    last_index: usize,
    last_transition: TransitionId,
    successor: Option<u8>,
    matched: bool,
    matched_at: Option<usize>,
    cg: TrackingData,
}

impl Locals {
    fn new(start: usize, entering: TransitionId, cg: TrackingData) -> Locals {
        Locals {
            index: start,
            last_index: start,
            last_transition: entering,
            successor: None,
            matched: false,
            matched_at: None,
            cg,
        }
    }
}

/// A single match attempt over one input window.
///
/// With `searching` set, every visit to a final state records a provisional
/// result, so the attempt yields the greedy (longest) match from its start
/// position. Without it, a result is recorded only with the cursor at the
/// end of the window, and only the overall extent is exported; this is the
/// cheap mode for callers that already know the match boundaries.
pub(crate) struct Executor<'d, 'i, Dir: Direction> {
    dfa: &'d Dfa,
    input: Input<'i>,
    searching: bool,
    _dir: PhantomData<Dir>,
}

impl<'d, 'i, Dir: Direction> Executor<'d, 'i, Dir> {
    pub(crate) fn new(dfa: &'d Dfa, input: Input<'i>, searching: bool) -> Self {
        Executor {
            dfa,
            input,
            searching,
            _dir: PhantomData,
        }
    }

    /// Run the attempt from \p start. \return the exported result, or None
    /// if no match was found.
    pub(crate) fn run(&self, start: usize) -> Option<RawMatch> {
        if self.input.len() > i32::MAX as usize {
            tracing::warn!(len = self.input.len(), "input exceeds the addressable range");
            return None;
        }
        debug_assert!(self.input.from() <= start && start <= self.input.to());
        tracing::trace!(start, searching = self.searching, forward = Dir::FORWARD, "match attempt");
        if self.dfa.tracks_captures() {
            self.run_tracking(start)
        } else {
            self.run_plain(start)
        }
    }

    #[inline(always)]
    fn advance(&self, locals: &mut Locals) {
        locals.last_index = locals.index;
        if Dir::FORWARD {
            locals.index += 1;
        } else {
            locals.index -= 1;
        }
    }

    fn run_tracking(&self, start: usize) -> Option<RawMatch> {
        let cg = TrackingData::new(self.dfa.rows(), self.dfa.groups());
        let mut locals = Locals::new(start, self.dfa.entry_transition(), cg);
        let mut state_id = self.dfa.initial();
        loop {
            let state = self.dfa.state(state_id);
            let Some(cgs) = state.cg() else {
                debug_assert!(false, "Tracking automaton with an untracked state");
                return None;
            };
            self.find_successor_tracking(state, cgs, &mut locals);
            match locals.successor.take() {
                Some(slot) => state_id = state.successor(slot),
                None => break,
            }
        }
        if !locals.matched {
            return None;
        }
        let export = if self.searching {
            Export::Groups
        } else {
            Export::WholeMatchOnly
        };
        locals.cg.export_result(export);
        let (cells, export) = locals.cg.exported()?;
        Some(RawMatch {
            boundaries: Box::from(cells),
            export,
        })
    }

    fn run_plain(&self, start: usize) -> Option<RawMatch> {
        let mut locals = Locals::new(start, 0, TrackingData::empty());
        let mut state_id = self.dfa.initial();
        loop {
            let state = self.dfa.state(state_id);
            self.find_successor_plain(state, &mut locals);
            match locals.successor.take() {
                Some(slot) => state_id = state.successor(slot),
                None => break,
            }
        }
        let end = locals.matched_at?;
        let (lo, hi) = if Dir::FORWARD { (start, end) } else { (end, start) };
        Some(RawMatch {
            boundaries: vec![lo as i32, hi as i32].into_boxed_slice(),
            export: Export::Groups,
        })
    }

    /// Commit the exit through \p slot: apply the entering edge's deferred
    /// partial for it, record the newly pending transition, and consume the
    /// symbol.
    #[inline(always)]
    fn commit(&self, cgs: &CgState, locals: &mut Locals, slot: u8) {
        let lazy = dispatch::entering(self.dfa, cgs, locals.last_transition);
        lazy.partial(slot).apply(&mut locals.cg, locals.index as i32);
        locals.last_transition = cgs.transitions[slot as usize];
        self.advance(locals);
    }

    /// Record a provisional result in a final state mid-input. A later,
    /// longer record overwrites it; that is what makes searching greedy.
    fn record_provisional(&self, cgs: &CgState, locals: &mut Locals) {
        let lazy = dispatch::entering(self.dfa, cgs, locals.last_transition);
        let at = locals.index as i32;
        lazy.to_final().apply(&mut locals.cg, at);
        cgs.final_partial.apply(&mut locals.cg, at);
        locals.matched = true;
    }

    fn at_end_tracking(&self, state: &State, cgs: &CgState, locals: &mut Locals) {
        let lazy = dispatch::entering(self.dfa, cgs, locals.last_transition);
        let at = locals.index as i32;
        if state.is_anchored_final() && self.input.at_true_end::<Dir>(locals.index) {
            lazy.to_anchored_final().apply(&mut locals.cg, at);
            cgs.anchored_final_partial.apply(&mut locals.cg, at);
            locals.matched = true;
        } else if state.is_final() {
            lazy.to_final().apply(&mut locals.cg, at);
            cgs.final_partial.apply(&mut locals.cg, at);
            locals.matched = true;
        }
        locals.successor = None;
    }

    fn find_successor_tracking(&self, state: &State, cgs: &CgState, locals: &mut Locals) {
        if self.searching && state.is_final() {
            self.record_provisional(cgs, locals);
        }
        if !self.input.has_next::<Dir>(locals.index) {
            self.at_end_tracking(state, cgs, locals);
            return;
        }
        let Some(slot) = state.match_symbol(self.input.read::<Dir>(locals.index)) else {
            self.advance(locals);
            locals.successor = None;
            return;
        };
        self.commit(cgs, locals, slot);
        if state.loop_to_self() != Some(slot) {
            locals.successor = Some(slot);
            return;
        }
        let loop_slot = slot;
        if Dir::FORWARD {
            if let Some(scan) = state.loop_scan() {
                self.run_loop_scan_tracking(state, cgs, locals, loop_slot, scan);
                return;
            }
        }
        // Symbol-at-a-time loop; mirrors one find_successor call per symbol.
        loop {
            if self.searching && state.is_final() {
                self.record_provisional(cgs, locals);
            }
            if !self.input.has_next::<Dir>(locals.index) {
                self.at_end_tracking(state, cgs, locals);
                return;
            }
            let Some(slot) = state.match_symbol(self.input.read::<Dir>(locals.index)) else {
                self.advance(locals);
                locals.successor = None;
                return;
            };
            self.commit(cgs, locals, slot);
            if slot != loop_slot {
                locals.successor = Some(slot);
                return;
            }
        }
    }

    /// Bulk-skip the self-loop, then reconcile the capture bookkeeping so
    /// the results match the symbol-at-a-time walk exactly.
    fn run_loop_scan_tracking(
        &self,
        state: &State,
        cgs: &CgState,
        locals: &mut Locals,
        loop_slot: u8,
        scan: &LoopScan,
    ) {
        debug_assert!(Dir::FORWARD);
        let exit = self.input.find_loop_exit(scan, locals.index);
        let stop = exit.unwrap_or_else(|| self.input.to());
        self.apply_loop_span(cgs, locals, loop_slot, stop);
        // The skipped provisional records were all overwritten by later
        // ones; only the record at the stopping position survives.
        if self.searching && state.is_final() {
            self.record_provisional(cgs, locals);
        }
        let Some(exit_at) = exit else {
            self.at_end_tracking(state, cgs, locals);
            return;
        };
        debug_assert_eq!(locals.index, exit_at, "Fast scan left the cursor misaligned");
        let slot = match state.loop_exit_slot() {
            Some(direct) => Some(direct),
            None => state.match_symbol(self.input.read::<Dir>(locals.index)),
        };
        match slot {
            Some(slot) => {
                debug_assert_ne!(Some(slot), state.loop_to_self());
                self.commit(cgs, locals, slot);
                locals.successor = Some(slot);
            }
            None => {
                self.advance(locals);
                locals.successor = None;
            }
        }
    }

    /// Apply the loop commits for every skipped position in `index..stop`.
    /// Each skipped step would have re-entered through the self-loop edge,
    /// so the pending transition is already the loop's own and one partial
    /// covers the whole span. If it reorders rows it must be replayed per
    /// position in scan order; otherwise applying it once at the last
    /// position is equivalent.
    fn apply_loop_span(&self, cgs: &CgState, locals: &mut Locals, loop_slot: u8, stop: usize) {
        debug_assert!(Dir::FORWARD && locals.index <= stop);
        if locals.index >= stop {
            return;
        }
        debug_assert_eq!(locals.last_transition, cgs.transitions[loop_slot as usize]);
        let lazy = dispatch::entering(self.dfa, cgs, locals.last_transition);
        let partial = lazy.partial(loop_slot);
        if partial.does_reorder_results() {
            for at in locals.index..stop {
                partial.apply(&mut locals.cg, at as i32);
            }
        } else {
            partial.apply(&mut locals.cg, (stop - 1) as i32);
        }
        locals.last_index = stop - 1;
        locals.index = stop;
    }

    fn at_end_plain(&self, state: &State, locals: &mut Locals) {
        if (state.is_anchored_final() && self.input.at_true_end::<Dir>(locals.index))
            || state.is_final()
        {
            locals.matched_at = Some(locals.index);
        }
        locals.successor = None;
    }

    fn find_successor_plain(&self, state: &State, locals: &mut Locals) {
        if self.searching && state.is_final() {
            locals.matched_at = Some(locals.index);
        }
        if !self.input.has_next::<Dir>(locals.index) {
            self.at_end_plain(state, locals);
            return;
        }
        let Some(slot) = state.match_symbol(self.input.read::<Dir>(locals.index)) else {
            self.advance(locals);
            locals.successor = None;
            return;
        };
        self.advance(locals);
        if state.loop_to_self() != Some(slot) {
            locals.successor = Some(slot);
            return;
        }
        let loop_slot = slot;
        if Dir::FORWARD {
            if let Some(scan) = state.loop_scan() {
                let exit = self.input.find_loop_exit(scan, locals.index);
                let stop = exit.unwrap_or_else(|| self.input.to());
                if stop > locals.index {
                    locals.last_index = stop - 1;
                    locals.index = stop;
                }
                if self.searching && state.is_final() {
                    locals.matched_at = Some(locals.index);
                }
                if exit.is_none() {
                    self.at_end_plain(state, locals);
                    return;
                }
                let slot = match state.loop_exit_slot() {
                    Some(direct) => Some(direct),
                    None => state.match_symbol(self.input.read::<Dir>(locals.index)),
                };
                self.advance(locals);
                locals.successor = slot;
                return;
            }
        }
        loop {
            if self.searching && state.is_final() {
                locals.matched_at = Some(locals.index);
            }
            if !self.input.has_next::<Dir>(locals.index) {
                self.at_end_plain(state, locals);
                return;
            }
            let Some(slot) = state.match_symbol(self.input.read::<Dir>(locals.index)) else {
                self.advance(locals);
                locals.successor = None;
                return;
            };
            self.advance(locals);
            if slot != loop_slot {
                locals.successor = Some(slot);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::{StateId, FLAG_ANCHORED_FINAL, FLAG_FINAL};
    use crate::builder::DfaBuilder;
    use crate::cursor::{Backward, Forward};
    use crate::matchers::Matcher;
    use crate::transition::{BoundaryOp, LazyTransition, PartialTransition, RowCopy, RESULT_ROW};

    fn update(row: u8, slot: u16) -> BoundaryOp {
        BoundaryOp { row, slot }
    }

    fn copy_to_result(src: u8) -> PartialTransition {
        PartialTransition::new(vec![], vec![RowCopy { src, dst: RESULT_ROW }], vec![], vec![])
    }

    fn run_fwd(dfa: &Dfa, input: &[u8], searching: bool, start: usize) -> Option<RawMatch> {
        Executor::<Forward>::new(dfa, Input::new(input), searching).run(start)
    }

    /// `a` then `b*` into a final state, tracking group 0 across one row.
    /// With \p accel disabled the loop runs symbol at a time.
    fn b_star_machine(accel: bool) -> Dfa {
        let mut b = DfaBuilder::new(1, 1);
        b.loop_acceleration(accel);
        let s0 = b.add_state(0);
        let s1 = b.add_state(FLAG_FINAL);
        let stamp_start = PartialTransition::new(vec![], vec![], vec![update(0, 0)], vec![]);
        let t_entry = b.add_transition(LazyTransition::new(
            vec![stamp_start],
            PartialTransition::none(),
            PartialTransition::none(),
        ));
        let t1 = b.add_transition(LazyTransition::new(
            vec![PartialTransition::none()],
            copy_to_result(0),
            PartialTransition::none(),
        ));
        let tl = b.add_transition(LazyTransition::new(
            vec![PartialTransition::none()],
            copy_to_result(0),
            PartialTransition::none(),
        ));
        b.add_tracked_edge(s0, Matcher::Byte(b'a'), s1, t1).unwrap();
        b.add_tracked_edge(s1, Matcher::Byte(b'b'), s1, tl).unwrap();
        b.set_capture_entry(s0, vec![t_entry], PartialTransition::none(), PartialTransition::none())
            .unwrap();
        b.set_capture_entry(
            s1,
            vec![t1, tl],
            PartialTransition::new(vec![], vec![], vec![update(RESULT_ROW, 1)], vec![]),
            PartialTransition::none(),
        )
        .unwrap();
        b.set_initial(s0);
        b.set_entry_transition(t_entry);
        b.build().unwrap()
    }

    /// Two tracked rows swapped on every loop iteration, with a stamp that
    /// lands on alternating physical rows. Distinguishes per-position replay
    /// from a single coalesced application.
    fn swapping_machine(accel: bool) -> Dfa {
        let mut b = DfaBuilder::new(2, 2);
        b.loop_acceleration(accel);
        let s0 = b.add_state(0);
        let s1 = b.add_state(FLAG_FINAL);
        let seed = PartialTransition::new(vec![], vec![], vec![update(0, 0), update(1, 0)], vec![]);
        let swap_and_stamp = || {
            PartialTransition::new(vec![1, 0], vec![], vec![update(0, 2), update(1, 3)], vec![])
        };
        let t_entry = b.add_transition(LazyTransition::new(
            vec![seed],
            PartialTransition::none(),
            PartialTransition::none(),
        ));
        let t1 = b.add_transition(LazyTransition::new(
            vec![swap_and_stamp()],
            copy_to_result(0),
            PartialTransition::none(),
        ));
        let tl = b.add_transition(LazyTransition::new(
            vec![swap_and_stamp()],
            copy_to_result(0),
            PartialTransition::none(),
        ));
        b.add_tracked_edge(s0, Matcher::Byte(b'a'), s1, t1).unwrap();
        b.add_tracked_edge(s1, Matcher::Byte(b'a'), s1, tl).unwrap();
        b.set_capture_entry(s0, vec![t_entry], PartialTransition::none(), PartialTransition::none())
            .unwrap();
        b.set_capture_entry(
            s1,
            vec![t1, tl],
            PartialTransition::new(vec![], vec![], vec![update(RESULT_ROW, 1)], vec![]),
            PartialTransition::none(),
        )
        .unwrap();
        b.set_initial(s0);
        b.set_entry_transition(t_entry);
        b.build().unwrap()
    }

    #[test]
    fn greedy_loop_tracking() {
        let dfa = b_star_machine(true);
        let m = run_fwd(&dfa, b"abbbc", true, 0).unwrap();
        assert_eq!(&*m.boundaries, &[0, 4]);
        assert_eq!(m.export, Export::Groups);
        // A single 'a' matches without entering the loop body.
        let m = run_fwd(&dfa, b"ax", true, 0).unwrap();
        assert_eq!(&*m.boundaries, &[0, 1]);
    }

    #[test]
    fn fast_scan_is_transparent() {
        let accel = b_star_machine(true);
        let naive = b_star_machine(false);
        let inputs: &[&[u8]] = &[
            b"a", b"ab", b"abb", b"abbbbbbbb", b"abbbc", b"abbbbbbbbbbbbc", b"x", b"", b"ba",
        ];
        for input in inputs {
            assert_eq!(
                run_fwd(&accel, input, true, 0),
                run_fwd(&naive, input, true, 0),
                "diverged on {:?}",
                input
            );
        }
    }

    #[test]
    fn reordering_loops_replay_per_position() {
        let accel = swapping_machine(true);
        let naive = swapping_machine(false);
        for len in 1..=8 {
            let input = vec![b'a'; len];
            assert_eq!(
                run_fwd(&accel, &input, true, 0),
                run_fwd(&naive, &input, true, 0),
                "diverged on {} symbols",
                len
            );
        }
        // Pinned against a hand trace: entry stamps both rows' slot 0 at 0;
        // each iteration swaps rows then stamps logical row 0 slot 2 and
        // logical row 1 slot 3 at the entry position of that iteration.
        let m = run_fwd(&accel, b"aaaa", true, 0).unwrap();
        assert_eq!(&*m.boundaries, &[0, 4, 3, 2]);
        let m = run_fwd(&accel, b"aaa", true, 0).unwrap();
        assert_eq!(&*m.boundaries, &[0, 3, 2, 1]);
    }

    #[test]
    fn loop_exit_taken_without_retesting() {
        // a+ then any byte finishes; the loop's lone alternative covers every
        // exiting byte, so the build derives a direct exit slot.
        let mut b = DfaBuilder::new(1, 1);
        let s0 = b.add_state(0);
        let s1 = b.add_state(0);
        let s2 = b.add_state(FLAG_FINAL);
        let stamp_start = PartialTransition::new(vec![], vec![], vec![update(0, 0)], vec![]);
        let t_entry = b.add_transition(LazyTransition::new(
            vec![stamp_start],
            PartialTransition::none(),
            PartialTransition::none(),
        ));
        let t1 = b.add_transition(LazyTransition::new(
            vec![PartialTransition::none(), PartialTransition::none()],
            PartialTransition::none(),
            PartialTransition::none(),
        ));
        let tl = b.add_transition(LazyTransition::new(
            vec![PartialTransition::none(), PartialTransition::none()],
            PartialTransition::none(),
            PartialTransition::none(),
        ));
        let t2 = b.add_transition(LazyTransition::new(
            vec![],
            copy_to_result(0),
            PartialTransition::none(),
        ));
        b.add_tracked_edge(s0, Matcher::Byte(b'a'), s1, t1).unwrap();
        b.add_tracked_edge(s1, Matcher::Byte(b'a'), s1, tl).unwrap();
        b.add_tracked_edge(s1, Matcher::Any, s2, t2).unwrap();
        b.set_capture_entry(s0, vec![t_entry], PartialTransition::none(), PartialTransition::none())
            .unwrap();
        b.set_capture_entry(s1, vec![t1, tl], PartialTransition::none(), PartialTransition::none())
            .unwrap();
        b.set_capture_entry(
            s2,
            vec![t2],
            PartialTransition::new(vec![], vec![], vec![update(RESULT_ROW, 1)], vec![]),
            PartialTransition::none(),
        )
        .unwrap();
        b.set_initial(s0);
        b.set_entry_transition(t_entry);
        let dfa = b.build().unwrap();
        assert_eq!(dfa.state(s1 as StateId).loop_exit_slot(), Some(1));

        let m = run_fwd(&dfa, b"aaax", true, 0).unwrap();
        assert_eq!(&*m.boundaries, &[0, 4]);
        // Loop runs to the end of input without an exit byte: no match, the
        // trailing symbol is required.
        assert!(run_fwd(&dfa, b"aaa", true, 0).is_none());
    }

    #[test]
    fn no_match_is_not_an_error() {
        let dfa = b_star_machine(true);
        assert!(run_fwd(&dfa, b"zzz", true, 0).is_none());
        assert!(run_fwd(&dfa, b"", true, 0).is_none());
        assert!(run_fwd(&dfa, b"b", true, 0).is_none());
    }

    #[test]
    fn non_searching_exports_whole_match_only() {
        let dfa = b_star_machine(true);
        let m = Executor::<Forward>::new(&dfa, Input::with_bounds(b"xabb", 1, 4), false)
            .run(1)
            .unwrap();
        assert_eq!(m.export, Export::WholeMatchOnly);
        assert_eq!(&*m.boundaries, &[1, 4]);
        // Without searching, stopping short of the window end records nothing.
        assert!(
            Executor::<Forward>::new(&dfa, Input::with_bounds(b"abbz", 0, 4), false)
                .run(0)
                .is_none()
        );
    }

    #[test]
    fn backward_scan() {
        let mut b = DfaBuilder::plain();
        let s0 = b.add_state(0);
        let s1 = b.add_state(0);
        let s2 = b.add_state(FLAG_FINAL);
        // Consumed right to left this accepts "ab".
        b.add_edge(s0, Matcher::Byte(b'b'), s1).unwrap();
        b.add_edge(s1, Matcher::Byte(b'a'), s2).unwrap();
        b.set_initial(s0);
        let dfa = b.build().unwrap();
        let m = Executor::<Backward>::new(&dfa, Input::new(b"ab"), true)
            .run(2)
            .unwrap();
        assert_eq!(&*m.boundaries, &[0, 2]);
        assert!(Executor::<Backward>::new(&dfa, Input::new(b"ba"), true)
            .run(2)
            .is_none());
    }

    #[test]
    fn anchored_final_requires_true_end() {
        let mut b = DfaBuilder::plain();
        let s0 = b.add_state(0);
        let s1 = b.add_state(FLAG_ANCHORED_FINAL);
        b.add_edge(s0, Matcher::Byte(b'a'), s1).unwrap();
        b.set_initial(s0);
        let dfa = b.build().unwrap();
        assert!(run_fwd(&dfa, b"a", true, 0).is_some());
        assert!(run_fwd(&dfa, b"ab", true, 0).is_none());
        // A scan bound short of the input's end does not count as the end.
        assert!(Executor::<Forward>::new(&dfa, Input::with_bounds(b"ab", 0, 1), true)
            .run(0)
            .is_none());
    }
}
