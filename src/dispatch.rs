//! Predecessor-edge dispatch.
//!
//! The deferred capture updates for a state depend on which edge entered it.
//! The executor records the committed transition id as it steps; when the
//! state is left, that id selects the governing lazy transition. States with
//! a single possible predecessor skip the table lookup.

use crate::automaton::{CgState, Dfa};
use crate::transition::{LazyTransition, TransitionId};

/// \return the lazy transition governing entry into the state described by
/// \p cg, given the transition \p last recorded by the previous step.
#[inline(always)]
pub(crate) fn entering<'d>(dfa: &'d Dfa, cg: &CgState, last: TransitionId) -> &'d LazyTransition {
    if let [single] = cg.preceding[..] {
        debug_assert_eq!(single, last, "Unlisted predecessor transition");
        dfa.lazy(single)
    } else {
        debug_assert!(cg.preceding.contains(&last), "Unlisted predecessor transition");
        dfa.lazy(last)
    }
}
