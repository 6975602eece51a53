//! A DFA regular-expression execution core with lazy capture-group tracking.
//!
//! This crate executes already-compiled byte automata. A compiler front end
//! assembles states, prioritized edges, and capture-group transition tables
//! through [`DfaBuilder`]; the executor then walks the automaton over a byte
//! slice, one symbol per step, with no backtracking.
//!
//! Capture groups are tracked lazily. A DFA state stands for several
//! alternatives at once, so the automaton carries one row of group
//! boundaries per alternative and decides which updates apply only when a
//! state is left, based on the edge that entered it. Self-looping states
//! skip ahead with vectorized byte search and reconcile the bookkeeping
//! afterwards; the results are identical to the plain symbol-at-a-time walk.
//!
//! ```
//! use dfacap::{DfaBuilder, Matcher, FLAG_FINAL};
//!
//! // A recognizer for 'a' followed by any run of 'b'.
//! let mut builder = DfaBuilder::plain();
//! let s0 = builder.add_state(0);
//! let s1 = builder.add_state(FLAG_FINAL);
//! builder.add_edge(s0, Matcher::Byte(b'a'), s1).unwrap();
//! builder.add_edge(s1, Matcher::Byte(b'b'), s1).unwrap();
//! builder.set_initial(s0);
//! let dfa = builder.build().unwrap();
//!
//! let m = dfa.search(b"xxabbbyy").unwrap();
//! assert_eq!(m.range(), 2..6);
//! ```

mod api;
mod automaton;
mod builder;
mod bytesearch;
mod cursor;
mod dispatch;
mod executor;
mod input;
mod matchers;
mod transition;

pub use api::{Match, Matches};
pub use automaton::{Dfa, StateId, FLAG_ANCHORED_FINAL, FLAG_FINAL};
pub use builder::{BuildError, DfaBuilder};
pub use bytesearch::ByteBitmap;
pub use cursor::{Backward, Direction, Forward};
pub use input::Input;
pub use matchers::Matcher;
pub use transition::{
    BoundaryOp, LazyTransition, PartialTransition, RowCopy, TransitionId, NOT_SET, RESULT_ROW,
};
