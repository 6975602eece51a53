#![allow(dead_code)]

use dfacap::{
    BoundaryOp, Dfa, DfaBuilder, LazyTransition, Matcher, PartialTransition, RowCopy, FLAG_FINAL,
    RESULT_ROW,
};

fn update(row: u8, slot: u16) -> BoundaryOp {
    BoundaryOp { row, slot }
}

fn stamp(row: u8, slot: u16) -> PartialTransition {
    PartialTransition::new(vec![], vec![], vec![update(row, slot)], vec![])
}

fn copy_to_result(src: u8) -> PartialTransition {
    PartialTransition::new(vec![], vec![RowCopy { src, dst: RESULT_ROW }], vec![], vec![])
}

/// A plain recognizer for the literal \p lit.
pub fn literal(lit: &[u8]) -> Dfa {
    let mut b = DfaBuilder::plain();
    let mut prev = b.add_state(if lit.is_empty() { FLAG_FINAL } else { 0 });
    b.set_initial(prev);
    for (i, &c) in lit.iter().enumerate() {
        let flags = if i + 1 == lit.len() { FLAG_FINAL } else { 0 };
        let next = b.add_state(flags);
        b.add_edge(prev, Matcher::Byte(c), next).unwrap();
        prev = next;
    }
    b.build().unwrap()
}

/// A capture-tracking automaton for one or more repetitions of \p byte,
/// recording the overall extent in group 0.
pub fn plus(byte: u8, accel: bool) -> Dfa {
    let mut b = DfaBuilder::new(1, 1);
    b.loop_acceleration(accel);
    let s0 = b.add_state(0);
    let s1 = b.add_state(FLAG_FINAL);
    let t_entry = b.add_transition(LazyTransition::new(
        vec![stamp(0, 0)],
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
    b.add_tracked_edge(s0, Matcher::Byte(byte), s1, t1).unwrap();
    b.add_tracked_edge(s1, Matcher::Byte(byte), s1, tl).unwrap();
    b.set_capture_entry(s0, vec![t_entry], PartialTransition::none(), PartialTransition::none())
        .unwrap();
    b.set_capture_entry(s1, vec![t1, tl], stamp(RESULT_ROW, 1), PartialTransition::none())
        .unwrap();
    b.set_initial(s0);
    b.set_entry_transition(t_entry);
    b.build().unwrap()
}

/// A capture-tracking automaton for `a(b)c`: group 0 spans the whole match,
/// group 1 the inner `b`.
pub fn group_literal() -> Dfa {
    let mut b = DfaBuilder::new(2, 1);
    let s0 = b.add_state(0);
    let s1 = b.add_state(0);
    let s2 = b.add_state(0);
    let s3 = b.add_state(FLAG_FINAL);
    let t_entry = b.add_transition(LazyTransition::new(
        vec![stamp(0, 0)],
        PartialTransition::none(),
        PartialTransition::none(),
    ));
    let t1 = b.add_transition(LazyTransition::new(
        vec![stamp(0, 2)],
        PartialTransition::none(),
        PartialTransition::none(),
    ));
    let t2 = b.add_transition(LazyTransition::new(
        vec![stamp(0, 3)],
        PartialTransition::none(),
        PartialTransition::none(),
    ));
    let t3 = b.add_transition(LazyTransition::new(
        vec![],
        copy_to_result(0),
        PartialTransition::none(),
    ));
    b.add_tracked_edge(s0, Matcher::Byte(b'a'), s1, t1).unwrap();
    b.add_tracked_edge(s1, Matcher::Byte(b'b'), s2, t2).unwrap();
    b.add_tracked_edge(s2, Matcher::Byte(b'c'), s3, t3).unwrap();
    b.set_capture_entry(s0, vec![t_entry], PartialTransition::none(), PartialTransition::none())
        .unwrap();
    b.set_capture_entry(s1, vec![t1], PartialTransition::none(), PartialTransition::none())
        .unwrap();
    b.set_capture_entry(s2, vec![t2], PartialTransition::none(), PartialTransition::none())
        .unwrap();
    b.set_capture_entry(s3, vec![t3], stamp(RESULT_ROW, 1), PartialTransition::none())
        .unwrap();
    b.set_initial(s0);
    b.set_entry_transition(t_entry);
    b.build().unwrap()
}

/// A plain recognizer for any run of \p byte, including the empty run.
pub fn star(byte: u8) -> Dfa {
    let mut b = DfaBuilder::plain();
    let s0 = b.add_state(FLAG_FINAL);
    b.add_edge(s0, Matcher::Byte(byte), s0).unwrap();
    b.set_initial(s0);
    b.build().unwrap()
}
