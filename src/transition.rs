//! Capture-group transitions and per-match tracking data.
//!
//! A DFA state can stand for several NFA states at once, so the engine
//! tracks one row of capture-group boundaries per NFA state it is still
//! considering. Which rows survive, how they are shuffled, and which
//! boundaries get stamped is decided per edge by a `PartialTransition`.
//! Because the right partial transition for *entering* a state depends on
//! which edge is taken to *leave* it, applications are deferred: a
//! `LazyTransition` bundles, for one predecessor edge, the partial
//! transition per successor slot plus the two distinguished pre-final
//! transitions for entering an anchored or unanchored final result.

/// Identifier of a `LazyTransition` in the automaton's transition table.
pub type TransitionId = u16;

/// Row marker addressing the distinguished result row of the tracking data
/// rather than a tracked row.
pub const RESULT_ROW: u8 = u8::MAX;

/// Boundary cell value for "not set".
pub const NOT_SET: i32 = -1;

/// Copy the contents of row `src` over row `dst`.
#[derive(Debug, Copy, Clone)]
pub struct RowCopy {
    pub src: u8,
    pub dst: u8,
}

/// Address of one group boundary cell: a row and a slot within it.
/// Slot `2 * g` is the start boundary of group `g`, slot `2 * g + 1` its end.
#[derive(Debug, Copy, Clone)]
pub struct BoundaryOp {
    pub row: u8,
    pub slot: u16,
}

/// An atomic update of the tracking data for one automaton edge.
///
/// Applying at index `i` must be idempotent for that `i`; re-application at
/// a different index produces the (different, also correct) result for that
/// index. There is no idempotence guarantee across distinct indices.
#[derive(Debug, Clone, Default)]
pub struct PartialTransition {
    /// Row permutation, or empty for none. When present, new logical row
    /// `i` takes over old logical row `reorder[i]`.
    reorder: Box<[u8]>,

    /// Row copies, performed after the reorder.
    copies: Box<[RowCopy]>,

    /// Boundary cells stamped with the application index.
    updates: Box<[BoundaryOp]>,

    /// Boundary cells reset to "not set".
    clears: Box<[BoundaryOp]>,
}

impl PartialTransition {
    pub fn new(
        reorder: Vec<u8>,
        copies: Vec<RowCopy>,
        updates: Vec<BoundaryOp>,
        clears: Vec<BoundaryOp>,
    ) -> PartialTransition {
        PartialTransition {
            reorder: reorder.into_boxed_slice(),
            copies: copies.into_boxed_slice(),
            updates: updates.into_boxed_slice(),
            clears: clears.into_boxed_slice(),
        }
    }

    /// A transition with no effect.
    pub fn none() -> PartialTransition {
        PartialTransition::default()
    }

    /// \return whether this transition permutes rows, making its effect
    /// depend on being applied once per visited index, in original order.
    /// Transitions without a reorder may be coalesced: applying once at the
    /// last relevant index equals applying at every index in sequence.
    #[inline(always)]
    pub fn does_reorder_results(&self) -> bool {
        !self.reorder.is_empty()
    }

    /// Apply this transition to \p data at \p index.
    #[inline(always)]
    pub fn apply(&self, data: &mut TrackingData, index: i32) {
        if !self.reorder.is_empty() {
            data.permute(&self.reorder);
        }
        for c in self.copies.iter() {
            data.copy_row(c.src, c.dst);
        }
        for u in self.updates.iter() {
            data.set(u.row, u.slot, index);
        }
        for c in self.clears.iter() {
            data.set(c.row, c.slot, NOT_SET);
        }
    }

    pub(crate) fn reorder(&self) -> &[u8] {
        &self.reorder
    }

    pub(crate) fn ops(&self) -> impl Iterator<Item = &BoundaryOp> {
        self.updates.iter().chain(self.clears.iter())
    }

    pub(crate) fn copies(&self) -> &[RowCopy] {
        &self.copies
    }
}

/// The deferred capture-group effects of one predecessor edge: one partial
/// transition per successor slot of the destination state, plus the
/// pre-final transitions used when the destination finalizes directly.
#[derive(Debug, Clone)]
pub struct LazyTransition {
    partials: Box<[PartialTransition]>,
    to_final: PartialTransition,
    to_anchored_final: PartialTransition,
}

impl LazyTransition {
    pub fn new(
        partials: Vec<PartialTransition>,
        to_final: PartialTransition,
        to_anchored_final: PartialTransition,
    ) -> LazyTransition {
        LazyTransition {
            partials: partials.into_boxed_slice(),
            to_final,
            to_anchored_final,
        }
    }

    /// The partial transition to apply when the destination state is left
    /// through successor slot \p slot.
    #[inline(always)]
    pub fn partial(&self, slot: u8) -> &PartialTransition {
        &self.partials[slot as usize]
    }

    pub(crate) fn arity(&self) -> usize {
        self.partials.len()
    }

    /// The pre-final transition for an unanchored final result.
    #[inline(always)]
    pub fn to_final(&self) -> &PartialTransition {
        &self.to_final
    }

    /// The pre-final transition for an anchored final result.
    #[inline(always)]
    pub fn to_anchored_final(&self) -> &PartialTransition {
        &self.to_anchored_final
    }

    pub(crate) fn all_partials(&self) -> impl Iterator<Item = &PartialTransition> {
        self.partials
            .iter()
            .chain([&self.to_final, &self.to_anchored_final])
    }
}

/// How a finished match is exported from the tracking data.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Export {
    /// Export every group boundary.
    Groups,

    /// Export only the overall match extent. Single-attempt callers that
    /// just need match/no-match take this cheaper path.
    WholeMatchOnly,
}

/// The per-match mutable buffer of capture-group boundaries.
///
/// Layout: `rows` tracked rows plus one distinguished result row, each of
/// `slots` cells. Tracked rows are addressed through `order`, a logical to
/// physical mapping, so a reorder is a permutation of `order` rather than a
/// shuffle of cell contents. The result row is exempt from reordering.
///
/// Exclusively owned by one in-flight match attempt; never shared.
#[derive(Debug, Clone)]
pub struct TrackingData {
    cells: Box<[i32]>,
    order: Box<[u8]>,
    scratch: Box<[u8]>,
    exported: Box<[i32]>,
    export: Option<Export>,
    rows: usize,
    slots: usize,
}

impl TrackingData {
    /// Create tracking data for \p rows tracked rows and \p groups capture
    /// groups (group 0 is the overall match). All cells start "not set".
    pub fn new(rows: u8, groups: u16) -> TrackingData {
        let rows = rows as usize;
        let slots = groups as usize * 2;
        TrackingData {
            cells: vec![NOT_SET; (rows + 1) * slots].into_boxed_slice(),
            order: (0..rows as u8).collect(),
            scratch: vec![0; rows].into_boxed_slice(),
            exported: vec![NOT_SET; slots].into_boxed_slice(),
            export: None,
            rows,
            slots,
        }
    }

    /// Tracking data with no rows, for automata that do not track captures.
    pub fn empty() -> TrackingData {
        TrackingData::new(0, 0)
    }

    #[inline(always)]
    fn physical(&self, row: u8) -> usize {
        if row == RESULT_ROW {
            self.rows
        } else {
            debug_assert!((row as usize) < self.rows, "Row out of range");
            self.order[row as usize] as usize
        }
    }

    /// Write \p val into the cell at logical \p row and \p slot.
    #[inline(always)]
    pub fn set(&mut self, row: u8, slot: u16, val: i32) {
        debug_assert!((slot as usize) < self.slots, "Slot out of range");
        let phys = self.physical(row);
        self.cells[phys * self.slots + slot as usize] = val;
    }

    /// \return the cell at logical \p row and \p slot.
    pub fn get(&self, row: u8, slot: u16) -> i32 {
        let phys = self.physical(row);
        self.cells[phys * self.slots + slot as usize]
    }

    /// Copy the contents of logical row \p src over logical row \p dst.
    #[inline(always)]
    pub fn copy_row(&mut self, src: u8, dst: u8) {
        let src = self.physical(src) * self.slots;
        let dst = self.physical(dst) * self.slots;
        if src != dst {
            self.cells.copy_within(src..src + self.slots, dst);
        }
    }

    /// Permute the logical row order: new logical row `i` takes over old
    /// logical row `perm[i]`.
    pub fn permute(&mut self, perm: &[u8]) {
        debug_assert_eq!(perm.len(), self.rows, "Permutation arity mismatch");
        self.scratch.copy_from_slice(&self.order);
        for (i, &p) in perm.iter().enumerate() {
            self.order[i] = self.scratch[p as usize];
        }
    }

    /// \return the result row the final-state transitions write into.
    pub fn result_row(&self) -> &[i32] {
        &self.cells[self.rows * self.slots..]
    }

    /// Export the result row as the finalized match result.
    pub fn export_result(&mut self, export: Export) {
        match export {
            Export::Groups => {
                let start = self.rows * self.slots;
                self.exported.copy_from_slice(&self.cells[start..]);
            }
            Export::WholeMatchOnly => {
                // Retain the overall extent only; group detail stays behind.
                for cell in self.exported.iter_mut() {
                    *cell = NOT_SET;
                }
                if self.slots >= 2 {
                    self.exported[0] = self.get(RESULT_ROW, 0);
                    self.exported[1] = self.get(RESULT_ROW, 1);
                }
            }
        }
        self.export = Some(export);
    }

    /// \return the exported result, if a match was finalized.
    pub fn exported(&self) -> Option<(&[i32], Export)> {
        self.export.map(|e| (&*self.exported, e))
    }

    /// \return whether any cell differs from its initial "not set" state.
    pub fn is_pristine(&self) -> bool {
        self.export.is_none() && self.cells.iter().all(|&c| c == NOT_SET)
    }
}
