//! The input window the executor scans over.
//!
//! Positions are plain byte indices. The window carries two kinds of bounds:
//! the scan bounds `from..to` that limit how far a match attempt may read,
//! and the true ends of the underlying slice. The distinction matters for
//! anchored final states, which require the cursor to sit at the true end of
//! the input, not merely at the scan bound.

use crate::bytesearch::LoopScan;
use crate::cursor::Direction;

/// A finite, randomly addressable sequence of byte symbols plus scan bounds.
#[derive(Debug, Copy, Clone)]
pub struct Input<'a> {
    bytes: &'a [u8],
    from: usize,
    to: usize,
}

impl<'a> Input<'a> {
    /// Construct an input covering the whole slice.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            from: 0,
            to: bytes.len(),
        }
    }

    /// Construct an input with explicit scan bounds.
    /// `from <= to <= bytes.len()` must hold.
    pub fn with_bounds(bytes: &'a [u8], from: usize, to: usize) -> Self {
        assert!(from <= to && to <= bytes.len(), "Invalid scan bounds");
        Self { bytes, from, to }
    }

    #[inline(always)]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    #[inline(always)]
    pub fn from(&self) -> usize {
        self.from
    }

    #[inline(always)]
    pub fn to(&self) -> usize {
        self.to
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// \return whether a cursor at \p index may consume another symbol.
    #[inline(always)]
    pub fn has_next<Dir: Direction>(&self, index: usize) -> bool {
        if Dir::FORWARD {
            index < self.to
        } else {
            index > self.from
        }
    }

    /// \return whether a cursor at \p index sits at the true end of the
    /// input in the scan direction. This is the anchored-final condition.
    #[inline(always)]
    pub fn at_true_end<Dir: Direction>(&self, index: usize) -> bool {
        if Dir::FORWARD {
            index == self.bytes.len()
        } else {
            index == 0
        }
    }

    /// \return the symbol a cursor at \p index would consume next.
    #[inline(always)]
    pub fn read<Dir: Direction>(&self, index: usize) -> u8 {
        debug_assert!(self.has_next::<Dir>(index), "Read past scan bound");
        if Dir::FORWARD {
            self.bytes[index]
        } else {
            self.bytes[index - 1]
        }
    }

    /// Bulk-scan forward from \p index for the first position holding a
    /// loop-exiting byte. \return its absolute index, or None if the loop
    /// runs all the way to the scan bound. Forward scans only.
    #[inline(always)]
    pub fn find_loop_exit(&self, scan: &LoopScan, index: usize) -> Option<usize> {
        debug_assert!(index <= self.to);
        scan.find_in(&self.bytes[index..self.to]).map(|i| index + i)
    }
}
