//! Per-edge byte matchers.
//!
//! Each outgoing edge of a state carries one `Matcher`; the executor tests
//! them in priority order and the first match wins. A state may additionally
//! carry a `UnifiedMatcher`, a single 256-entry table resolving all outgoing
//! edges with one probe.

use crate::bytesearch::ByteBitmap;

/// A matcher for a single byte symbol on one automaton edge.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Match exactly one byte.
    Byte(u8),

    /// Match an inclusive byte range.
    Range { lo: u8, hi: u8 },

    /// Match any byte in the set.
    Set(ByteBitmap),

    /// Match any byte.
    Any,
}

impl Matcher {
    /// \return whether this matcher accepts \p b.
    #[inline(always)]
    pub fn matches(&self, b: u8) -> bool {
        match *self {
            Matcher::Byte(c) => b == c,
            Matcher::Range { lo, hi } => lo <= b && b <= hi,
            Matcher::Set(ref bm) => bm.contains(b),
            Matcher::Any => true,
        }
    }
}

/// Successor slot marker for "no edge matches".
const NO_SLOT: u8 = u8::MAX;

/// A combined matcher testing all outgoing edges of one state at once: a
/// byte-indexed table of successor slots, honoring first-match-wins priority.
#[derive(Clone)]
pub struct UnifiedMatcher {
    table: Box<[u8; 256]>,
}

impl UnifiedMatcher {
    /// Precompute the table for \p matchers, in priority order.
    pub fn build(matchers: &[Matcher]) -> UnifiedMatcher {
        debug_assert!(matchers.len() < NO_SLOT as usize);
        let mut table = Box::new([NO_SLOT; 256]);
        for b in 0..=255u8 {
            if let Some(slot) = matchers.iter().position(|m| m.matches(b)) {
                table[b as usize] = slot as u8;
            }
        }
        UnifiedMatcher { table }
    }

    /// \return the successor slot for \p b, or None if no edge matches.
    #[inline(always)]
    pub fn lookup(&self, b: u8) -> Option<u8> {
        let slot = self.table[b as usize];
        if slot == NO_SLOT {
            None
        } else {
            Some(slot)
        }
    }
}

impl core::fmt::Debug for UnifiedMatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let edges = self.table.iter().filter(|&&s| s != NO_SLOT).count();
        write!(f, "UnifiedMatcher({} bytes matched)", edges)
    }
}
