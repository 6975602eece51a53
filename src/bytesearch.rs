//! Facilities for bulk byte scanning.
//!
//! The loop optimizer wants to answer one question fast: starting here, where
//! does a run of self-loop-matching bytes end? We phrase that as a search for
//! the first *exiting* byte and lean on memchr's vectorized searchers for the
//! common small exit sets.

use core::fmt;

/// A bitmap covering all 256 byte values.
#[derive(Default, Copy, Clone, PartialEq, Eq)]
pub struct ByteBitmap([u64; 4]);

impl ByteBitmap {
    /// Construct from a sequence of bytes.
    pub fn new(bytes: &[u8]) -> ByteBitmap {
        let mut bm = ByteBitmap::default();
        for &b in bytes {
            bm.set(b);
        }
        bm
    }

    /// \return whether this bitmap contains the byte \p val.
    #[inline(always)]
    pub fn contains(&self, val: u8) -> bool {
        (self.0[(val >> 6) as usize] >> (val & 63)) & 1 != 0
    }

    /// Set a byte in this bitmap.
    #[inline(always)]
    pub fn set(&mut self, val: u8) {
        self.0[(val >> 6) as usize] |= 1 << (val & 63);
    }

    /// Invert our bits, in place.
    pub fn bitnot(&mut self) -> &mut Self {
        for word in self.0.iter_mut() {
            *word = !*word;
        }
        self
    }

    /// Count the number of set bytes.
    pub fn count(&self) -> u32 {
        self.0.iter().map(|w| w.count_ones()).sum()
    }

    /// \return all set bytes, in ascending order.
    pub fn to_vec(&self) -> Vec<u8> {
        (0..=255u8).filter(|&b| self.contains(b)).collect()
    }

    /// \return the index of the first byte of \p bytes present in this
    /// bitmap, or None.
    #[inline(always)]
    pub fn find_in(&self, bytes: &[u8]) -> Option<usize> {
        bytes.iter().position(|&b| self.contains(b))
    }
}

impl fmt::Debug for ByteBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteBitmap[")?;
        let mut sep = "";
        let mut b = 0usize;
        while b <= 255 {
            let mut end = b;
            while end <= 255 && self.contains(end as u8) {
                end += 1;
            }
            match end - b {
                0 => (),
                1 => write!(f, "{}{}", sep, b)?,
                _ => write!(f, "{}{}-{}", sep, b, end - 1)?,
            }
            if end > b {
                sep = " ";
            }
            b = end + 1;
        }
        write!(f, "]")
    }
}

/// The fast-scan descriptor attached to a self-looping state: the set of
/// bytes on which the self-loop fails. Small sets get memchr-family
/// specializations; larger ones fall back to a bitmap scan.
#[derive(Debug, Clone)]
pub enum LoopScan {
    /// Exactly one byte exits the loop.
    Byte(u8),
    Byte2(u8, u8),
    Byte3(u8, u8, u8),
    /// An arbitrary exit set.
    Set(ByteBitmap),
}

impl LoopScan {
    /// Build the preferred scanner for \p exits, the set of loop-exiting
    /// bytes.
    pub fn from_exit_set(exits: &ByteBitmap) -> LoopScan {
        let bytes = exits.to_vec();
        match *bytes.as_slice() {
            [a] => LoopScan::Byte(a),
            [a, b] => LoopScan::Byte2(a, b),
            [a, b, c] => LoopScan::Byte3(a, b, c),
            _ => LoopScan::Set(*exits),
        }
    }

    /// \return whether \p b exits the loop.
    #[inline(always)]
    pub fn contains(&self, b: u8) -> bool {
        match *self {
            LoopScan::Byte(a) => b == a,
            LoopScan::Byte2(x, y) => b == x || b == y,
            LoopScan::Byte3(x, y, z) => b == x || b == y || b == z,
            LoopScan::Set(ref bm) => bm.contains(b),
        }
    }

    /// \return the index of the first loop-exiting byte in \p haystack,
    /// or None if the loop matches through the whole slice.
    #[inline(always)]
    pub fn find_in(&self, haystack: &[u8]) -> Option<usize> {
        match *self {
            LoopScan::Byte(a) => memchr::memchr(a, haystack),
            LoopScan::Byte2(a, b) => memchr::memchr2(a, b, haystack),
            LoopScan::Byte3(a, b, c) => memchr::memchr3(a, b, c, haystack),
            LoopScan::Set(ref bm) => bm.find_in(haystack),
        }
    }
}
