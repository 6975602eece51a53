//! Public matching surface.

use core::ops::Range;

use crate::automaton::Dfa;
use crate::cursor::Forward;
use crate::executor::{Executor, RawMatch};
use crate::input::Input;

/// A successful match: the overall extent plus one optional range per
/// capture group. Group 0 is the overall match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    range: Range<usize>,
    groups: Box<[Option<Range<usize>>]>,
}

impl Match {
    fn from_raw(group_count: usize, raw: &RawMatch) -> Option<Match> {
        let cell = |i: usize| raw.boundaries.get(i).copied().unwrap_or(crate::transition::NOT_SET);
        let group = |g: usize| {
            let (start, end) = (cell(2 * g), cell(2 * g + 1));
            if start >= 0 && end >= start {
                Some(start as usize..end as usize)
            } else {
                None
            }
        };
        let range = group(0)?;
        let groups = (0..group_count).map(group).collect();
        Some(Match { range, groups })
    }

    #[inline(always)]
    pub fn start(&self) -> usize {
        self.range.start
    }

    #[inline(always)]
    pub fn end(&self) -> usize {
        self.range.end
    }

    /// The overall match extent.
    #[inline(always)]
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// \return the extent of capture group \p group, or None if the group
    /// did not participate in the match.
    pub fn group(&self, group: usize) -> Option<Range<usize>> {
        self.groups.get(group).cloned().flatten()
    }

    /// Iterate over all group extents, starting with group 0.
    pub fn groups(&self) -> impl Iterator<Item = Option<Range<usize>>> + '_ {
        self.groups.iter().cloned()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

impl Dfa {
    /// Attempt a match starting exactly at \p start. Greedy: of all matches
    /// beginning there, the longest is returned.
    pub fn match_at(&self, haystack: &[u8], start: usize) -> Option<Match> {
        if start > haystack.len() {
            return None;
        }
        let raw = Executor::<Forward>::new(self, Input::new(haystack), true).run(start)?;
        Match::from_raw(self.group_count(), &raw)
    }

    /// Find the leftmost match at or after \p from.
    ///
    /// Start positions are tried in order. Automata compiled with a
    /// self-looping unanchored prefix match from anywhere in a single
    /// attempt and never retry.
    pub fn search_at(&self, haystack: &[u8], from: usize) -> Option<Match> {
        for start in from..=haystack.len() {
            if let Some(m) = self.match_at(haystack, start) {
                return Some(m);
            }
        }
        None
    }

    /// Find the leftmost match.
    pub fn search(&self, haystack: &[u8]) -> Option<Match> {
        self.search_at(haystack, 0)
    }

    /// Match the window `from..to` in its entirety, or not at all. Group
    /// detail is not exported in this mode; only the overall extent.
    pub fn exact_match(&self, haystack: &[u8], from: usize, to: usize) -> Option<Match> {
        if to > haystack.len() || from > to {
            return None;
        }
        let input = Input::with_bounds(haystack, from, to);
        let raw = Executor::<Forward>::new(self, input, false).run(from)?;
        Match::from_raw(self.group_count(), &raw)
    }

    /// Iterate over non-overlapping matches, leftmost first.
    pub fn find_iter<'d, 'h>(&'d self, haystack: &'h [u8]) -> Matches<'d, 'h> {
        Matches {
            dfa: self,
            haystack,
            next_start: 0,
            done: false,
        }
    }
}

/// Iterator over non-overlapping matches. An empty match advances the scan
/// by one position so iteration always terminates.
#[derive(Debug)]
pub struct Matches<'d, 'h> {
    dfa: &'d Dfa,
    haystack: &'h [u8],
    next_start: usize,
    done: bool,
}

impl<'d, 'h> Iterator for Matches<'d, 'h> {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        if self.done {
            return None;
        }
        match self.dfa.search_at(self.haystack, self.next_start) {
            Some(m) => {
                self.next_start = if m.end() > m.start() { m.end() } else { m.end() + 1 };
                Some(m)
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}
