//! Bounded top-K collection for per-class candidate selection.

use std::cmp::Ordering;

use super::{candidate_cmp_desc, Candidate};

/// Top-K collector writing into a caller-provided slot array.
///
/// Insertion is O(k) against the current worst entry, so a full scan over the
/// priors costs O(priors * k) with no allocation. `finish` leaves the slots
/// sorted in the deterministic descending order and returns the filled count.
pub(crate) struct TopK<'a> {
    slots: &'a mut [Candidate],
    len: usize,
    worst: usize,
}

impl<'a> TopK<'a> {
    /// Collects into `slots`; capacity is the slice length.
    pub fn new(slots: &'a mut [Candidate]) -> Self {
        Self {
            slots,
            len: 0,
            worst: 0,
        }
    }

    /// Offers a candidate, evicting the current worst when at capacity.
    pub fn push(&mut self, candidate: Candidate) {
        if self.slots.is_empty() {
            return;
        }
        if self.len < self.slots.len() {
            self.slots[self.len] = candidate;
            if candidate_cmp_desc(&candidate, &self.slots[self.worst]) == Ordering::Greater {
                self.worst = self.len;
            }
            self.len += 1;
            return;
        }

        if candidate_cmp_desc(&candidate, &self.slots[self.worst]) == Ordering::Less {
            self.slots[self.worst] = candidate;
            self.worst = 0;
            for idx in 1..self.slots.len() {
                if candidate_cmp_desc(&self.slots[idx], &self.slots[self.worst])
                    == Ordering::Greater
                {
                    self.worst = idx;
                }
            }
        }
    }

    /// Sorts the filled slots descending and returns how many were filled.
    pub fn finish(self) -> usize {
        self.slots[..self.len].sort_unstable_by(candidate_cmp_desc);
        self.len
    }
}
