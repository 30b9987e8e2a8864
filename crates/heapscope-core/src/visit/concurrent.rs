// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Bit set shared by concurrent markers.
//!
//! Set and test take the read side of the lock and touch one word with an
//! atomic operation; only growth takes the write side. Callers that size the
//! set up front (the common case: one bit per slot) never contend on the lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

const WORD_BITS: usize = 64;

/// Thread-safe growable bit set.
#[derive(Debug, Default)]
pub struct ConcurrentBitSet {
    words: RwLock<Vec<AtomicU64>>,
}

impl ConcurrentBitSet {
    /// Creates a set with room for `len` indices.
    #[must_use]
    pub fn with_len(len: usize) -> Self {
        let words = (0..len.div_ceil(WORD_BITS))
            .map(|_| AtomicU64::new(0))
            .collect();
        Self {
            words: RwLock::new(words),
        }
    }

    /// Number of indices the set can hold without growing.
    pub fn capacity(&self) -> usize {
        self.words.read().unwrap_or_else(|e| e.into_inner()).len() * WORD_BITS
    }

    /// Returns `true` if `index` is marked.
    pub fn test(&self, index: usize) -> bool {
        let words = self.words.read().unwrap_or_else(|e| e.into_inner());
        words
            .get(index / WORD_BITS)
            .is_some_and(|w| w.load(Ordering::Acquire) & mask(index) != 0)
    }

    /// Marks `index`.
    pub fn set(&self, index: usize) {
        let _ = self.test_and_set(index);
    }

    /// Marks `index` and returns whether it was already marked, as one atomic step.
    pub fn test_and_set(&self, index: usize) -> bool {
        {
            let words = self.words.read().unwrap_or_else(|e| e.into_inner());
            if let Some(word) = words.get(index / WORD_BITS) {
                return word.fetch_or(mask(index), Ordering::AcqRel) & mask(index) != 0;
            }
        }
        self.grow_to(index);
        let words = self.words.read().unwrap_or_else(|e| e.into_inner());
        words
            .get(index / WORD_BITS)
            .is_some_and(|w| w.fetch_or(mask(index), Ordering::AcqRel) & mask(index) != 0)
    }

    /// Clears every mark. Requires exclusive access.
    pub fn reset(&mut self) {
        let words = self.words.get_mut().unwrap_or_else(|e| e.into_inner());
        for word in words.iter_mut() {
            *word.get_mut() = 0;
        }
    }

    /// Number of marked indices.
    pub fn count_ones(&self) -> usize {
        let words = self.words.read().unwrap_or_else(|e| e.into_inner());
        words
            .iter()
            .map(|w| w.load(Ordering::Acquire).count_ones() as usize)
            .sum()
    }

    /// Converts into a single-threaded [`DenseBitSet`](super::DenseBitSet).
    pub fn into_dense(self) -> super::DenseBitSet {
        let words = self.words.into_inner().unwrap_or_else(|e| e.into_inner());
        let mut dense = super::DenseBitSet::with_len(words.len() * WORD_BITS);
        for (wi, word) in words.into_iter().enumerate() {
            let mut rest = word.into_inner();
            while rest != 0 {
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                super::VisitSet::set(&mut dense, wi * WORD_BITS + bit);
            }
        }
        dense
    }

    fn grow_to(&self, index: usize) {
        let mut words = self.words.write().unwrap_or_else(|e| e.into_inner());
        let needed = index / WORD_BITS + 1;
        if needed > words.len() {
            let target = needed.max(words.len() * 2);
            words.resize_with(target, || AtomicU64::new(0));
        }
    }
}

#[inline]
const fn mask(index: usize) -> u64 {
    1u64 << (index % WORD_BITS)
}
