// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! One-bit-per-slot set.

use super::VisitSet;

const WORD_BITS: usize = 64;

/// Growable bit set backed by `u64` words.
///
/// Growth is geometric so that marking slots in ascending order costs
/// amortised O(1) per slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DenseBitSet {
    words: Vec<u64>,
}

impl DenseBitSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set with room for `len` indices without reallocating.
    #[must_use]
    pub fn with_len(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD_BITS)],
        }
    }

    /// Number of indices the set can hold without growing.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.words.len() * WORD_BITS
    }

    /// Number of marked indices.
    #[must_use]
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterates marked indices in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(wi * WORD_BITS + bit)
            })
        })
    }

    /// Unmarks `index`. No-op when out of range.
    pub fn clear(&mut self, index: usize) {
        if let Some(word) = self.words.get_mut(index / WORD_BITS) {
            *word &= !(1u64 << (index % WORD_BITS));
        }
    }

    fn grow_to(&mut self, index: usize) {
        let needed = index / WORD_BITS + 1;
        if needed > self.words.len() {
            let target = needed.max(self.words.len() * 2);
            self.words.resize(target, 0);
        }
    }
}

impl VisitSet for DenseBitSet {
    fn test(&self, index: usize) -> bool {
        self.words
            .get(index / WORD_BITS)
            .is_some_and(|w| w & (1u64 << (index % WORD_BITS)) != 0)
    }

    fn set(&mut self, index: usize) {
        self.grow_to(index);
        self.words[index / WORD_BITS] |= 1u64 << (index % WORD_BITS);
    }

    fn reset(&mut self) {
        self.words.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_and_grows() {
        let mut set = DenseBitSet::new();
        assert!(!set.test(0));
        set.set(3);
        set.set(200);
        assert!(set.test(3));
        assert!(set.test(200));
        assert!(!set.test(4));
        assert!(set.capacity() >= 201);
        assert_eq!(set.count_ones(), 2);
        assert_eq!(set.iter_ones().collect::<Vec<_>>(), vec![3, 200]);
    }

    #[test]
    fn insert_reports_novelty() {
        let mut set = DenseBitSet::with_len(10);
        assert!(set.insert(7));
        assert!(!set.insert(7));
        set.clear(7);
        assert!(set.insert(7));
    }

    #[test]
    fn reset_clears_everything() {
        let mut set = DenseBitSet::with_len(130);
        for i in (0..130).step_by(3) {
            set.set(i);
        }
        set.reset();
        assert_eq!(set.count_ones(), 0);
        assert!(set.capacity() >= 130);
    }
}
