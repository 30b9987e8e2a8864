// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Bounded top-K collection and k-way merge of ranked lists.
//!
//! Rankings are expressed through `Ord`: smaller keys rank first. Callers
//! encode "largest size first, smallest id on ties" in the key type.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Keeps the `k` smallest keys seen so far.
#[derive(Clone, Debug)]
pub struct TopK<K: Ord> {
    k: usize,
    heap: BinaryHeap<K>,
}

impl<K: Ord> TopK<K> {
    /// Creates an empty collector bounded to `k` entries.
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k.min(1024) + 1),
        }
    }

    /// Offers a key; it is kept if it ranks among the best `k`.
    pub fn push(&mut self, key: K) {
        if self.k == 0 {
            return;
        }
        if self.heap.len() < self.k {
            self.heap.push(key);
        } else if self.heap.peek().is_some_and(|worst| key < *worst) {
            self.heap.pop();
            self.heap.push(key);
        }
    }

    /// Number of retained keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if nothing was retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Retained keys, best first.
    #[must_use]
    pub fn into_sorted_vec(self) -> Vec<K> {
        self.heap.into_sorted_vec()
    }
}

/// Merges ascending lists into one ascending list of at most `limit` keys.
#[must_use]
pub fn merge_sorted<K: Ord + Clone>(lists: &[Vec<K>], limit: usize) -> Vec<K> {
    let mut heap = BinaryHeap::with_capacity(lists.len());
    for (li, list) in lists.iter().enumerate() {
        if let Some(first) = list.first() {
            heap.push(Reverse((first.clone(), li, 0usize)));
        }
    }
    let mut out = Vec::with_capacity(limit.min(lists.iter().map(Vec::len).sum()));
    while out.len() < limit {
        let Some(Reverse((key, li, pos))) = heap.pop() else {
            break;
        };
        out.push(key);
        if let Some(next) = lists[li].get(pos + 1) {
            heap.push(Reverse((next.clone(), li, pos + 1)));
        }
    }
    out
}
