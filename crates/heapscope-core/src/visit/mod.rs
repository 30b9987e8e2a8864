// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Visited-tracking sets for graph traversals.
//!
//! Every traversal over the store marks slots instead of allocating per-node
//! bookkeeping. Three flavours share the `test`/`set`/reset vocabulary:
//!
//! - [`DenseBitSet`]: one bit per slot; persistent markers (reachability, roots).
//! - [`VersionedBitSet`]: O(1) reset between repeated searches over one graph.
//! - [`ConcurrentBitSet`]: atomic `test_and_set` for parallel marking.

mod concurrent;
mod dense;
mod versioned;

pub use concurrent::ConcurrentBitSet;
pub use dense::DenseBitSet;
pub use versioned::VersionedBitSet;

/// Single-threaded visited marker.
pub trait VisitSet {
    /// Returns `true` if `index` has been marked since the last reset.
    fn test(&self, index: usize) -> bool;
    /// Marks `index`, growing the set if needed.
    fn set(&mut self, index: usize);
    /// Clears every mark.
    fn reset(&mut self);

    /// Marks `index` and reports whether it was newly marked.
    fn insert(&mut self, index: usize) -> bool {
        if self.test(index) {
            return false;
        }
        self.set(index);
        true
    }
}
