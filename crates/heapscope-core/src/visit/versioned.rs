// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Visited set with constant-time reset.
//!
//! Each slot stores the version in which it was last marked. A slot is
//! "set" iff its stamp equals the current version, so bumping the version
//! forgets every mark at once. Version `0` is never current, which keeps a
//! freshly zeroed table empty. When the counter wraps the table is cleared
//! for real.

use super::VisitSet;

/// Version-stamped visited set.
#[derive(Clone, Debug)]
pub struct VersionedBitSet {
    stamps: Vec<u16>,
    version: u16,
}

impl Default for VersionedBitSet {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionedBitSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stamps: Vec::new(),
            version: 1,
        }
    }

    /// Creates a set with room for `len` indices.
    #[must_use]
    pub fn with_len(len: usize) -> Self {
        Self {
            stamps: vec![0; len],
            version: 1,
        }
    }

    /// Current version counter (diagnostics and tests).
    #[must_use]
    pub fn version(&self) -> u16 {
        self.version
    }

    /// Number of indices the set can hold without growing.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.stamps.len()
    }

    /// Ensures room for `len` indices.
    pub fn ensure_len(&mut self, len: usize) {
        if len > self.stamps.len() {
            self.stamps.resize(len, 0);
        }
    }
}

impl VisitSet for VersionedBitSet {
    fn test(&self, index: usize) -> bool {
        self.stamps.get(index).is_some_and(|&s| s == self.version)
    }

    fn set(&mut self, index: usize) {
        if index >= self.stamps.len() {
            let target = (index + 1).max(self.stamps.len() * 2);
            self.stamps.resize(target, 0);
        }
        self.stamps[index] = self.version;
    }

    fn reset(&mut self) {
        match self.version.checked_add(1) {
            Some(next) => self.version = next,
            None => {
                self.stamps.fill(0);
                self.version = 1;
            }
        }
    }
}
