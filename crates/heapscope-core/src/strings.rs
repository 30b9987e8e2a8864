// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Interned string table for class and field names.
//!
//! Names are stored once in a single buffer and referenced by `u32` index
//! from the columnar tables; a heap with millions of instances of a few
//! thousand classes stores each name exactly once.

use rustc_hash::FxHashMap;

/// Append-only table of strings addressed by index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct StringTable {
    bytes: String,
    /// `offsets[i]..offsets[i + 1]` is string `i`; always one longer than the table.
    offsets: Vec<usize>,
}

impl StringTable {
    pub(crate) fn new() -> Self {
        Self {
            bytes: String::new(),
            offsets: vec![0],
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub(crate) fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns string `index`, or the empty string when out of range.
    pub(crate) fn get(&self, index: u32) -> &str {
        let i = index as usize;
        match (self.offsets.get(i), self.offsets.get(i + 1)) {
            (Some(&start), Some(&end)) => &self.bytes[start..end],
            _ => "",
        }
    }

    pub(crate) fn push(&mut self, s: &str) -> u32 {
        if self.offsets.is_empty() {
            self.offsets.push(0);
        }
        #[allow(clippy::cast_possible_truncation)]
        let index = self.len() as u32;
        self.bytes.push_str(s);
        self.offsets.push(self.bytes.len());
        index
    }

    /// Iterates `(start, len)` byte spans in table order.
    pub(crate) fn spans(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.offsets.windows(2).map(|w| (w[0], w[1] - w[0]))
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.bytes.as_bytes()
    }
}

/// Builder-side interner that deduplicates while filling a [`StringTable`].
#[derive(Debug, Default)]
pub(crate) struct StringInterner {
    table: StringTable,
    lookup: FxHashMap<String, u32>,
}

impl StringInterner {
    pub(crate) fn new() -> Self {
        Self {
            table: StringTable::new(),
            lookup: FxHashMap::default(),
        }
    }

    pub(crate) fn intern(&mut self, s: &str) -> u32 {
        if let Some(&index) = self.lookup.get(s) {
            return index;
        }
        let index = self.table.push(s);
        self.lookup.insert(s.to_owned(), index);
        index
    }

    pub(crate) fn finish(self) -> StringTable {
        self.table
    }
}
