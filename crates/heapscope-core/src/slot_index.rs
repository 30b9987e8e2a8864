// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifier → slot lookup.
//!
//! Object identifiers are usually allocated densely by the capturing
//! process. When the identifier span is at most twice the object count the
//! index is a direct table (`slots[id - base]`), giving O(1) lookups at four
//! bytes per identifier. Sparse identifier spaces fall back to binary search
//! over the sorted identifier column, which costs nothing extra to store.

use crate::ident::{ObjectId, Slot, NO_SLOT};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum SlotIndex {
    Direct { base: u64, slots: Vec<Slot> },
    Sorted,
}

impl SlotIndex {
    /// Builds the index for an ascending, duplicate-free identifier column.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn build(ids: &[ObjectId]) -> Self {
        let (Some(first), Some(last)) = (ids.first(), ids.last()) else {
            return Self::Sorted;
        };
        let span = last.0 - first.0;
        let dense_enough = span
            .checked_add(1)
            .and_then(|s| usize::try_from(s).ok())
            .filter(|&s| s <= ids.len().saturating_mul(2));
        let Some(span) = dense_enough else {
            return Self::Sorted;
        };
        let mut slots = vec![NO_SLOT; span];
        for (slot, id) in ids.iter().enumerate() {
            slots[(id.0 - first.0) as usize] = slot as Slot;
        }
        Self::Direct {
            base: first.0,
            slots,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn lookup(&self, ids: &[ObjectId], id: ObjectId) -> Option<Slot> {
        match self {
            Self::Direct { base, slots } => {
                let offset = usize::try_from(id.0.checked_sub(*base)?).ok()?;
                slots.get(offset).copied().filter(|&s| s != NO_SLOT)
            }
            Self::Sorted => ids.binary_search(&id).ok().map(|s| s as Slot),
        }
    }

    pub(crate) fn is_direct(&self) -> bool {
        matches!(self, Self::Direct { .. })
    }

    pub(crate) fn heap_bytes(&self) -> usize {
        match self {
            Self::Direct { slots, .. } => slots.len() * std::mem::size_of::<Slot>(),
            Self::Sorted => 0,
        }
    }
}
