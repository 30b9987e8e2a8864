// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! HSC row types.
//!
//! Every row is `#[repr(C)]`, free of implicit padding, and a multiple of
//! eight bytes long, so each table can be viewed in place with `bytemuck`
//! once the file buffer is 8-byte aligned. Multi-byte integers are stored
//! little-endian (`*_le` fields, read through accessor methods).

use bytemuck::{Pod, Zeroable};

/// File header (128 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct HscHeader {
    /// Magic bytes: `b"HSC\x00\x01\x00\x00\x00"` (version 1).
    pub magic: [u8; 8],
    /// BLAKE3 digest of every byte after the header.
    pub body_digest: [u8; 32],
    /// Offset of the section directory.
    pub dir_off_le: u64,
    /// Total file length in bytes.
    pub file_len_le: u64,
    /// Reserved (must be zero).
    pub reserved0_le: u64,
    /// Reserved (must be zero).
    pub reserved: [u8; 64],
}

const _: () = assert!(std::mem::size_of::<HscHeader>() == 128);

impl HscHeader {
    /// Magic bytes for format version 1.
    pub const MAGIC_V1: [u8; 8] = *b"HSC\x00\x01\x00\x00\x00";

    /// Directory offset.
    #[must_use]
    pub fn dir_off(&self) -> u64 {
        u64::from_le(self.dir_off_le)
    }

    /// Declared file length.
    #[must_use]
    pub fn file_len(&self) -> u64 {
        u64::from_le(self.file_len_le)
    }
}

/// Location of one table: byte offset and row count (byte count for blobs).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct Section {
    /// Byte offset from the start of the file.
    pub off_le: u64,
    /// Rows in the table (bytes for `string_bytes`).
    pub count_le: u64,
}

const _: () = assert!(std::mem::size_of::<Section>() == 16);

impl Section {
    /// Byte offset.
    #[must_use]
    pub fn off(&self) -> u64 {
        u64::from_le(self.off_le)
    }

    /// Row count.
    #[must_use]
    pub fn count(&self) -> u64 {
        u64::from_le(self.count_le)
    }
}

/// Section directory (128 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct HscDirectory {
    /// [`Range`] rows, one per interned string.
    pub string_spans: Section,
    /// Concatenated UTF-8 string bytes.
    pub string_bytes: Section,
    /// [`ClassRow`] table, ascending by class id.
    pub classes: Section,
    /// [`ClassFieldRow`] table.
    pub class_fields: Section,
    /// [`ObjectRow`] table, ascending by object id.
    pub objects: Section,
    /// [`EdgeRow`] table.
    pub edges: Section,
    /// [`PrimRow`] table.
    pub prims: Section,
    /// [`RootRow`] table.
    pub roots: Section,
}

const _: () = assert!(std::mem::size_of::<HscDirectory>() == 128);

/// Sublist descriptor (16 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct Range {
    /// First element (little-endian).
    pub start_le: u64,
    /// Element count (little-endian).
    pub len_le: u64,
}

const _: () = assert!(std::mem::size_of::<Range>() == 16);

impl Range {
    /// Builds a range from native values.
    #[must_use]
    pub fn new(start: u64, len: u64) -> Self {
        Self {
            start_le: start.to_le(),
            len_le: len.to_le(),
        }
    }

    /// Start offset.
    #[must_use]
    pub fn start(&self) -> u64 {
        u64::from_le(self.start_le)
    }

    /// Length.
    #[must_use]
    pub fn len(&self) -> u64 {
        u64::from_le(self.len_le)
    }

    /// Returns true if the range is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Exclusive end, or `None` on overflow.
    #[must_use]
    pub fn end(&self) -> Option<u64> {
        self.start().checked_add(self.len())
    }
}

/// Class row (40 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct ClassRow {
    /// Class identifier.
    pub class_id_le: u64,
    /// Superclass identifier; meaningful only with [`ClassRow::FLAG_HAS_SUPER`].
    pub super_id_le: u64,
    /// String index of the class name.
    pub name_le: u32,
    /// Bit flags.
    pub flags: u8,
    /// Reserved (must be zero).
    pub reserved: [u8; 3],
    /// Declared fields in the class-field table.
    pub fields: Range,
}

const _: () = assert!(std::mem::size_of::<ClassRow>() == 40);

impl ClassRow {
    /// Set when the class has a superclass.
    pub const FLAG_HAS_SUPER: u8 = 1;

    /// Class identifier.
    #[must_use]
    pub fn class_id(&self) -> u64 {
        u64::from_le(self.class_id_le)
    }

    /// Superclass identifier, if flagged.
    #[must_use]
    pub fn super_id(&self) -> Option<u64> {
        (self.flags & Self::FLAG_HAS_SUPER != 0).then(|| u64::from_le(self.super_id_le))
    }

    /// Name string index.
    #[must_use]
    pub fn name(&self) -> u32 {
        u32::from_le(self.name_le)
    }
}

/// Declared field name (8 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct ClassFieldRow {
    /// String index of the field name.
    pub name_le: u32,
    /// Reserved (must be zero).
    pub reserved: [u8; 4],
}

const _: () = assert!(std::mem::size_of::<ClassFieldRow>() == 8);

impl ClassFieldRow {
    /// Name string index.
    #[must_use]
    pub fn name(&self) -> u32 {
        u32::from_le(self.name_le)
    }
}

/// Object row (56 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct ObjectRow {
    /// Object identifier.
    pub object_id_le: u64,
    /// Class identifier.
    pub class_id_le: u64,
    /// Shallow size in bytes.
    pub shallow_le: u64,
    /// Outgoing edges in the edge table.
    pub edges: Range,
    /// Primitive fields in the primitive table.
    pub prims: Range,
}

const _: () = assert!(std::mem::size_of::<ObjectRow>() == 56);

impl ObjectRow {
    /// Object identifier.
    #[must_use]
    pub fn object_id(&self) -> u64 {
        u64::from_le(self.object_id_le)
    }

    /// Class identifier.
    #[must_use]
    pub fn class_id(&self) -> u64 {
        u64::from_le(self.class_id_le)
    }

    /// Shallow size.
    #[must_use]
    pub fn shallow(&self) -> u64 {
        u64::from_le(self.shallow_le)
    }
}

/// Outgoing edge (16 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct EdgeRow {
    /// Target object identifier (may be absent from the object table).
    pub target_id_le: u64,
    /// String index (field label) or array index (element label).
    pub label_le: u32,
    /// Field type tag; zero when not recorded.
    pub field_type: u8,
    /// [`EdgeRow::LABEL_FIELD`] or [`EdgeRow::LABEL_INDEX`].
    pub label_kind: u8,
    /// Reserved (must be zero).
    pub reserved: [u8; 2],
}

const _: () = assert!(std::mem::size_of::<EdgeRow>() == 16);

impl EdgeRow {
    /// `label` is a string index.
    pub const LABEL_FIELD: u8 = 0;
    /// `label` is an array index.
    pub const LABEL_INDEX: u8 = 1;

    /// Target identifier.
    #[must_use]
    pub fn target_id(&self) -> u64 {
        u64::from_le(self.target_id_le)
    }

    /// Raw label.
    #[must_use]
    pub fn label(&self) -> u32 {
        u32::from_le(self.label_le)
    }
}

/// Primitive field value (16 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct PrimRow {
    /// Value bits.
    pub bits_le: u64,
    /// String index of the field name.
    pub name_le: u32,
    /// Field type tag.
    pub tag: u8,
    /// Reserved (must be zero).
    pub reserved: [u8; 3],
}

const _: () = assert!(std::mem::size_of::<PrimRow>() == 16);

impl PrimRow {
    /// Value bits.
    #[must_use]
    pub fn bits(&self) -> u64 {
        u64::from_le(self.bits_le)
    }

    /// Name string index.
    #[must_use]
    pub fn name(&self) -> u32 {
        u32::from_le(self.name_le)
    }
}

/// GC root entry (16 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct RootRow {
    /// Rooted object identifier.
    pub object_id_le: u64,
    /// Root kind tag.
    pub kind: u8,
    /// Reserved (must be zero).
    pub reserved: [u8; 7],
}

const _: () = assert!(std::mem::size_of::<RootRow>() == 16);

impl RootRow {
    /// Rooted object identifier.
    #[must_use]
    pub fn object_id(&self) -> u64 {
        u64::from_le(self.object_id_le)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn types_are_pod_and_eight_byte_multiples() {
        fn check<T: Pod>() {
            assert_eq!(std::mem::size_of::<T>() % 8, 0);
        }
        check::<HscHeader>();
        check::<HscDirectory>();
        check::<Range>();
        check::<ClassRow>();
        check::<ClassFieldRow>();
        check::<ObjectRow>();
        check::<EdgeRow>();
        check::<PrimRow>();
        check::<RootRow>();
    }

    #[test]
    fn class_row_super_flag() {
        let mut row = ClassRow::zeroed();
        row.super_id_le = 7u64.to_le();
        assert_eq!(row.super_id(), None);
        row.flags = ClassRow::FLAG_HAS_SUPER;
        assert_eq!(row.super_id(), Some(7));
    }

    #[test]
    fn range_end_detects_overflow() {
        assert_eq!(Range::new(3, 4).end(), Some(7));
        assert_eq!(Range::new(u64::MAX, 1).end(), None);
    }
}
