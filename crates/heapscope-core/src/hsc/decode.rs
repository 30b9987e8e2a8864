// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! HSC decoder: structural validation, then graph construction.
//!
//! Validation order: header, declared length, body digest, directory,
//! section bounds and alignment, row reserved bytes and tags, sublist
//! contiguity, UTF-8. Identifier resolution is left to
//! [`HeapGraph::from_columns`], whose errors surface as
//! [`DecodeError::Graph`].

use tracing::{debug, instrument};

use super::read::{read_bytes, read_directory, read_header, read_slice, DecodeError};
use super::types::{
    ClassFieldRow, ClassRow, EdgeRow, HscDirectory, ObjectRow, PrimRow, Range, RootRow, Section,
};
use crate::graph::{GraphColumns, GraphCounts, HeapGraph, LABEL_INDEX_BIT};
use crate::ident::{ClassId, ObjectId};
use crate::record::RootKind;
use crate::strings::StringTable;

const HEADER_SIZE: usize = 128;

/// Decodes an HSC snapshot into a [`HeapGraph`].
///
/// The input may have any alignment; it is copied once into an aligned
/// buffer before the tables are viewed.
///
/// # Errors
///
/// Returns a [`DecodeError`] describing the first violation found.
#[instrument(skip(bytes), fields(len = bytes.len()))]
pub fn decode_snapshot(bytes: &[u8]) -> Result<HeapGraph, DecodeError> {
    let header = read_header(bytes)?;
    if blake3::hash(&bytes[HEADER_SIZE..]).as_bytes() != &header.body_digest {
        return Err(DecodeError::DigestMismatch);
    }
    let aligned = AlignedBytes::copy_from(bytes);
    let data = aligned.as_bytes();
    let dir = read_directory(data, &header)?;
    let cols = decode_columns(data, &dir)?;
    let graph = HeapGraph::from_columns(cols)?;
    debug!(
        objects = graph.object_count(),
        edges = graph.edge_count(),
        digest = %hex::encode(header.body_digest),
        "snapshot decoded"
    );
    Ok(graph)
}

/// Reads table sizes from the header and directory without decoding.
///
/// Checks magic, declared length, and that every section fits in the input;
/// the digest is not verified.
///
/// # Errors
///
/// Returns a [`DecodeError`] if the header or directory is unreadable or a
/// section claims more rows than the input can hold.
pub fn peek_counts(bytes: &[u8]) -> Result<GraphCounts, DecodeError> {
    let header = read_header(bytes)?;
    let dir = read_directory(bytes, &header)?;
    section_rows::<Range>(bytes, &dir.string_spans, "string_spans")?;
    section_rows::<ClassFieldRow>(bytes, &dir.class_fields, "class_fields")?;
    Ok(GraphCounts {
        classes: section_rows::<ClassRow>(bytes, &dir.classes, "classes")?,
        objects: section_rows::<ObjectRow>(bytes, &dir.objects, "objects")?,
        edges: section_rows::<EdgeRow>(bytes, &dir.edges, "edges")?,
        primitives: section_rows::<PrimRow>(bytes, &dir.prims, "prims")?,
        roots: section_rows::<RootRow>(bytes, &dir.roots, "roots")?,
        string_bytes: section_rows::<u8>(bytes, &dir.string_bytes, "string_bytes")?,
    })
}

/// Row count of `section` once its byte extent is known to fit in `bytes`.
fn section_rows<T>(bytes: &[u8], section: &Section, name: &'static str) -> Result<u64, DecodeError> {
    let count = section.count();
    let length = count.saturating_mul(std::mem::size_of::<T>() as u64);
    read_bytes(bytes, section.off(), length, name)?;
    Ok(count)
}

/// Owned copy of the input with 8-byte alignment.
struct AlignedBytes {
    words: Vec<u64>,
    len: usize,
}

impl AlignedBytes {
    fn copy_from(bytes: &[u8]) -> Self {
        let mut words = vec![0u64; bytes.len().div_ceil(8)];
        bytemuck::cast_slice_mut::<u64, u8>(&mut words)[..bytes.len()].copy_from_slice(bytes);
        Self {
            words,
            len: bytes.len(),
        }
    }

    fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u64, u8>(&self.words)[..self.len]
    }
}

#[allow(clippy::too_many_lines, clippy::cast_possible_truncation)]
fn decode_columns(data: &[u8], dir: &HscDirectory) -> Result<GraphColumns, DecodeError> {
    let spans: &[Range] = read_slice(data, dir.string_spans.off(), dir.string_spans.count(), "string_spans")?;
    let string_bytes = read_bytes(data, dir.string_bytes.off(), dir.string_bytes.count(), "string_bytes")?;
    let classes: &[ClassRow] = read_slice(data, dir.classes.off(), dir.classes.count(), "classes")?;
    let class_fields: &[ClassFieldRow] =
        read_slice(data, dir.class_fields.off(), dir.class_fields.count(), "class_fields")?;
    let objects: &[ObjectRow] = read_slice(data, dir.objects.off(), dir.objects.count(), "objects")?;
    let edges: &[EdgeRow] = read_slice(data, dir.edges.off(), dir.edges.count(), "edges")?;
    let prims: &[PrimRow] = read_slice(data, dir.prims.off(), dir.prims.count(), "prims")?;
    let roots: &[RootRow] = read_slice(data, dir.roots.off(), dir.roots.count(), "roots")?;

    // Strings.
    let span_offsets = contiguous_offsets(spans.iter(), "string_spans", "string_bytes", string_bytes.len())?;
    let mut strings = StringTable::new();
    for (i, w) in span_offsets.windows(2).enumerate() {
        let text = std::str::from_utf8(&string_bytes[w[0]..w[1]])
            .map_err(|_| DecodeError::InvalidUtf8 { index: i })?;
        strings.push(text);
    }

    // Classes.
    let mut cols = GraphColumns {
        strings,
        ..GraphColumns::default()
    };
    for (i, row) in classes.iter().enumerate() {
        if row.reserved != [0; 3] {
            return Err(reserved("classes", i));
        }
        if row.flags & !ClassRow::FLAG_HAS_SUPER != 0 {
            return Err(DecodeError::InvalidTag {
                column: "class_flags",
                tag: row.flags,
                index: i,
            });
        }
        cols.class_ids.push(ClassId(row.class_id()));
        cols.class_names.push(row.name());
        cols.class_supers.push(row.super_id().map(ClassId));
    }
    cols.class_field_offsets = contiguous_offsets(
        classes.iter().map(|c| &c.fields),
        "classes",
        "class_fields",
        class_fields.len(),
    )?;
    for (i, row) in class_fields.iter().enumerate() {
        if row.reserved != [0; 4] {
            return Err(reserved("class_fields", i));
        }
        cols.class_field_names.push(row.name());
    }

    // Objects.
    for row in objects {
        cols.object_ids.push(ObjectId(row.object_id()));
        cols.object_classes.push(ClassId(row.class_id()));
        cols.shallow_sizes.push(row.shallow());
    }
    cols.edge_offsets = contiguous_offsets(objects.iter().map(|o| &o.edges), "objects", "edges", edges.len())?;
    cols.prim_offsets = contiguous_offsets(objects.iter().map(|o| &o.prims), "objects", "prims", prims.len())?;

    // Edges.
    for (i, row) in edges.iter().enumerate() {
        if row.reserved != [0; 2] {
            return Err(reserved("edges", i));
        }
        let label = row.label();
        let raw = match row.label_kind {
            EdgeRow::LABEL_FIELD => label,
            EdgeRow::LABEL_INDEX if label & LABEL_INDEX_BIT == 0 => label | LABEL_INDEX_BIT,
            tag => {
                return Err(DecodeError::InvalidTag {
                    column: "edge_label_kind",
                    tag,
                    index: i,
                })
            }
        };
        cols.edge_targets.push(ObjectId(row.target_id()));
        cols.edge_labels.push(raw);
        cols.edge_types.push(row.field_type);
    }

    // Primitive fields.
    for (i, row) in prims.iter().enumerate() {
        if row.reserved != [0; 3] {
            return Err(reserved("prims", i));
        }
        cols.prim_names.push(row.name());
        cols.prim_tags.push(row.tag);
        cols.prim_bits.push(row.bits());
    }

    // Roots.
    for (i, row) in roots.iter().enumerate() {
        if row.reserved != [0; 7] {
            return Err(reserved("roots", i));
        }
        let kind = RootKind::from_tag(row.kind).ok_or(DecodeError::InvalidTag {
            column: "root_kind",
            tag: row.kind,
            index: i,
        })?;
        cols.roots.push((ObjectId(row.object_id()), kind));
    }
    Ok(cols)
}

fn reserved(field: &'static str, index: usize) -> DecodeError {
    DecodeError::NonZeroReservedBytes { field, index }
}

/// Checks that `ranges` tile `0..data_len` in order and returns the
/// boundaries (`ranges.len() + 1` entries, starting at zero).
#[allow(clippy::cast_possible_truncation)]
fn contiguous_offsets<'a>(
    ranges: impl ExactSizeIterator<Item = &'a Range>,
    index_name: &'static str,
    data_name: &'static str,
    data_len: usize,
) -> Result<Vec<usize>, DecodeError> {
    let mut offsets = Vec::with_capacity(ranges.len() + 1);
    offsets.push(0usize);
    let mut cursor = 0u64;
    let count = ranges.len();
    for (i, range) in ranges.enumerate() {
        let end = range.end();
        let invalid = || DecodeError::IndexRangeOutOfBounds {
            index_name,
            entry_index: i,
            start: range.start(),
            end: end.unwrap_or(u64::MAX),
            data_name,
            data_len,
        };
        match end {
            Some(end) if range.start() == cursor && end <= data_len as u64 => {
                cursor = end;
                offsets.push(end as usize);
            }
            _ => return Err(invalid()),
        }
    }
    if cursor != data_len as u64 {
        return Err(DecodeError::IndexRangeOutOfBounds {
            index_name,
            entry_index: count,
            start: cursor,
            end: data_len as u64,
            data_name,
            data_len,
        });
    }
    Ok(offsets)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_possible_truncation)]
mod tests {
    use super::*;
    use crate::graph::BuildError;
    use crate::hsc::encode_snapshot;
    use crate::record::{ClassInfo, EdgeRecord, ObjectRecord, PrimitiveValue};
    use crate::HeapGraphBuilder;

    fn sample() -> HeapGraph {
        let mut b = HeapGraphBuilder::new();
        b.insert_class(
            ClassId(7),
            ClassInfo {
                name: "Node".into(),
                superclass: None,
                instance_fields: vec!["next".into(), "value".into()],
            },
        );
        b.insert_object(
            ObjectId(0x10),
            ObjectRecord::new(ClassId(7), 24)
                .with_edge(EdgeRecord::field("next", ObjectId(0x20)))
                .with_primitive("value", PrimitiveValue::Int(-3)),
        );
        b.insert_object(
            ObjectId(0x20),
            ObjectRecord::new(ClassId(7), 24)
                .with_edge(EdgeRecord::element(4, ObjectId(0x10)))
                .with_edge(EdgeRecord::field("next", ObjectId(0x999))),
        );
        b.add_root(ObjectId(0x10), RootKind::JniGlobal);
        b.build().unwrap()
    }

    /// Rewrites the digest so structural checks are reached.
    fn reseal(bytes: &mut [u8]) {
        let digest = *blake3::hash(&bytes[HEADER_SIZE..]).as_bytes();
        bytes[8..40].copy_from_slice(&digest);
    }

    #[test]
    fn round_trips_sample_graph() {
        let graph = sample();
        let bytes = encode_snapshot(&graph).unwrap();
        let decoded = decode_snapshot(&bytes).unwrap();
        assert_eq!(decoded, graph);
        assert_eq!(decoded.dangling_count(), 1);
        assert_eq!(encode_snapshot(&decoded).unwrap(), bytes);
    }

    #[test]
    fn decodes_unaligned_input() {
        let bytes = encode_snapshot(&sample()).unwrap();
        let mut shifted = vec![0u8; 3];
        shifted.extend_from_slice(&bytes);
        assert_eq!(decode_snapshot(&shifted[3..]).unwrap(), sample());
    }

    #[test]
    fn detects_corruption_and_truncation() {
        let mut bytes = encode_snapshot(&sample()).unwrap();
        assert!(matches!(
            decode_snapshot(&bytes[..bytes.len() - 8]),
            Err(DecodeError::LengthMismatch { .. })
        ));
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert!(matches!(decode_snapshot(&bytes), Err(DecodeError::DigestMismatch)));
    }

    #[test]
    fn rejects_bad_root_kind() {
        let graph = sample();
        let mut bytes = encode_snapshot(&graph).unwrap();
        let header = read_header(&bytes).unwrap();
        let dir = read_directory(&bytes, &header).unwrap();
        bytes[dir.roots.off() as usize + 8] = 200;
        reseal(&mut bytes);
        assert!(matches!(
            decode_snapshot(&bytes),
            Err(DecodeError::InvalidTag { column: "root_kind", tag: 200, index: 0 })
        ));
    }

    #[test]
    fn rejects_unknown_root_object() {
        let graph = sample();
        let mut bytes = encode_snapshot(&graph).unwrap();
        let header = read_header(&bytes).unwrap();
        let dir = read_directory(&bytes, &header).unwrap();
        let at = dir.roots.off() as usize;
        bytes[at..at + 8].copy_from_slice(&0x5555u64.to_le_bytes());
        reseal(&mut bytes);
        assert!(matches!(
            decode_snapshot(&bytes),
            Err(DecodeError::Graph(BuildError::UnknownRootObject(ObjectId(0x5555))))
        ));
    }

    #[test]
    fn rejects_gapped_edge_ranges() {
        let graph = sample();
        let mut bytes = encode_snapshot(&graph).unwrap();
        let header = read_header(&bytes).unwrap();
        let dir = read_directory(&bytes, &header).unwrap();
        // Second object's edge range start (object row offset 24).
        let at = dir.objects.off() as usize + std::mem::size_of::<ObjectRow>() + 24;
        bytes[at..at + 8].copy_from_slice(&2u64.to_le_bytes());
        reseal(&mut bytes);
        assert!(matches!(
            decode_snapshot(&bytes),
            Err(DecodeError::IndexRangeOutOfBounds { index_name: "objects", entry_index: 1, .. })
        ));
    }

    #[test]
    fn peek_reports_table_sizes() {
        let graph = sample();
        let bytes = encode_snapshot(&graph).unwrap();
        let counts = peek_counts(&bytes).unwrap();
        assert_eq!(counts, graph.counts());
    }

    #[test]
    fn peek_rejects_counts_larger_than_the_input() {
        let graph = sample();
        let mut bytes = encode_snapshot(&graph).unwrap();
        let header = read_header(&bytes).unwrap();
        let objects_count_at =
            header.dir_off() as usize + std::mem::offset_of!(HscDirectory, objects) + 8;
        bytes[objects_count_at..objects_count_at + 8].copy_from_slice(&(1u64 << 40).to_le_bytes());
        assert!(matches!(
            peek_counts(&bytes),
            Err(DecodeError::SectionOutOfBounds { name: "objects", .. })
        ));

        let mut bytes = encode_snapshot(&graph).unwrap();
        let edges_count_at =
            header.dir_off() as usize + std::mem::offset_of!(HscDirectory, edges) + 8;
        bytes[edges_count_at..edges_count_at + 8].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(
            peek_counts(&bytes),
            Err(DecodeError::SectionOutOfBounds { name: "edges", .. })
        ));
    }
}
