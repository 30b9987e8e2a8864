// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! HSC writer.
//!
//! Output is a pure function of the graph: tables are emitted in slot order
//! and every padding byte is zero, so equal graphs encode to equal bytes.

use std::io::{self, Write};

use bytemuck::{Pod, Zeroable};

use super::types::{
    ClassFieldRow, ClassRow, EdgeRow, HscDirectory, HscHeader, ObjectRow, PrimRow, Range, RootRow,
    Section,
};
use crate::graph::{HeapGraph, LABEL_INDEX_BIT};
use crate::ident::Slot;

const HEADER_SIZE: usize = std::mem::size_of::<HscHeader>();
const DIR_SIZE: usize = std::mem::size_of::<HscDirectory>();

/// Encodes `graph` as an HSC snapshot.
///
/// # Errors
///
/// Only the in-memory writer can fail, which does not happen in practice.
#[allow(clippy::cast_possible_truncation)]
pub fn encode_snapshot(graph: &HeapGraph) -> io::Result<Vec<u8>> {
    let strings = graph.strings();
    let mut buf = Vec::with_capacity(HEADER_SIZE + DIR_SIZE + graph.estimated_bytes() as usize);
    write_struct(&mut buf, &HscHeader::zeroed())?;
    write_struct(&mut buf, &HscDirectory::zeroed())?;
    let mut dir = HscDirectory::zeroed();

    dir.string_spans = write_table(
        &mut buf,
        strings.spans().map(|(start, len)| Range::new(start as u64, len as u64)),
    )?;
    let bytes_off = buf.len();
    buf.write_all(strings.as_bytes())?;
    dir.string_bytes = section(bytes_off, strings.byte_len());
    write_padding(&mut buf, 8);

    let class_count = graph.class_count() as Slot;
    dir.classes = write_table(
        &mut buf,
        (0..class_count).map(|c| {
            let (start, end) = graph.class_field_range(c);
            let superclass = graph.superclass(c).map(|s| graph.class_id(s).raw());
            ClassRow {
                class_id_le: graph.class_id(c).raw().to_le(),
                super_id_le: superclass.unwrap_or(0).to_le(),
                name_le: graph.class_name_index(c).to_le(),
                flags: if superclass.is_some() {
                    ClassRow::FLAG_HAS_SUPER
                } else {
                    0
                },
                reserved: [0; 3],
                fields: Range::new(start as u64, (end - start) as u64),
            }
        }),
    )?;
    dir.class_fields = write_table(
        &mut buf,
        graph.class_field_names().iter().map(|&name| ClassFieldRow {
            name_le: name.to_le(),
            reserved: [0; 4],
        }),
    )?;

    let object_count = graph.object_count() as Slot;
    dir.objects = write_table(
        &mut buf,
        (0..object_count).map(|slot| {
            let (es, ee) = graph.edge_range(slot);
            let (ps, pe) = graph.prim_range(slot);
            ObjectRow {
                object_id_le: graph.object_id(slot).raw().to_le(),
                class_id_le: graph.class_id(graph.class_of(slot)).raw().to_le(),
                shallow_le: graph.shallow_size(slot).to_le(),
                edges: Range::new(es as u64, (ee - es) as u64),
                prims: Range::new(ps as u64, (pe - ps) as u64),
            }
        }),
    )?;
    dir.edges = write_table(
        &mut buf,
        (0..graph.edge_count()).map(|i| {
            let raw = graph.raw_edge_label(i);
            let (label, kind) = if raw & LABEL_INDEX_BIT == 0 {
                (raw, EdgeRow::LABEL_FIELD)
            } else {
                (raw & !LABEL_INDEX_BIT, EdgeRow::LABEL_INDEX)
            };
            EdgeRow {
                target_id_le: graph.edge(i).target_id().raw().to_le(),
                label_le: label.to_le(),
                field_type: graph.raw_edge_type(i),
                label_kind: kind,
                reserved: [0; 2],
            }
        }),
    )?;
    let prim_count = graph.counts().primitives as usize;
    dir.prims = write_table(
        &mut buf,
        (0..prim_count).map(|i| {
            let (name, tag, bits) = graph.raw_prim(i);
            PrimRow {
                bits_le: bits.to_le(),
                name_le: name.to_le(),
                tag,
                reserved: [0; 3],
            }
        }),
    )?;
    dir.roots = write_table(
        &mut buf,
        graph.roots().iter().map(|&(slot, kind)| RootRow {
            object_id_le: graph.object_id(slot).raw().to_le(),
            kind: kind.tag(),
            reserved: [0; 7],
        }),
    )?;

    buf[HEADER_SIZE..HEADER_SIZE + DIR_SIZE].copy_from_slice(bytemuck::bytes_of(&dir));
    let mut header = HscHeader::zeroed();
    header.magic = HscHeader::MAGIC_V1;
    header.dir_off_le = (HEADER_SIZE as u64).to_le();
    header.file_len_le = (buf.len() as u64).to_le();
    header.body_digest = *blake3::hash(&buf[HEADER_SIZE..]).as_bytes();
    buf[..HEADER_SIZE].copy_from_slice(bytemuck::bytes_of(&header));
    Ok(buf)
}

fn section(off: usize, count: usize) -> Section {
    Section {
        off_le: (off as u64).to_le(),
        count_le: (count as u64).to_le(),
    }
}

/// Writes rows at the current (aligned) position and returns their section.
fn write_table<T: Pod>(buf: &mut Vec<u8>, rows: impl Iterator<Item = T>) -> io::Result<Section> {
    write_padding(buf, 8);
    let off = buf.len();
    let mut count = 0usize;
    for row in rows {
        write_struct(buf, &row)?;
        count += 1;
    }
    Ok(section(off, count))
}

/// Writes padding zeros until the buffer is aligned to the given boundary.
fn write_padding(buf: &mut Vec<u8>, align: usize) {
    let target = buf.len().next_multiple_of(align);
    buf.resize(target, 0);
}

fn write_struct<T: Pod>(buf: &mut Vec<u8>, value: &T) -> io::Result<()> {
    buf.write_all(bytemuck::bytes_of(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::hsc::read::{read_directory, read_header};
    use crate::HeapGraphBuilder;

    #[test]
    fn empty_graph_produces_header_and_directory() {
        let graph = HeapGraphBuilder::new().build().unwrap();
        let bytes = encode_snapshot(&graph).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + DIR_SIZE);
        assert_eq!(&bytes[0..8], &HscHeader::MAGIC_V1);
        let header = read_header(&bytes).unwrap();
        assert_eq!(header.dir_off(), HEADER_SIZE as u64);
        let dir = read_directory(&bytes, &header).unwrap();
        assert_eq!(dir.objects.count(), 0);
        assert_eq!(header.body_digest, *blake3::hash(&bytes[HEADER_SIZE..]).as_bytes());
    }

    #[test]
    fn padding_keeps_sections_aligned() {
        let mut buf = vec![1u8; 3];
        write_padding(&mut buf, 8);
        assert_eq!(buf, vec![1, 1, 1, 0, 0, 0, 0, 0]);
        write_padding(&mut buf, 8);
        assert_eq!(buf.len(), 8);
    }
}
