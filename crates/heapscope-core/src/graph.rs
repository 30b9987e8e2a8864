// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Compact, immutable heap reference graph.
//!
//! [`HeapGraph`] stores objects, classes, edges, primitive fields, and GC
//! roots as fixed-width columns indexed by dense slot numbers. Outgoing and
//! incoming adjacency are both CSR tables (`offsets` + flat data), so every
//! per-object lookup is a pair of slice reads. Once built the graph exposes
//! no mutation API and can be shared across threads behind an `Arc`.
//!
//! Graphs are produced either by [`HeapGraphBuilder`](crate::HeapGraphBuilder)
//! or by [`decode_snapshot`](crate::hsc::decode_snapshot); both funnel through
//! [`HeapGraph::from_columns`], which owns every structural check.

use thiserror::Error;
use tracing::{debug, warn};

use crate::ident::{ClassId, ObjectId, Slot, NO_SLOT};
use crate::record::{
    ClassInfo, EdgeLabel, EdgeRecord, FieldType, GcRoot, ObjectRecord, PrimitiveField,
    PrimitiveValue, RootKind,
};
use crate::slot_index::SlotIndex;
use crate::strings::StringTable;
use crate::visit::{DenseBitSet, VisitSet};

/// Largest object count a graph can hold; the top two slot values are sentinels.
pub(crate) const MAX_OBJECTS: usize = (NO_SLOT - 1) as usize;

/// Bit set in an edge label column entry when the label is an array index.
pub(crate) const LABEL_INDEX_BIT: u32 = 1 << 31;

/// Error returned when graph columns violate a structural invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Two columns that must be parallel have different lengths.
    #[error("column {column} has {actual} entries, expected {expected}")]
    ColumnMismatch {
        /// Column name.
        column: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },
    /// Identifiers are not strictly ascending.
    #[error("{kind} identifiers not strictly ascending at index {index}")]
    OrderingViolation {
        /// `"class"` or `"object"`.
        kind: &'static str,
        /// Offending position.
        index: usize,
    },
    /// An object references a class that is not in the graph.
    #[error("object {object} has unknown class {class}")]
    UnknownClass {
        /// Offending object.
        object: ObjectId,
        /// Missing class.
        class: ClassId,
    },
    /// A class names a superclass that is not in the graph.
    #[error("class {class} has unknown superclass {superclass}")]
    UnknownSuperclass {
        /// Offending class.
        class: ClassId,
        /// Missing superclass.
        superclass: ClassId,
    },
    /// A GC root names an object that is not in the graph.
    #[error("gc root references unknown object {0}")]
    UnknownRootObject(ObjectId),
    /// Array index does not fit in the label encoding.
    #[error("object {object} has array index {index} beyond the supported range")]
    ArrayIndexTooLarge {
        /// Offending object.
        object: ObjectId,
        /// Index value.
        index: u32,
    },
    /// More distinct names than the label encoding can address.
    #[error("string table has {0} entries, exceeding the label encoding limit")]
    TooManyStrings(usize),
    /// A column refers to a string index past the end of the table.
    #[error("{column} references string {index}, table has {len}")]
    StringIndexOutOfRange {
        /// Column name.
        column: &'static str,
        /// Referenced index.
        index: u32,
        /// Table length.
        len: usize,
    },
    /// Unknown field-type or primitive tag.
    #[error("invalid {column} tag {tag} at index {index}")]
    InvalidTag {
        /// Column name.
        column: &'static str,
        /// Tag value.
        tag: u8,
        /// Row index.
        index: usize,
    },
    /// A CSR offset table is not monotonic or does not cover its data column.
    #[error("offset table {column} is malformed at entry {index}")]
    MalformedOffsets {
        /// Column name.
        column: &'static str,
        /// Offending entry.
        index: usize,
    },
    /// The graph has more objects than a slot can address.
    #[error("{0} objects exceed the slot address space")]
    TooManyObjects(usize),
}

/// Size summary used for memory-ceiling checks before and after decoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GraphCounts {
    /// Number of classes.
    pub classes: u64,
    /// Number of objects.
    pub objects: u64,
    /// Number of outgoing edges.
    pub edges: u64,
    /// Number of primitive field values.
    pub primitives: u64,
    /// Number of GC root entries.
    pub roots: u64,
    /// Bytes of interned names.
    pub string_bytes: u64,
}

impl GraphCounts {
    /// Estimated resident bytes of a [`HeapGraph`] with these counts.
    ///
    /// Mirrors the column widths of the store (sparse-id layout; a direct
    /// slot table adds at most eight bytes per object on top).
    #[must_use]
    pub fn estimated_graph_bytes(&self) -> u64 {
        const PER_OBJECT: u64 = 8 + 4 + 8 + 8 + 8 + 8 + 1;
        const PER_EDGE: u64 = 4 + 4 + 1 + 4 + 8;
        const PER_PRIMITIVE: u64 = 4 + 1 + 8;
        const PER_CLASS: u64 = 8 + 4 + 4 + 8 + 4 * 8;
        self.objects
            .saturating_mul(PER_OBJECT)
            .saturating_add(self.edges.saturating_mul(PER_EDGE))
            .saturating_add(self.primitives.saturating_mul(PER_PRIMITIVE))
            .saturating_add(self.classes.saturating_mul(PER_CLASS))
            .saturating_add(self.roots.saturating_mul(8))
            .saturating_add(self.string_bytes.saturating_mul(2))
    }
}

/// Estimated resident bytes of a graph with the given counts.
///
/// Used to reject a snapshot before decoding it.
#[must_use]
pub fn estimate_bytes(counts: &GraphCounts) -> u64 {
    counts.estimated_graph_bytes()
}

/// Raw columns keyed by identifiers, before slot resolution.
///
/// Builders and the snapshot decoder fill this; [`HeapGraph::from_columns`]
/// validates it and resolves identifiers to slots.
#[derive(Debug, Default)]
pub(crate) struct GraphColumns {
    pub(crate) strings: StringTable,
    pub(crate) class_ids: Vec<ClassId>,
    pub(crate) class_names: Vec<u32>,
    pub(crate) class_supers: Vec<Option<ClassId>>,
    pub(crate) class_field_offsets: Vec<usize>,
    pub(crate) class_field_names: Vec<u32>,
    pub(crate) object_ids: Vec<ObjectId>,
    pub(crate) object_classes: Vec<ClassId>,
    pub(crate) shallow_sizes: Vec<u64>,
    pub(crate) edge_offsets: Vec<usize>,
    pub(crate) edge_targets: Vec<ObjectId>,
    pub(crate) edge_labels: Vec<u32>,
    pub(crate) edge_types: Vec<u8>,
    pub(crate) prim_offsets: Vec<usize>,
    pub(crate) prim_names: Vec<u32>,
    pub(crate) prim_tags: Vec<u8>,
    pub(crate) prim_bits: Vec<u64>,
    pub(crate) roots: Vec<(ObjectId, RootKind)>,
}

/// Label of an edge borrowed from the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelRef<'a> {
    /// Named field.
    Field(&'a str),
    /// Array element.
    Index(u32),
}

impl LabelRef<'_> {
    /// Owned copy of the label.
    #[must_use]
    pub fn to_label(self) -> EdgeLabel {
        match self {
            Self::Field(name) => EdgeLabel::Field(name.to_owned()),
            Self::Index(i) => EdgeLabel::Index(i),
        }
    }
}

impl std::fmt::Display for LabelRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Index(i) => write!(f, "[{i}]"),
        }
    }
}

/// Borrowed handle to one outgoing edge.
#[derive(Clone, Copy, Debug)]
pub struct EdgeRef<'a> {
    graph: &'a HeapGraph,
    index: usize,
}

impl<'a> EdgeRef<'a> {
    /// Global edge index (position in the outgoing-edge table).
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Target slot, or `None` for a dangling reference.
    #[must_use]
    pub fn target_slot(&self) -> Option<Slot> {
        let slot = self.graph.edge_targets[self.index];
        (slot != NO_SLOT).then_some(slot)
    }

    /// Target identifier (also available for dangling references).
    #[must_use]
    pub fn target_id(&self) -> ObjectId {
        match self.target_slot() {
            Some(slot) => self.graph.object_ids[slot as usize],
            None => self.graph.dangling_target(self.index).unwrap_or_default(),
        }
    }

    /// Field name or array index.
    #[must_use]
    pub fn label(&self) -> LabelRef<'a> {
        self.graph.label_of(self.graph.edge_labels[self.index])
    }

    /// Declared field type, if recorded.
    #[must_use]
    pub fn field_type(&self) -> Option<FieldType> {
        FieldType::from_tag(self.graph.edge_types[self.index])
    }
}

/// One entry of the incoming-edge index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InEdge {
    /// Slot of the retaining object.
    pub source: Slot,
    /// Global index of the retaining edge.
    pub edge: usize,
}

/// Immutable columnar heap graph.
#[derive(Clone, Debug, PartialEq)]
pub struct HeapGraph {
    strings: StringTable,
    class_ids: Vec<ClassId>,
    class_names: Vec<u32>,
    class_supers: Vec<Slot>,
    class_field_offsets: Vec<usize>,
    class_field_names: Vec<u32>,
    object_ids: Vec<ObjectId>,
    object_classes: Vec<Slot>,
    shallow_sizes: Vec<u64>,
    edge_offsets: Vec<usize>,
    edge_targets: Vec<Slot>,
    edge_labels: Vec<u32>,
    edge_types: Vec<u8>,
    /// `(edge index, raw target)` for unresolved targets, ascending by edge index.
    dangling: Vec<(usize, ObjectId)>,
    in_offsets: Vec<usize>,
    in_sources: Vec<Slot>,
    in_edges: Vec<usize>,
    prim_offsets: Vec<usize>,
    prim_names: Vec<u32>,
    prim_tags: Vec<u8>,
    prim_bits: Vec<u64>,
    roots: Vec<(Slot, RootKind)>,
    root_mask: DenseBitSet,
    slot_index: SlotIndex,
}

fn check_len(column: &'static str, expected: usize, actual: usize) -> Result<(), BuildError> {
    if expected == actual {
        Ok(())
    } else {
        Err(BuildError::ColumnMismatch {
            column,
            expected,
            actual,
        })
    }
}

fn check_offsets(column: &'static str, offsets: &[usize], data_len: usize) -> Result<(), BuildError> {
    if offsets.first() != Some(&0) {
        return Err(BuildError::MalformedOffsets { column, index: 0 });
    }
    for (i, w) in offsets.windows(2).enumerate() {
        if w[0] > w[1] {
            return Err(BuildError::MalformedOffsets { column, index: i + 1 });
        }
    }
    if offsets.last() != Some(&data_len) {
        return Err(BuildError::MalformedOffsets {
            column,
            index: offsets.len().saturating_sub(1),
        });
    }
    Ok(())
}

fn check_string(column: &'static str, index: u32, len: usize) -> Result<(), BuildError> {
    if (index as usize) < len {
        Ok(())
    } else {
        Err(BuildError::StringIndexOutOfRange { column, index, len })
    }
}

fn check_ascending<T: Ord>(kind: &'static str, ids: &[T]) -> Result<(), BuildError> {
    for (i, w) in ids.windows(2).enumerate() {
        if w[0] >= w[1] {
            return Err(BuildError::OrderingViolation { kind, index: i + 1 });
        }
    }
    Ok(())
}

impl HeapGraph {
    /// Validates raw columns and resolves identifiers into slots.
    ///
    /// Dangling edge targets are kept (with their raw identifiers) and
    /// logged; every other unresolved reference is an error.
    #[allow(clippy::too_many_lines, clippy::cast_possible_truncation)]
    pub(crate) fn from_columns(cols: GraphColumns) -> Result<Self, BuildError> {
        let GraphColumns {
            strings,
            class_ids,
            class_names,
            class_supers,
            class_field_offsets,
            class_field_names,
            object_ids,
            object_classes,
            shallow_sizes,
            edge_offsets,
            edge_targets,
            edge_labels,
            edge_types,
            prim_offsets,
            prim_names,
            prim_tags,
            prim_bits,
            roots,
        } = cols;

        let string_count = strings.len();
        if string_count >= LABEL_INDEX_BIT as usize {
            return Err(BuildError::TooManyStrings(string_count));
        }
        if object_ids.len() >= MAX_OBJECTS {
            return Err(BuildError::TooManyObjects(object_ids.len()));
        }

        // Classes.
        let class_count = class_ids.len();
        check_len("class_names", class_count, class_names.len())?;
        check_len("class_supers", class_count, class_supers.len())?;
        check_len("class_field_offsets", class_count + 1, class_field_offsets.len())?;
        check_offsets("class_field_offsets", &class_field_offsets, class_field_names.len())?;
        check_ascending("class", &class_ids)?;
        for &name in class_names.iter().chain(&class_field_names) {
            check_string("class names", name, string_count)?;
        }
        let class_slot_of = |id: ClassId| class_ids.binary_search(&id).ok().map(|s| s as Slot);
        let mut resolved_supers = Vec::with_capacity(class_count);
        for (i, sup) in class_supers.iter().enumerate() {
            resolved_supers.push(match sup {
                None => NO_SLOT,
                Some(sup) => class_slot_of(*sup).ok_or(BuildError::UnknownSuperclass {
                    class: class_ids[i],
                    superclass: *sup,
                })?,
            });
        }

        // Objects.
        let object_count = object_ids.len();
        check_len("object_classes", object_count, object_classes.len())?;
        check_len("shallow_sizes", object_count, shallow_sizes.len())?;
        check_len("edge_offsets", object_count + 1, edge_offsets.len())?;
        check_len("prim_offsets", object_count + 1, prim_offsets.len())?;
        check_ascending("object", &object_ids)?;
        let mut resolved_classes = Vec::with_capacity(object_count);
        for (i, class) in object_classes.iter().enumerate() {
            resolved_classes.push(class_slot_of(*class).ok_or(BuildError::UnknownClass {
                object: object_ids[i],
                class: *class,
            })?);
        }
        let slot_index = SlotIndex::build(&object_ids);

        // Outgoing edges.
        let edge_count = edge_targets.len();
        check_len("edge_labels", edge_count, edge_labels.len())?;
        check_len("edge_types", edge_count, edge_types.len())?;
        check_offsets("edge_offsets", &edge_offsets, edge_count)?;
        let mut resolved_targets = Vec::with_capacity(edge_count);
        let mut dangling = Vec::new();
        for (i, target) in edge_targets.iter().enumerate() {
            match slot_index.lookup(&object_ids, *target) {
                Some(slot) => resolved_targets.push(slot),
                None => {
                    resolved_targets.push(NO_SLOT);
                    dangling.push((i, *target));
                }
            }
            let label = edge_labels[i];
            if label & LABEL_INDEX_BIT == 0 {
                check_string("edge_labels", label, string_count)?;
            }
            let tag = edge_types[i];
            if tag != 0 && FieldType::from_tag(tag).is_none() {
                return Err(BuildError::InvalidTag {
                    column: "edge_types",
                    tag,
                    index: i,
                });
            }
        }

        // Primitive fields.
        let prim_count = prim_names.len();
        check_len("prim_tags", prim_count, prim_tags.len())?;
        check_len("prim_bits", prim_count, prim_bits.len())?;
        check_offsets("prim_offsets", &prim_offsets, prim_count)?;
        for i in 0..prim_count {
            check_string("prim_names", prim_names[i], string_count)?;
            if PrimitiveValue::from_bits(prim_tags[i], prim_bits[i]).is_none() {
                return Err(BuildError::InvalidTag {
                    column: "prim_tags",
                    tag: prim_tags[i],
                    index: i,
                });
            }
        }

        // Roots.
        let mut resolved_roots = Vec::with_capacity(roots.len());
        let mut root_mask = DenseBitSet::with_len(object_count);
        for (object, kind) in &roots {
            let slot = slot_index
                .lookup(&object_ids, *object)
                .ok_or(BuildError::UnknownRootObject(*object))?;
            root_mask.set(slot as usize);
            resolved_roots.push((slot, *kind));
        }

        // Incoming-edge index: counting sort by target, stable in edge order.
        let mut in_offsets = vec![0usize; object_count + 1];
        for &t in &resolved_targets {
            if t != NO_SLOT {
                in_offsets[t as usize + 1] += 1;
            }
        }
        for i in 1..in_offsets.len() {
            in_offsets[i] += in_offsets[i - 1];
        }
        let resolved_in = in_offsets[object_count];
        let mut cursor = in_offsets.clone();
        let mut in_sources = vec![0 as Slot; resolved_in];
        let mut in_edges = vec![0usize; resolved_in];
        for source in 0..object_count {
            for edge in edge_offsets[source]..edge_offsets[source + 1] {
                let t = resolved_targets[edge];
                if t == NO_SLOT {
                    continue;
                }
                let at = cursor[t as usize];
                in_sources[at] = source as Slot;
                in_edges[at] = edge;
                cursor[t as usize] += 1;
            }
        }

        if !dangling.is_empty() {
            warn!(
                dangling = dangling.len(),
                edges = edge_count,
                "heap graph contains references to objects missing from the snapshot"
            );
        }
        debug!(
            classes = class_count,
            objects = object_count,
            edges = edge_count,
            primitives = prim_count,
            roots = resolved_roots.len(),
            direct_index = slot_index.is_direct(),
            "heap graph built"
        );

        Ok(Self {
            strings,
            class_ids,
            class_names,
            class_supers: resolved_supers,
            class_field_offsets,
            class_field_names,
            object_ids,
            object_classes: resolved_classes,
            shallow_sizes,
            edge_offsets,
            edge_targets: resolved_targets,
            edge_labels,
            edge_types,
            dangling,
            in_offsets,
            in_sources,
            in_edges,
            prim_offsets,
            prim_names,
            prim_tags,
            prim_bits,
            roots: resolved_roots,
            root_mask,
            slot_index,
        })
    }

    // ── sizes ────────────────────────────────────────────────────────────

    /// Number of objects (slots).
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.object_ids.len()
    }

    /// Number of classes.
    #[must_use]
    pub fn class_count(&self) -> usize {
        self.class_ids.len()
    }

    /// Number of outgoing edges, dangling ones included.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_targets.len()
    }

    /// Number of edges whose target is missing from the graph.
    #[must_use]
    pub fn dangling_count(&self) -> usize {
        self.dangling.len()
    }

    /// Counts used for resource checks.
    #[must_use]
    pub fn counts(&self) -> GraphCounts {
        GraphCounts {
            classes: self.class_count() as u64,
            objects: self.object_count() as u64,
            edges: self.edge_count() as u64,
            primitives: self.prim_names.len() as u64,
            roots: self.roots.len() as u64,
            string_bytes: self.strings.byte_len() as u64,
        }
    }

    /// Estimated resident bytes, including the slot index.
    #[must_use]
    pub fn estimated_bytes(&self) -> u64 {
        self.counts()
            .estimated_graph_bytes()
            .saturating_add(self.slot_index.heap_bytes() as u64)
    }

    // ── objects ──────────────────────────────────────────────────────────

    /// Resolves an object identifier to its slot.
    #[must_use]
    pub fn slot_of(&self, id: ObjectId) -> Option<Slot> {
        self.slot_index.lookup(&self.object_ids, id)
    }

    /// Identifier of the object in `slot`.
    #[must_use]
    pub fn object_id(&self, slot: Slot) -> ObjectId {
        self.object_ids[slot as usize]
    }

    /// Object identifiers in slot order (ascending).
    #[must_use]
    pub fn object_ids(&self) -> &[ObjectId] {
        &self.object_ids
    }

    /// Class slot of the object in `slot`.
    #[must_use]
    pub fn class_of(&self, slot: Slot) -> Slot {
        self.object_classes[slot as usize]
    }

    /// Shallow size of the object in `slot`.
    #[must_use]
    pub fn shallow_size(&self, slot: Slot) -> u64 {
        self.shallow_sizes[slot as usize]
    }

    /// Shallow sizes in slot order.
    #[must_use]
    pub fn shallow_sizes(&self) -> &[u64] {
        &self.shallow_sizes
    }

    /// Raw target slots of the outgoing edges of `slot`, in canonical order.
    ///
    /// Dangling targets appear as `Slot::MAX`; use [`Self::referents`] to skip them.
    #[must_use]
    pub fn out_targets(&self, slot: Slot) -> &[Slot] {
        let s = slot as usize;
        &self.edge_targets[self.edge_offsets[s]..self.edge_offsets[s + 1]]
    }

    /// Resolved targets of the outgoing edges of `slot`, in canonical order.
    pub fn referents(&self, slot: Slot) -> impl Iterator<Item = Slot> + '_ {
        self.out_targets(slot)
            .iter()
            .copied()
            .filter(|&t| t != NO_SLOT)
    }

    /// Outgoing edges of `slot`, in canonical order.
    pub fn out_edges(&self, slot: Slot) -> impl ExactSizeIterator<Item = EdgeRef<'_>> + '_ {
        let s = slot as usize;
        (self.edge_offsets[s]..self.edge_offsets[s + 1]).map(move |index| EdgeRef {
            graph: self,
            index,
        })
    }

    /// Handle to the edge with global index `index`.
    #[must_use]
    pub fn edge(&self, index: usize) -> EdgeRef<'_> {
        EdgeRef { graph: self, index }
    }

    /// Number of outgoing edges of `slot`.
    #[must_use]
    pub fn out_degree(&self, slot: Slot) -> usize {
        let s = slot as usize;
        self.edge_offsets[s + 1] - self.edge_offsets[s]
    }

    /// Slots of the objects referencing `slot`, one per incoming edge, in index order.
    #[must_use]
    pub fn in_sources(&self, slot: Slot) -> &[Slot] {
        let s = slot as usize;
        &self.in_sources[self.in_offsets[s]..self.in_offsets[s + 1]]
    }

    /// Incoming edges of `slot`, in index order (source slot, then edge order).
    pub fn in_edges(&self, slot: Slot) -> impl ExactSizeIterator<Item = InEdge> + '_ {
        let s = slot as usize;
        let range = self.in_offsets[s]..self.in_offsets[s + 1];
        self.in_sources[range.clone()]
            .iter()
            .zip(&self.in_edges[range])
            .map(|(&source, &edge)| InEdge { source, edge })
    }

    /// Number of incoming edges of `slot`.
    #[must_use]
    pub fn in_degree(&self, slot: Slot) -> usize {
        let s = slot as usize;
        self.in_offsets[s + 1] - self.in_offsets[s]
    }

    /// Primitive field values of `slot`, in canonical order.
    pub fn primitives(&self, slot: Slot) -> impl Iterator<Item = (&str, PrimitiveValue)> + '_ {
        let s = slot as usize;
        (self.prim_offsets[s]..self.prim_offsets[s + 1]).filter_map(move |i| {
            PrimitiveValue::from_bits(self.prim_tags[i], self.prim_bits[i])
                .map(|v| (self.strings.get(self.prim_names[i]), v))
        })
    }

    // ── classes ──────────────────────────────────────────────────────────

    /// Resolves a class identifier to its slot.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn class_slot_of(&self, id: ClassId) -> Option<Slot> {
        self.class_ids.binary_search(&id).ok().map(|s| s as Slot)
    }

    /// Identifier of the class in `class_slot`.
    #[must_use]
    pub fn class_id(&self, class_slot: Slot) -> ClassId {
        self.class_ids[class_slot as usize]
    }

    /// Name of the class in `class_slot`.
    #[must_use]
    pub fn class_name(&self, class_slot: Slot) -> &str {
        self.strings.get(self.class_names[class_slot as usize])
    }

    /// Superclass slot of `class_slot`, if any.
    #[must_use]
    pub fn superclass(&self, class_slot: Slot) -> Option<Slot> {
        let sup = self.class_supers[class_slot as usize];
        (sup != NO_SLOT).then_some(sup)
    }

    /// Declared instance field names of `class_slot` (not including superclasses).
    pub fn declared_fields(&self, class_slot: Slot) -> impl ExactSizeIterator<Item = &str> + '_ {
        let c = class_slot as usize;
        self.class_field_names[self.class_field_offsets[c]..self.class_field_offsets[c + 1]]
            .iter()
            .map(|&n| self.strings.get(n))
    }

    /// Class slots whose name equals `name`, ascending.
    #[allow(clippy::cast_possible_truncation)]
    pub fn classes_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = Slot> + 'a {
        (0..self.class_ids.len())
            .filter(move |&c| self.strings.get(self.class_names[c]) == name)
            .map(|c| c as Slot)
    }

    // ── roots ────────────────────────────────────────────────────────────

    /// GC root entries as `(slot, kind)`, in insertion order.
    #[must_use]
    pub fn roots(&self) -> &[(Slot, RootKind)] {
        &self.roots
    }

    /// Returns `true` if `slot` is a GC root.
    #[must_use]
    pub fn is_root(&self, slot: Slot) -> bool {
        self.root_mask.test(slot as usize)
    }

    /// Root kinds recorded for `slot` (empty when not a root).
    #[must_use]
    pub fn root_kinds(&self, slot: Slot) -> Vec<RootKind> {
        if !self.is_root(slot) {
            return Vec::new();
        }
        let mut kinds: Vec<RootKind> = self
            .roots
            .iter()
            .filter(|(s, _)| *s == slot)
            .map(|(_, k)| *k)
            .collect();
        kinds.sort_unstable();
        kinds.dedup();
        kinds
    }

    // ── materialisation ──────────────────────────────────────────────────

    /// Owned class description for `class_slot`.
    #[must_use]
    pub fn class_info(&self, class_slot: Slot) -> ClassInfo {
        ClassInfo {
            name: self.class_name(class_slot).to_owned(),
            superclass: self.superclass(class_slot).map(|s| self.class_id(s)),
            instance_fields: self
                .declared_fields(class_slot)
                .map(str::to_owned)
                .collect(),
        }
    }

    /// Owned object record for `slot`.
    #[must_use]
    pub fn object_record(&self, slot: Slot) -> ObjectRecord {
        ObjectRecord {
            class: self.class_id(self.class_of(slot)),
            shallow_size: self.shallow_size(slot),
            edges: self
                .out_edges(slot)
                .map(|e| EdgeRecord {
                    target: e.target_id(),
                    label: e.label().to_label(),
                    field_type: e.field_type(),
                })
                .collect(),
            primitives: self
                .primitives(slot)
                .map(|(name, value)| PrimitiveField {
                    name: name.to_owned(),
                    value,
                })
                .collect(),
        }
    }

    /// GC roots as owned records, in insertion order.
    pub fn gc_roots(&self) -> impl ExactSizeIterator<Item = GcRoot> + '_ {
        self.roots.iter().map(|&(slot, kind)| GcRoot {
            object: self.object_id(slot),
            kind,
        })
    }

    // ── crate-internal access for the codec ──────────────────────────────

    pub(crate) fn strings(&self) -> &StringTable {
        &self.strings
    }

    pub(crate) fn class_name_index(&self, class_slot: Slot) -> u32 {
        self.class_names[class_slot as usize]
    }

    pub(crate) fn class_field_range(&self, class_slot: Slot) -> (usize, usize) {
        let c = class_slot as usize;
        (self.class_field_offsets[c], self.class_field_offsets[c + 1])
    }

    pub(crate) fn class_field_names(&self) -> &[u32] {
        &self.class_field_names
    }

    pub(crate) fn edge_range(&self, slot: Slot) -> (usize, usize) {
        let s = slot as usize;
        (self.edge_offsets[s], self.edge_offsets[s + 1])
    }

    pub(crate) fn raw_edge_label(&self, index: usize) -> u32 {
        self.edge_labels[index]
    }

    pub(crate) fn raw_edge_type(&self, index: usize) -> u8 {
        self.edge_types[index]
    }

    pub(crate) fn prim_range(&self, slot: Slot) -> (usize, usize) {
        let s = slot as usize;
        (self.prim_offsets[s], self.prim_offsets[s + 1])
    }

    pub(crate) fn raw_prim(&self, index: usize) -> (u32, u8, u64) {
        (self.prim_names[index], self.prim_tags[index], self.prim_bits[index])
    }

    fn dangling_target(&self, edge: usize) -> Option<ObjectId> {
        self.dangling
            .binary_search_by_key(&edge, |(e, _)| *e)
            .ok()
            .map(|i| self.dangling[i].1)
    }

    fn label_of(&self, raw: u32) -> LabelRef<'_> {
        if raw & LABEL_INDEX_BIT == 0 {
            LabelRef::Field(self.strings.get(raw))
        } else {
            LabelRef::Index(raw & !LABEL_INDEX_BIT)
        }
    }
}
