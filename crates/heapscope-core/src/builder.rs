// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Mutable staging area for [`HeapGraph`] construction.

use std::collections::BTreeMap;

use crate::graph::{BuildError, GraphColumns, HeapGraph, LABEL_INDEX_BIT};
use crate::ident::{ClassId, ObjectId};
use crate::record::{ClassInfo, EdgeLabel, GcRoot, ObjectRecord, RootKind};
use crate::strings::StringInterner;

/// Collects classes, objects, and roots, then freezes them into a [`HeapGraph`].
///
/// Insertion order does not matter: records are keyed by identifier and the
/// resulting store orders them ascending. Name interning follows identifier
/// order, so two builders with the same content produce identical graphs.
#[derive(Clone, Debug, Default)]
pub struct HeapGraphBuilder {
    classes: BTreeMap<ClassId, ClassInfo>,
    objects: BTreeMap<ObjectId, ObjectRecord>,
    roots: Vec<GcRoot>,
}

impl HeapGraphBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a class, returning the previous entry.
    pub fn insert_class(&mut self, id: ClassId, info: ClassInfo) -> Option<ClassInfo> {
        self.classes.insert(id, info)
    }

    /// Inserts or replaces an object, returning the previous entry.
    pub fn insert_object(&mut self, id: ObjectId, record: ObjectRecord) -> Option<ObjectRecord> {
        self.objects.insert(id, record)
    }

    /// Adds a GC root entry. An object may be rooted several times.
    pub fn add_root(&mut self, object: ObjectId, kind: RootKind) {
        self.roots.push(GcRoot { object, kind });
    }

    /// Number of staged objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Validates the staged records and produces the immutable store.
    pub fn build(self) -> Result<HeapGraph, BuildError> {
        let mut interner = StringInterner::new();
        let mut cols = GraphColumns {
            class_field_offsets: vec![0],
            edge_offsets: vec![0],
            prim_offsets: vec![0],
            ..GraphColumns::default()
        };

        for (id, info) in &self.classes {
            cols.class_ids.push(*id);
            cols.class_names.push(interner.intern(&info.name));
            cols.class_supers.push(info.superclass);
            for field in &info.instance_fields {
                cols.class_field_names.push(interner.intern(field));
            }
            cols.class_field_offsets.push(cols.class_field_names.len());
        }

        for (id, record) in &self.objects {
            cols.object_ids.push(*id);
            cols.object_classes.push(record.class);
            cols.shallow_sizes.push(record.shallow_size);
            for edge in &record.edges {
                let label = match &edge.label {
                    EdgeLabel::Field(name) => interner.intern(name),
                    EdgeLabel::Index(index) if *index < LABEL_INDEX_BIT => index | LABEL_INDEX_BIT,
                    EdgeLabel::Index(index) => {
                        return Err(BuildError::ArrayIndexTooLarge {
                            object: *id,
                            index: *index,
                        })
                    }
                };
                cols.edge_targets.push(edge.target);
                cols.edge_labels.push(label);
                cols.edge_types.push(edge.field_type.map_or(0, |t| t.tag()));
            }
            cols.edge_offsets.push(cols.edge_targets.len());
            for prim in &record.primitives {
                let (tag, bits) = prim.value.to_bits();
                cols.prim_names.push(interner.intern(&prim.name));
                cols.prim_tags.push(tag);
                cols.prim_bits.push(bits);
            }
            cols.prim_offsets.push(cols.prim_names.len());
        }

        cols.roots = self.roots.iter().map(|r| (r.object, r.kind)).collect();
        cols.strings = interner.finish();
        HeapGraph::from_columns(cols)
    }
}
