// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-object descriptors and field listings.

use serde::Serialize;

use crate::graph::{HeapGraph, LabelRef};
use crate::ident::{ClassId, ObjectId, Slot};
use crate::layout::ClassFieldLayout;
use crate::record::{PrimitiveValue, RootKind};
use crate::traverse::{Dominator, RetainedSizes};

/// Summary of one object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ObjectDescriptor {
    /// Object identifier.
    pub id: ObjectId,
    /// Class identifier.
    pub class_id: ClassId,
    /// Class name.
    pub class_name: String,
    /// Bytes of the object itself.
    pub shallow_size: u64,
    /// Bytes kept alive by the object.
    pub retained_size: u64,
    /// Reachable from some GC root.
    pub reachable: bool,
    /// Immediate dominator; `None` for roots' children of the super-root and
    /// unreachable objects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominator: Option<ObjectId>,
    /// Root kinds when the object is itself a GC root.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub root_kinds: Vec<RootKind>,
    /// Number of outgoing references.
    pub outgoing: usize,
    /// Number of incoming references.
    pub incoming: usize,
}

/// Value held by one field or array slot.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldValue {
    /// Reference to an object in the graph.
    Reference {
        /// Referenced object.
        target: ObjectId,
        /// Its class name.
        class_name: String,
        /// Its shallow size.
        shallow_size: u64,
        /// Its retained size.
        retained_size: u64,
    },
    /// Reference to an object missing from the snapshot.
    Dangling {
        /// Recorded target identifier.
        target: ObjectId,
    },
    /// Primitive value.
    Primitive {
        /// The value.
        value: PrimitiveValue,
    },
    /// Declared field with no recorded value.
    Null,
}

/// One field of an object.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldDescriptor {
    /// Field name, or `[i]` for array elements.
    pub name: String,
    /// Declared type, from the layout side-file or the recorded field type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_type: Option<String>,
    /// Field value.
    pub value: FieldValue,
}

/// Describes the object in `slot`.
#[must_use]
pub fn describe_object(graph: &HeapGraph, retained: &RetainedSizes, slot: Slot) -> ObjectDescriptor {
    let class = graph.class_of(slot);
    ObjectDescriptor {
        id: graph.object_id(slot),
        class_id: graph.class_id(class),
        class_name: graph.class_name(class).to_owned(),
        shallow_size: graph.shallow_size(slot),
        retained_size: retained.retained(slot),
        reachable: retained.is_reachable(slot),
        dominator: match retained.immediate_dominator(slot) {
            Some(Dominator::Object(d)) => Some(graph.object_id(d)),
            _ => None,
        },
        root_kinds: graph.root_kinds(slot),
        outgoing: graph.out_degree(slot),
        incoming: graph.in_degree(slot),
    }
}

struct Named<'g> {
    name: &'g str,
    value: FieldValue,
    recorded_type: Option<&'static str>,
    used: bool,
}

fn reference_value(graph: &HeapGraph, retained: &RetainedSizes, target: Option<Slot>, id: ObjectId) -> FieldValue {
    match target {
        Some(t) => FieldValue::Reference {
            target: id,
            class_name: graph.class_name(graph.class_of(t)).to_owned(),
            shallow_size: graph.shallow_size(t),
            retained_size: retained.retained(t),
        },
        None => FieldValue::Dangling { target: id },
    }
}

/// Declared field names of `class_slot`, superclass fields first.
fn declared_chain(graph: &HeapGraph, class_slot: Slot) -> Vec<&str> {
    let mut chain = vec![class_slot];
    while let Some(sup) = chain.last().and_then(|c| graph.superclass(*c)) {
        if chain.len() > graph.class_count() || chain.contains(&sup) {
            break;
        }
        chain.push(sup);
    }
    chain
        .iter()
        .rev()
        .flat_map(|c| graph.declared_fields(*c))
        .collect()
}

/// Lists the fields of the object in `slot`.
///
/// Order: declared fields (superclass fields first) with their values,
/// then recorded fields the class does not declare, then array elements by
/// index.
#[must_use]
pub fn object_fields(
    graph: &HeapGraph,
    retained: &RetainedSizes,
    layout: Option<&ClassFieldLayout>,
    slot: Slot,
) -> Vec<FieldDescriptor> {
    let class = graph.class_of(slot);
    let mut named: Vec<Named<'_>> = Vec::new();
    let mut elements: Vec<(u32, FieldDescriptor)> = Vec::new();

    for edge in graph.out_edges(slot) {
        let value = reference_value(graph, retained, edge.target_slot(), edge.target_id());
        let recorded_type = edge.field_type().map(|t| t.as_str());
        match edge.label() {
            LabelRef::Field(name) => named.push(Named {
                name,
                value,
                recorded_type,
                used: false,
            }),
            LabelRef::Index(index) => elements.push((
                index,
                FieldDescriptor {
                    name: format!("[{index}]"),
                    declared_type: recorded_type.map(str::to_owned),
                    value,
                },
            )),
        }
    }
    for (name, value) in graph.primitives(slot) {
        named.push(Named {
            name,
            value: FieldValue::Primitive { value },
            recorded_type: Some(value.field_type().as_str()),
            used: false,
        });
    }

    let declared_type = |name: &str, recorded: Option<&'static str>| {
        layout
            .and_then(|l| l.field_type(graph, class, name))
            .or(recorded)
            .map(str::to_owned)
    };

    let mut out = Vec::with_capacity(named.len() + elements.len());
    for field in declared_chain(graph, class) {
        let found = named.iter_mut().find(|n| !n.used && n.name == field);
        let (value, recorded) = match found {
            Some(entry) => {
                entry.used = true;
                (entry.value.clone(), entry.recorded_type)
            }
            None => (FieldValue::Null, None),
        };
        out.push(FieldDescriptor {
            name: field.to_owned(),
            declared_type: declared_type(field, recorded),
            value,
        });
    }
    for entry in named.into_iter().filter(|n| !n.used) {
        out.push(FieldDescriptor {
            name: entry.name.to_owned(),
            declared_type: declared_type(entry.name, entry.recorded_type),
            value: entry.value,
        });
    }
    elements.sort_by_key(|(index, _)| *index);
    out.extend(elements.into_iter().map(|(_, d)| d));
    out
}
