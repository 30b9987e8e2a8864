// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Heap graph fixtures.
//!
//! Small hand-shaped graphs for scenario tests plus a seeded generator for
//! property tests. Every fixture panics on build failure: a broken fixture
//! is a broken test.

use std::sync::Arc;

use heapscope_core::{
    AnalysisOptions, ClassId, ClassInfo, EdgeRecord, FixedCategory, HeapAnalysis, HeapGraph,
    HeapGraphBuilder, ObjectId, ObjectRecord, PrimitiveValue, RootKind,
};

use crate::rng::XorShift64;

/// Class id every single-class fixture uses.
pub const NODE_CLASS: ClassId = ClassId(0x1);

fn node_class(builder: &mut HeapGraphBuilder) {
    builder.insert_class(
        NODE_CLASS,
        ClassInfo {
            name: "com.example.Node".to_owned(),
            superclass: None,
            instance_fields: vec!["next".to_owned(), "other".to_owned(), "value".to_owned()],
        },
    );
}

fn build(builder: HeapGraphBuilder) -> HeapGraph {
    match builder.build() {
        Ok(graph) => graph,
        Err(err) => panic!("fixture graph failed to build: {err}"),
    }
}

/// Analyses `graph` with every class categorized as application code and
/// two workers.
pub fn analyse(graph: HeapGraph) -> HeapAnalysis {
    let options = AnalysisOptions {
        workers: 2,
        chunk_size: 4,
        ..AnalysisOptions::default()
    };
    match HeapAnalysis::new(Arc::new(graph), Arc::new(FixedCategory::default()), options) {
        Ok(analysis) => analysis,
        Err(err) => panic!("fixture analysis failed: {err}"),
    }
}

/// Identifiers and sizes of the diamond fixture: `R → A → B`, `R → C → B`.
#[derive(Clone, Copy, Debug)]
pub struct Diamond;

impl Diamond {
    /// Root.
    pub const R: ObjectId = ObjectId(0x100);
    /// Left middle.
    pub const A: ObjectId = ObjectId(0x200);
    /// Shared bottom.
    pub const B: ObjectId = ObjectId(0x300);
    /// Right middle.
    pub const C: ObjectId = ObjectId(0x400);
    /// Shallow sizes of R, A, B, C.
    pub const SIZES: [u64; 4] = [16, 24, 40, 32];
    /// Sum of all shallow sizes.
    pub const TOTAL: u64 = 16 + 24 + 40 + 32;
}

/// Builds the diamond: R is a JNI global root, A and C both point at B.
pub fn diamond_graph() -> HeapGraph {
    let mut b = HeapGraphBuilder::new();
    node_class(&mut b);
    let [r, a, bottom, c] = Diamond::SIZES;
    b.insert_object(
        Diamond::R,
        ObjectRecord::new(NODE_CLASS, r)
            .with_edge(EdgeRecord::field("next", Diamond::A))
            .with_edge(EdgeRecord::field("other", Diamond::C)),
    );
    b.insert_object(
        Diamond::A,
        ObjectRecord::new(NODE_CLASS, a).with_edge(EdgeRecord::field("next", Diamond::B)),
    );
    b.insert_object(
        Diamond::C,
        ObjectRecord::new(NODE_CLASS, c).with_edge(EdgeRecord::field("next", Diamond::B)),
    );
    b.insert_object(
        Diamond::B,
        ObjectRecord::new(NODE_CLASS, bottom).with_primitive("value", PrimitiveValue::Int(7)),
    );
    b.add_root(Diamond::R, RootKind::JniGlobal);
    build(b)
}

/// `len` objects `1 → 2 → … → len`, ids starting at one, object 1 rooted.
/// Object `i` has shallow size `8 * i`.
pub fn chain_graph(len: u64) -> HeapGraph {
    let mut b = HeapGraphBuilder::new();
    node_class(&mut b);
    for i in 1..=len {
        let mut record = ObjectRecord::new(NODE_CLASS, 8 * i);
        if i < len {
            record = record.with_edge(EdgeRecord::field("next", ObjectId(i + 1)));
        }
        b.insert_object(ObjectId(i), record);
    }
    if len > 0 {
        b.add_root(ObjectId(1), RootKind::JavaFrame);
    }
    build(b)
}

/// Same as [`chain_graph`] with the last object pointing back at the first.
pub fn cycle_graph(len: u64) -> HeapGraph {
    let mut b = HeapGraphBuilder::new();
    node_class(&mut b);
    for i in 1..=len {
        let next = if i == len { 1 } else { i + 1 };
        b.insert_object(
            ObjectId(i),
            ObjectRecord::new(NODE_CLASS, 8 * i).with_edge(EdgeRecord::field("next", ObjectId(next))),
        );
    }
    if len > 0 {
        b.add_root(ObjectId(1), RootKind::JavaFrame);
    }
    build(b)
}

/// Shape of a generated graph.
#[derive(Clone, Copy, Debug)]
pub struct RandomGraphParams {
    /// Object count.
    pub objects: u64,
    /// Class count (at least one is used).
    pub classes: u64,
    /// Maximum outgoing references per object.
    pub max_out: u64,
    /// Roots drawn (duplicates allowed).
    pub roots: u64,
    /// One in this many references points at a missing object; zero disables.
    pub dangling_one_in: u64,
}

impl Default for RandomGraphParams {
    fn default() -> Self {
        Self {
            objects: 64,
            classes: 4,
            max_out: 3,
            roots: 3,
            dangling_one_in: 0,
        }
    }
}

/// Generates a graph from `seed`. Same seed and params, same graph.
///
/// Object ids are `10, 20, 30, …` so id-to-slot lookups are not trivially
/// the identity. Some objects carry array-element references, some carry an
/// int primitive; dangling targets use ids that are never allocated.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn random_graph(seed: u64, params: RandomGraphParams) -> HeapGraph {
    let mut rng = XorShift64::new(seed);
    let mut b = HeapGraphBuilder::new();
    let classes = params.classes.max(1);
    for c in 0..classes {
        let name = if c % 2 == 0 {
            format!("com.example.Type{c}")
        } else {
            format!("java.util.Type{c}")
        };
        b.insert_class(
            ClassId(c + 1),
            ClassInfo {
                name,
                superclass: None,
                instance_fields: vec!["f".to_owned(), "n".to_owned()],
            },
        );
    }
    let id = |i: u64| ObjectId((i + 1) * 10);
    for i in 0..params.objects {
        let class = ClassId(rng.below(classes) + 1);
        let mut record = ObjectRecord::new(class, 8 + rng.below(120));
        let out = rng.below(params.max_out + 1);
        let as_array = rng.chance(1, 4);
        for k in 0..out {
            let target = if params.dangling_one_in > 0 && rng.chance(1, params.dangling_one_in) {
                ObjectId(id(params.objects + rng.below(8)).0 + 1)
            } else {
                id(rng.below(params.objects))
            };
            record = record.with_edge(if as_array {
                EdgeRecord::element(k as u32, target)
            } else {
                EdgeRecord::field("f", target)
            });
        }
        if rng.chance(1, 3) {
            record = record.with_primitive("n", PrimitiveValue::Int(rng.below(1000) as i32));
        }
        b.insert_object(id(i), record);
    }
    if params.objects > 0 {
        for _ in 0..params.roots {
            b.add_root(id(rng.below(params.objects)), RootKind::StaticField);
        }
    }
    build(b)
}
