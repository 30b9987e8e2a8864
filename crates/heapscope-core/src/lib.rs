// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! heapscope-core: heap reference graph engine.
//!
//! A captured heap is held as an immutable columnar [`HeapGraph`]: objects
//! and classes addressed by dense slots, outgoing and incoming edges in CSR
//! form, and interned names. On top of it sit the whole-graph retained-size
//! computation ([`RetainedSizes`]), GC-root path search, retainer lookup,
//! the per-class [`BiggestObjectsIndex`], and the [`HeapAnalysis`] query
//! facade that ties them together. Graphs persist through the [`hsc`]
//! snapshot format.
//!
//! ```rust
//! use std::sync::Arc;
//! use heapscope_core::{
//!     AnalysisOptions, ClassId, ClassInfo, EdgeRecord, FixedCategory, HeapAnalysis,
//!     HeapGraphBuilder, ObjectId, ObjectRecord, RootKind,
//! };
//!
//! let mut b = HeapGraphBuilder::new();
//! b.insert_class(ClassId(1), ClassInfo {
//!     name: "Node".into(),
//!     superclass: None,
//!     instance_fields: vec!["next".into()],
//! });
//! b.insert_object(
//!     ObjectId(0x10),
//!     ObjectRecord::new(ClassId(1), 16).with_edge(EdgeRecord::field("next", ObjectId(0x20))),
//! );
//! b.insert_object(ObjectId(0x20), ObjectRecord::new(ClassId(1), 16));
//! b.add_root(ObjectId(0x10), RootKind::JavaFrame);
//!
//! let analysis = HeapAnalysis::new(
//!     Arc::new(b.build().unwrap()),
//!     Arc::new(FixedCategory::default()),
//!     AnalysisOptions::default(),
//! )
//! .unwrap();
//! assert_eq!(analysis.object_info("0x10").unwrap().retained_size, 32);
//! ```
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::module_name_repetitions
)]

mod biggest;
mod builder;
mod category;
mod error;
mod graph;
/// HSC snapshot format: deterministic columnar encoding of a [`HeapGraph`].
pub mod hsc;
mod ident;
mod inspect;
mod layout;
mod query;
mod record;
/// Chunked parallel scans, deadlines, and bounded top-K merging.
pub mod scan;
mod slot_index;
mod strings;
/// Path search, retainer lookup, and dominator-based retained sizes.
pub mod traverse;
/// Visited-tracking bit sets used by traversals.
pub mod visit;

/// Per-class rankings built by one chunked scan.
pub use biggest::{BiggestObjectsIndex, ClassRanking, ClassSummary, IndexOptions, SortKey};
/// Graph staging area used by importers and tests.
pub use builder::HeapGraphBuilder;
/// Class categorization seam and display filters.
pub use category::{CategoryFilter, ClassCategorizer, ClassCategory, FixedCategory};
/// Query-level errors and completeness-tagged results.
pub use error::{ErrorKind, HeapError, Outcome};
/// The immutable graph store.
pub use graph::{estimate_bytes, BuildError, EdgeRef, GraphCounts, HeapGraph, InEdge, LabelRef};
/// Identifiers and slots.
pub use ident::{parse_id_text, ClassId, IdParseError, ObjectId, Slot};
/// Per-object descriptors and field listings.
pub use inspect::{describe_object, object_fields, FieldDescriptor, FieldValue, ObjectDescriptor};
/// Optional class-field layout side-file.
pub use layout::{ClassFieldLayout, DeclaredField, LayoutError};
/// Query facade.
pub use query::{
    AnalysisOptions, HeapAnalysis, PathStep, QueryDefaults, Retainer, RetainerList, RetentionPath,
};
/// Owned records exchanged with builders and the codec.
pub use record::{
    ClassInfo, EdgeLabel, EdgeRecord, FieldType, GcRoot, ObjectRecord, PrimitiveField,
    PrimitiveValue, RootKind,
};
/// Deadline type accepted by cancellable queries.
pub use scan::Deadline;
/// Retained-size table.
pub use traverse::{Dominator, RetainedSizes};
