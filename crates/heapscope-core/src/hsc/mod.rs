// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! HSC (Heap Snapshot Columnar) format.
//!
//! A decoded [`HeapGraph`](crate::HeapGraph) serialized as flat tables so a
//! second load of the same dump skips parsing entirely. The format is:
//!
//! - **Deterministic**: equal graphs encode to equal bytes
//! - **Self-checking**: a BLAKE3 digest of the body sits in the header
//! - **Columnar**: every table is 8-byte aligned rows of fixed width
//!
//! # Layout
//!
//! ```text
//! header (128) | directory (128) | string_spans | string_bytes | classes
//!              | class_fields | objects | edges | prims | roots
//! ```
//!
//! Sublists (a class's declared fields, an object's edges and primitives)
//! are [`Range`](types::Range) rows that must tile their data table in
//! order; the decoder rejects gaps and overlaps.
//!
//! ```rust
//! use heapscope_core::hsc::{decode_snapshot, encode_snapshot};
//! use heapscope_core::HeapGraphBuilder;
//!
//! let graph = HeapGraphBuilder::new().build().unwrap();
//! let bytes = encode_snapshot(&graph).unwrap();
//! assert_eq!(decode_snapshot(&bytes).unwrap(), graph);
//! ```

mod decode;
mod read;
pub mod types;
mod write;

pub use decode::{decode_snapshot, peek_counts};
pub use read::DecodeError;
pub use write::encode_snapshot;
