// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Resident-graph cache for heapscope.
//!
//! [`GraphCache`] turns snapshot keys into shared
//! [`HeapAnalysis`](heapscope_core::HeapAnalysis) values: it fetches bytes
//! from a [`SnapshotSource`], strips zstd compression, checks the memory
//! ceiling from the snapshot header, decodes, analyses, and keeps a bounded
//! number of results resident.
//!
//! # Guarantees
//!
//! - One decode per key at a time, however many callers ask concurrently.
//! - Eviction (least recently accessed first) never invalidates an `Arc`
//!   a caller already holds.
//! - A load that fails occupies no slot and can be retried.
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
    clippy::module_name_repetitions
)]

mod cache;
/// zstd detection and unwrapping.
pub mod compression;
mod error;
mod source;

pub use cache::{CacheOptions, CacheStats, GraphCache};
pub use error::CacheError;
pub use source::{FsSnapshotSource, SnapshotBytes, SnapshotSource, LAYOUT_SUFFIX};
