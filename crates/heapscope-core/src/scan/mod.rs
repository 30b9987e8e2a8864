// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Chunked parallel scans over slot ranges.
//!
//! Slots are split into contiguous chunks. Scoped worker threads claim
//! chunks through an atomic counter (work-stealing) and each produce a
//! private partial result; nothing is shared between workers except the
//! counter and a stop flag. Global orderings come from an explicit merge of
//! the partial results, never from execution order.

mod deadline;
mod exec;
mod merge;

pub use deadline::{Deadline, StopSignal};
pub use exec::{chunk_count, default_workers, scan_chunks, ScanOutcome};
pub use merge::{merge_sorted, TopK};
