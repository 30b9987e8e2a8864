// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory snapshot source fake.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use heapscope_cache::compression::{compress, DEFAULT_LEVEL};
use heapscope_cache::{CacheError, SnapshotBytes, SnapshotSource};
use heapscope_core::hsc::encode_snapshot;
use heapscope_core::HeapGraph;

/// [`SnapshotSource`] backed by a map, with per-key fetch counters,
/// injectable failures and an optional fetch delay.
///
/// Clones share state.
#[derive(Clone, Default)]
pub struct InMemorySnapshotSource {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    data: HashMap<String, SnapshotBytes>,
    fetches: HashMap<String, usize>,
    failing: HashSet<String>,
    delay: Option<Duration>,
}

fn encode(graph: &HeapGraph) -> Vec<u8> {
    match encode_snapshot(graph) {
        Ok(bytes) => bytes,
        Err(err) => panic!("encoding fixture graph: {err}"),
    }
}

impl InMemorySnapshotSource {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores raw bytes under `key`.
    pub fn insert_bytes(&self, key: &str, bytes: SnapshotBytes) {
        self.inner().data.insert(key.to_owned(), bytes);
    }

    /// Encodes `graph` and stores it uncompressed.
    pub fn insert_graph(&self, key: &str, graph: &HeapGraph) {
        self.insert_bytes(
            key,
            SnapshotBytes {
                snapshot: encode(graph),
                layout: None,
            },
        );
    }

    /// Encodes `graph` and stores it zstd-compressed.
    pub fn insert_compressed_graph(&self, key: &str, graph: &HeapGraph) {
        let snapshot = match compress(&encode(graph), DEFAULT_LEVEL) {
            Ok(bytes) => bytes,
            Err(err) => panic!("compressing fixture graph: {err}"),
        };
        self.insert_bytes(
            key,
            SnapshotBytes {
                snapshot,
                layout: None,
            },
        );
    }

    /// Attaches a layout side-file to an existing entry.
    pub fn set_layout(&self, key: &str, layout: impl Into<Vec<u8>>) {
        if let Some(entry) = self.inner().data.get_mut(key) {
            entry.layout = Some(layout.into());
        }
    }

    /// Makes fetches of `key` fail with an I/O error.
    pub fn set_failing(&self, key: &str, fail: bool) {
        let mut inner = self.inner();
        if fail {
            inner.failing.insert(key.to_owned());
        } else {
            inner.failing.remove(key);
        }
    }

    /// Sleeps this long inside every fetch, outside the lock.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.inner().delay = delay;
    }

    /// Fetch attempts for `key`, failed ones included.
    pub fn fetch_count(&self, key: &str) -> usize {
        self.inner().fetches.get(key).copied().unwrap_or(0)
    }

    /// Fetch attempts across all keys.
    pub fn total_fetches(&self) -> usize {
        self.inner().fetches.values().sum()
    }
}

impl SnapshotSource for InMemorySnapshotSource {
    fn fetch(&self, key: &str) -> Result<SnapshotBytes, CacheError> {
        let (delay, result) = {
            let mut inner = self.inner();
            *inner.fetches.entry(key.to_owned()).or_default() += 1;
            let result = if inner.failing.contains(key) {
                Err(CacheError::Io {
                    key: key.to_owned(),
                    source: io::Error::other("simulated fetch failure"),
                })
            } else {
                inner
                    .data
                    .get(key)
                    .cloned()
                    .ok_or_else(|| CacheError::NotFound(key.to_owned()))
            };
            (inner.delay, result)
        };
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fixtures::diamond_graph;

    #[test]
    fn counts_fetches_and_injects_failures() {
        let source = InMemorySnapshotSource::new();
        source.insert_graph("d", &diamond_graph());
        assert!(!source.fetch("d").unwrap().snapshot.is_empty());
        assert!(matches!(source.fetch("nope"), Err(CacheError::NotFound(_))));

        source.set_failing("d", true);
        assert!(matches!(source.fetch("d"), Err(CacheError::Io { .. })));
        assert_eq!(source.fetch_count("d"), 2);
        assert_eq!(source.total_fetches(), 3);
    }

    #[test]
    fn layout_attaches_to_existing_entries_only() {
        let source = InMemorySnapshotSource::new();
        source.set_layout("missing", "{}");
        assert!(source.fetch("missing").is_err());
        source.insert_graph("d", &diamond_graph());
        source.set_layout("d", "{}");
        assert_eq!(source.fetch("d").unwrap().layout.as_deref(), Some(&b"{}"[..]));
    }
}
