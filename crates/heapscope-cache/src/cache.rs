// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Bounded cache of analysed graphs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use heapscope_core::hsc::{decode_snapshot, peek_counts};
use heapscope_core::{AnalysisOptions, ClassCategorizer, ClassFieldLayout, HeapAnalysis};
use rustc_hash::FxHashMap;
use tracing::{debug, info, instrument, warn};

use crate::compression::decompress;
use crate::error::CacheError;
use crate::source::SnapshotSource;

/// Cache construction parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheOptions {
    /// Graphs kept resident; values below one are treated as one.
    pub max_resident_graphs: usize,
    /// Options for every analysis the cache builds.
    pub analysis: AnalysisOptions,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_resident_graphs: 2,
            analysis: AnalysisOptions::default(),
        }
    }
}

/// Counters since construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Load attempts (successful or not).
    pub loads: u64,
    /// Requests served from a resident graph.
    pub hits: u64,
    /// Graphs dropped to make room.
    pub evictions: u64,
}

struct Resident {
    analysis: Arc<HeapAnalysis>,
    last_access: u64,
}

#[derive(Default)]
struct State {
    resident: FxHashMap<String, Resident>,
    /// Per-key load gates; present while some caller loads or waits on the key.
    gates: FxHashMap<String, Arc<Mutex<()>>>,
    clock: u64,
}

impl State {
    fn touch(&mut self, key: &str) -> Option<Arc<HeapAnalysis>> {
        self.clock += 1;
        let clock = self.clock;
        self.resident.get_mut(key).map(|r| {
            r.last_access = clock;
            Arc::clone(&r.analysis)
        })
    }
}

/// Keeps a bounded number of analysed graphs resident.
///
/// - At most one load runs per key; concurrent callers for the same key
///   wait on a per-key gate and re-check residency after acquiring it.
/// - Loads for different keys run in parallel.
/// - When full, the least recently accessed graph is dropped. Eviction only
///   releases the cache's `Arc`; callers holding the analysis keep using it.
/// - A failed load leaves nothing behind.
pub struct GraphCache {
    source: Arc<dyn SnapshotSource>,
    categorizer: Arc<dyn ClassCategorizer>,
    options: CacheOptions,
    state: Mutex<State>,
    loads: AtomicU64,
    hits: AtomicU64,
    evictions: AtomicU64,
}

impl std::fmt::Debug for GraphCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphCache")
            .field("options", &self.options)
            .field("resident", &self.len())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl GraphCache {
    /// Creates an empty cache.
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        categorizer: Arc<dyn ClassCategorizer>,
        options: CacheOptions,
    ) -> Self {
        Self {
            source,
            categorizer,
            options: CacheOptions {
                max_resident_graphs: options.max_resident_graphs.max(1),
                ..options
            },
            state: Mutex::new(State::default()),
            loads: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Effective options.
    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the analysis for `key`, loading it if it is not resident.
    #[instrument(skip(self))]
    pub fn get_or_load(&self, key: &str) -> Result<Arc<HeapAnalysis>, CacheError> {
        let gate = {
            let mut state = self.state();
            if let Some(hit) = state.touch(key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("cache hit");
                return Ok(hit);
            }
            Arc::clone(state.gates.entry(key.to_owned()).or_default())
        };
        let _loading = gate.lock().unwrap_or_else(PoisonError::into_inner);

        let result = {
            let resident = self.state().touch(key);
            if let Some(hit) = resident {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("loaded by a concurrent caller");
                Ok(hit)
            } else {
                self.loads.fetch_add(1, Ordering::Relaxed);
                self.load(key).map(|analysis| {
                    let analysis = Arc::new(analysis);
                    self.insert(key, Arc::clone(&analysis));
                    analysis
                })
            }
        };

        let mut state = self.state();
        // The map holds one reference and this caller another; more means waiters.
        if Arc::strong_count(&gate) <= 2 {
            state.gates.remove(key);
        }
        result
    }

    /// Returns the analysis for `key` if it is resident.
    pub fn get(&self, key: &str) -> Option<Arc<HeapAnalysis>> {
        let hit = self.state().touch(key);
        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    /// Drops `key` from the cache. Returns `true` if it was resident.
    pub fn evict(&self, key: &str) -> bool {
        let removed = self.state().resident.remove(key).is_some();
        if removed {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            info!(key, "snapshot evicted");
        }
        removed
    }

    /// Drops every resident graph.
    pub fn clear(&self) {
        let dropped = {
            let mut state = self.state();
            let n = state.resident.len();
            state.resident.clear();
            n
        };
        self.evictions.fetch_add(dropped as u64, Ordering::Relaxed);
    }

    /// Number of resident graphs.
    pub fn len(&self) -> usize {
        self.state().resident.len()
    }

    /// Returns `true` if nothing is resident.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `key` is resident.
    pub fn contains(&self, key: &str) -> bool {
        self.state().resident.contains_key(key)
    }

    /// Resident keys, sorted.
    pub fn resident_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.state().resident.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Counters since construction.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            loads: self.loads.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    fn insert(&self, key: &str, analysis: Arc<HeapAnalysis>) {
        let mut state = self.state();
        while state.resident.len() >= self.options.max_resident_graphs {
            let Some(oldest) = state
                .resident
                .iter()
                .min_by_key(|(_, r)| r.last_access)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            state.resident.remove(&oldest);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            info!(key = %oldest, "snapshot evicted");
        }
        state.clock += 1;
        let last_access = state.clock;
        state.resident.insert(
            key.to_owned(),
            Resident {
                analysis,
                last_access,
            },
        );
    }

    fn load(&self, key: &str) -> Result<HeapAnalysis, CacheError> {
        let started = Instant::now();
        let fetched = self.source.fetch(key)?;
        let bytes = decompress(&fetched.snapshot)?;
        let decode_err = |source| CacheError::Decode {
            key: key.to_owned(),
            source,
        };
        let analysis_err = |source| CacheError::Analysis {
            key: key.to_owned(),
            source,
        };

        let counts = peek_counts(&bytes).map_err(decode_err)?;
        HeapAnalysis::check_ceiling(
            HeapAnalysis::estimate_required(&counts),
            self.options.analysis.max_graph_bytes,
        )
        .map_err(analysis_err)?;

        let graph = decode_snapshot(&bytes).map_err(decode_err)?;
        let mut analysis = HeapAnalysis::new(
            Arc::new(graph),
            Arc::clone(&self.categorizer),
            self.options.analysis,
        )
        .map_err(analysis_err)?;

        if let Some(layout) = fetched.layout {
            match ClassFieldLayout::from_json(&layout) {
                Ok(layout) => analysis = analysis.with_layout(layout),
                Err(error) => warn!(key, %error, "ignoring unreadable layout side-file"),
            }
        }
        info!(
            key,
            objects = analysis.graph().object_count(),
            edges = analysis.graph().edge_count(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "snapshot loaded"
        );
        Ok(analysis)
    }
}
