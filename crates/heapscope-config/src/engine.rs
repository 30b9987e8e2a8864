// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Engine tuning knobs and their conversion into runtime options.

use heapscope_cache::CacheOptions;
use heapscope_classify::PrefixCategorizer;
use heapscope_core::scan::default_workers;
use heapscope_core::{AnalysisOptions, Deadline, QueryDefaults};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::{ConfigError, ConfigService, ConfigStore};

/// Store key the engine config lives under.
pub const ENGINE_CONFIG_KEY: &str = "engine";

/// Fallbacks for non-positive query arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryLimits {
    /// Paths returned by `paths_to_root`.
    pub max_paths: usize,
    /// Hops explored by `paths_to_root`.
    pub max_depth: usize,
    /// Entries returned by `retainers`.
    pub max_retainers: usize,
    /// Entries returned by rankings.
    pub top_n: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        QueryDefaults::default().into()
    }
}

impl From<QueryDefaults> for QueryLimits {
    fn from(d: QueryDefaults) -> Self {
        Self {
            max_paths: d.max_paths,
            max_depth: d.max_depth,
            max_retainers: d.max_retainers,
            top_n: d.top_n,
        }
    }
}

impl From<QueryLimits> for QueryDefaults {
    fn from(l: QueryLimits) -> Self {
        let fallback = QueryDefaults::default();
        let or = |v: usize, d: usize| if v == 0 { d } else { v };
        Self {
            max_paths: or(l.max_paths, fallback.max_paths),
            max_depth: or(l.max_depth, fallback.max_depth),
            max_retainers: or(l.max_retainers, fallback.max_retainers),
            top_n: or(l.top_n, fallback.top_n),
        }
    }
}

/// Engine configuration as persisted in the config store.
///
/// Every field has a default, so a partial (or empty) JSON object is a valid
/// config. Zero means "use the default" for `workers`, `chunk_size` and
/// `top_k_per_class`, and "unlimited" for `max_graph_bytes` and
/// `query_timeout_ms`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads for marking and index scans.
    pub workers: usize,
    /// Slots per scan chunk.
    pub chunk_size: usize,
    /// Instances kept per class in the biggest-objects index.
    pub top_k_per_class: usize,
    /// Ceiling on estimated graph plus analysis memory.
    pub max_graph_bytes: u64,
    /// Graphs the cache keeps resident.
    pub max_resident_graphs: usize,
    /// Per-query timeout in milliseconds.
    pub query_timeout_ms: u64,
    /// Query argument fallbacks.
    pub defaults: QueryLimits,
    /// Class-name prefixes categorized as business code.
    pub business_prefixes: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let analysis = AnalysisOptions::default();
        Self {
            workers: 0,
            chunk_size: analysis.chunk_size,
            top_k_per_class: analysis.top_k_per_class,
            max_graph_bytes: 0,
            max_resident_graphs: CacheOptions::default().max_resident_graphs,
            query_timeout_ms: 0,
            defaults: QueryLimits::default(),
            business_prefixes: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Loads the config from `service`, falling back to defaults when absent.
    pub fn load<S: ConfigStore>(service: &ConfigService<S>) -> Result<Self, ConfigError> {
        let loaded: Option<Self> = service.load(ENGINE_CONFIG_KEY)?;
        if loaded.is_none() {
            debug!("no stored engine config; using defaults");
        }
        Ok(loaded.unwrap_or_default())
    }

    /// Persists the config through `service`.
    pub fn save<S: ConfigStore>(&self, service: &ConfigService<S>) -> Result<(), ConfigError> {
        service.save(ENGINE_CONFIG_KEY, self)
    }

    /// Options for [`HeapAnalysis::new`](heapscope_core::HeapAnalysis::new).
    pub fn analysis_options(&self) -> AnalysisOptions {
        let base = AnalysisOptions::default();
        AnalysisOptions {
            workers: if self.workers == 0 {
                default_workers()
            } else {
                self.workers
            },
            chunk_size: if self.chunk_size == 0 {
                base.chunk_size
            } else {
                self.chunk_size
            },
            top_k_per_class: if self.top_k_per_class == 0 {
                base.top_k_per_class
            } else {
                self.top_k_per_class
            },
            max_graph_bytes: self.max_graph_bytes,
            defaults: self.defaults.into(),
        }
    }

    /// Options for [`GraphCache::new`](heapscope_cache::GraphCache::new).
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            max_resident_graphs: self.max_resident_graphs.max(1),
            analysis: self.analysis_options(),
        }
    }

    /// Deadline for a query starting now.
    pub fn query_deadline(&self) -> Deadline {
        Deadline::from_millis(self.query_timeout_ms)
    }

    /// A categorizer seeded with the configured business prefixes.
    pub fn categorizer(&self) -> PrefixCategorizer {
        PrefixCategorizer::with_business_prefixes(self.business_prefixes.iter().cloned())
    }
}
