// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Query facade over one loaded graph.
//!
//! [`HeapAnalysis`] owns everything derived from a [`HeapGraph`]: retained
//! sizes (computed eagerly), the biggest-objects index (built on first use
//! and cached only when complete), the optional field layout, and a pool of
//! visited sets reused across path searches. Every query takes `&self`, so
//! one analysis can serve concurrent callers.

use std::borrow::Cow;
use std::sync::{Arc, Mutex, OnceLock};

use serde::Serialize;
use tracing::{debug, instrument};

use crate::biggest::{BiggestObjectsIndex, ClassRanking, IndexOptions, SortKey};
use crate::category::{CategoryFilter, ClassCategorizer};
use crate::error::{HeapError, Outcome};
use crate::graph::{GraphCounts, HeapGraph};
use crate::ident::{ObjectId, Slot};
use crate::inspect::{describe_object, object_fields, FieldDescriptor, ObjectDescriptor};
use crate::layout::ClassFieldLayout;
use crate::record::RootKind;
use crate::scan::Deadline;
use crate::traverse::{direct_retainers, paths_to_root, PathLimits, RetainedSizes};
use crate::visit::VersionedBitSet;

/// Values substituted for non-positive counts and depths.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryDefaults {
    /// Paths returned by `paths_to_root`.
    pub max_paths: usize,
    /// Hops explored by `paths_to_root`.
    pub max_depth: usize,
    /// Entries returned by `retainers`.
    pub max_retainers: usize,
    /// Entries returned by rankings.
    pub top_n: usize,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            max_paths: 5,
            max_depth: 20,
            max_retainers: 50,
            top_n: 20,
        }
    }
}

/// Construction parameters for [`HeapAnalysis`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Worker threads for reachability marking and index scans.
    pub workers: usize,
    /// Slots per index scan chunk.
    pub chunk_size: usize,
    /// Instances kept per class in the biggest-objects index.
    pub top_k_per_class: usize,
    /// Ceiling on the estimated resident size of graph plus analysis; zero disables it.
    pub max_graph_bytes: u64,
    /// Defaults for non-positive query arguments.
    pub defaults: QueryDefaults,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        let index = IndexOptions::default();
        Self {
            workers: index.workers,
            chunk_size: index.chunk_size,
            top_k_per_class: index.top_k_per_class,
            max_graph_bytes: 0,
            defaults: QueryDefaults::default(),
        }
    }
}

impl AnalysisOptions {
    fn index_options(&self) -> IndexOptions {
        IndexOptions {
            top_k_per_class: self.top_k_per_class,
            chunk_size: self.chunk_size,
            workers: self.workers,
        }
    }
}

/// One hop of a retention path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PathStep {
    /// Object at this position.
    pub object: ObjectId,
    /// Its class name.
    pub class_name: String,
    /// Its shallow size.
    pub shallow_size: u64,
    /// Its retained size.
    pub retained_size: u64,
    /// Field of the next step that references this object; absent on the root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referenced_by: Option<String>,
}

/// A chain from the queried object to a GC root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RetentionPath {
    /// Steps from the queried object (first) to the root (last).
    pub steps: Vec<PathStep>,
    /// Root kinds of the final step.
    pub root_kinds: Vec<RootKind>,
}

/// An object referencing the queried object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Retainer {
    /// Retaining object.
    pub object: ObjectId,
    /// Its class name.
    pub class_name: String,
    /// Its shallow size.
    pub shallow_size: u64,
    /// Its retained size.
    pub retained_size: u64,
    /// Field name or `[i]` through which it holds the reference.
    pub field: String,
}

/// Result of a retainer lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RetainerList {
    /// Retainers in index order, truncated.
    pub retainers: Vec<Retainer>,
    /// Number of incoming references before truncation.
    pub total: usize,
}

/// Query engine for one loaded heap graph.
pub struct HeapAnalysis {
    graph: Arc<HeapGraph>,
    retained: RetainedSizes,
    index: OnceLock<BiggestObjectsIndex>,
    index_build: Mutex<()>,
    layout: Option<ClassFieldLayout>,
    categorizer: Arc<dyn ClassCategorizer>,
    options: AnalysisOptions,
    visit_pool: Mutex<Vec<VersionedBitSet>>,
}

impl std::fmt::Debug for HeapAnalysis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapAnalysis")
            .field("objects", &self.graph.object_count())
            .field("index_built", &self.index.get().is_some())
            .field("layout", &self.layout.is_some())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Estimated bytes of the per-object analysis tables.
fn analysis_bytes(objects: u64) -> u64 {
    // retained u64 + dominator u32 + reachability bit + path-search stamps u16
    objects.saturating_mul(8 + 4 + 2).saturating_add(objects / 8)
}

fn normalize(value: i64, default: usize) -> usize {
    if value <= 0 {
        default
    } else {
        usize::try_from(value).unwrap_or(usize::MAX)
    }
}

impl HeapAnalysis {
    /// Estimated resident bytes of a graph with `counts` plus its analysis.
    ///
    /// Lets a loader reject a snapshot from its header before decoding it.
    pub fn estimate_required(counts: &GraphCounts) -> u64 {
        counts
            .estimated_graph_bytes()
            .saturating_add(analysis_bytes(counts.objects))
    }

    /// Fails with [`HeapError::ResourceExhausted`] when `required` exceeds a
    /// non-zero `limit`.
    pub fn check_ceiling(required: u64, limit: u64) -> Result<(), HeapError> {
        if limit > 0 && required > limit {
            return Err(HeapError::ResourceExhausted { required, limit });
        }
        Ok(())
    }

    /// Checks the memory ceiling, then computes retained sizes.
    pub fn new(
        graph: Arc<HeapGraph>,
        categorizer: Arc<dyn ClassCategorizer>,
        options: AnalysisOptions,
    ) -> Result<Self, HeapError> {
        let required = graph
            .estimated_bytes()
            .saturating_add(analysis_bytes(graph.object_count() as u64));
        Self::check_ceiling(required, options.max_graph_bytes)?;
        let retained = RetainedSizes::compute(&graph, options.workers);
        Ok(Self {
            graph,
            retained,
            index: OnceLock::new(),
            index_build: Mutex::new(()),
            layout: None,
            categorizer,
            options,
            visit_pool: Mutex::new(Vec::new()),
        })
    }

    /// Attaches a class-field layout.
    #[must_use]
    pub fn with_layout(mut self, layout: ClassFieldLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// The analysed graph.
    #[must_use]
    pub fn graph(&self) -> &Arc<HeapGraph> {
        &self.graph
    }

    /// Retained sizes and dominators.
    #[must_use]
    pub fn retained_sizes(&self) -> &RetainedSizes {
        &self.retained
    }

    /// Options this analysis was built with.
    #[must_use]
    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Describes one object.
    pub fn object_info(&self, id: &str) -> Result<ObjectDescriptor, HeapError> {
        let slot = self.resolve(id)?;
        Ok(describe_object(&self.graph, &self.retained, slot))
    }

    /// Lists one object's fields.
    pub fn object_fields(&self, id: &str) -> Result<Vec<FieldDescriptor>, HeapError> {
        let slot = self.resolve(id)?;
        Ok(object_fields(&self.graph, &self.retained, self.layout.as_ref(), slot))
    }

    /// Largest instances of the classes called `class_name`.
    ///
    /// The index keeps only [`AnalysisOptions::top_k_per_class`] instances
    /// per class, so `top_n` is capped there. Hitting the cap does not make
    /// the outcome incomplete; `complete` reflects the deadline only.
    #[instrument(level = "debug", skip(self, deadline))]
    pub fn biggest_by_class(
        &self,
        class_name: &str,
        top_n: i64,
        key: SortKey,
        deadline: Deadline,
    ) -> Result<Outcome<Vec<ObjectDescriptor>>, HeapError> {
        let top_n = normalize(top_n, self.options.defaults.top_n);
        let index = self.index(deadline);
        let slots = index
            .value
            .by_class(&self.graph, class_name, top_n, key)
            .ok_or_else(|| HeapError::ClassNotFound(class_name.to_owned()))?;
        let described = slots
            .into_iter()
            .map(|slot| describe_object(&self.graph, &self.retained, slot))
            .collect();
        Ok(Outcome {
            value: described,
            complete: index.complete,
        })
    }

    /// Classes ranked by total size, filtered by category.
    #[instrument(level = "debug", skip(self, deadline))]
    pub fn biggest_classes(
        &self,
        top_n: i64,
        key: SortKey,
        filter: CategoryFilter,
        deadline: Deadline,
    ) -> Outcome<Vec<ClassRanking>> {
        let top_n = normalize(top_n, self.options.defaults.top_n);
        let index = self.index(deadline);
        let ranked = index
            .value
            .top_classes(&self.graph, self.categorizer.as_ref(), top_n, key, filter);
        Outcome {
            value: ranked,
            complete: index.complete,
        }
    }

    /// Shortest retention paths from an object to GC roots.
    #[instrument(level = "debug", skip(self, deadline))]
    pub fn paths_to_root(
        &self,
        id: &str,
        max_paths: i64,
        max_depth: i64,
        deadline: Deadline,
    ) -> Result<Outcome<Vec<RetentionPath>>, HeapError> {
        let slot = self.resolve(id)?;
        let limits = PathLimits {
            max_paths: normalize(max_paths, self.options.defaults.max_paths),
            max_depth: normalize(max_depth, self.options.defaults.max_depth),
        };
        let mut visited = self.take_visit_set();
        let found = paths_to_root(&self.graph, slot, limits, deadline, &mut visited);
        self.return_visit_set(visited);
        if !found.complete {
            debug!(paths = found.value.len(), "path search hit its deadline");
        }
        Ok(found.map(|paths| paths.iter().map(|p| self.render_path(&p.nodes, &p.edges)).collect()))
    }

    /// Direct retainers of an object, one per incoming reference.
    pub fn retainers(&self, id: &str, max_count: i64) -> Result<RetainerList, HeapError> {
        let slot = self.resolve(id)?;
        let limit = normalize(max_count, self.options.defaults.max_retainers);
        let (edges, total) = direct_retainers(&self.graph, slot, limit);
        let retainers = edges
            .into_iter()
            .map(|e| Retainer {
                object: self.graph.object_id(e.source),
                class_name: self.graph.class_name(self.graph.class_of(e.source)).to_owned(),
                shallow_size: self.graph.shallow_size(e.source),
                retained_size: self.retained.retained(e.source),
                field: self.graph.edge(e.edge).label().to_string(),
            })
            .collect();
        Ok(RetainerList { retainers, total })
    }

    /// Builds the index if needed. A complete build is cached; an incomplete
    /// one is handed back to this caller only.
    fn index(&self, deadline: Deadline) -> Outcome<Cow<'_, BiggestObjectsIndex>> {
        if let Some(index) = self.index.get() {
            return Outcome::complete(Cow::Borrowed(index));
        }
        let _guard = self.index_build.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(index) = self.index.get() {
            return Outcome::complete(Cow::Borrowed(index));
        }
        let built = BiggestObjectsIndex::build(&self.graph, &self.retained, &self.options.index_options(), deadline);
        if !built.complete {
            return Outcome::partial(Cow::Owned(built.value));
        }
        let index = self.index.get_or_init(|| built.value);
        Outcome::complete(Cow::Borrowed(index))
    }

    fn resolve(&self, id: &str) -> Result<Slot, HeapError> {
        let id: ObjectId = id.parse()?;
        self.graph.slot_of(id).ok_or(HeapError::ObjectNotFound(id))
    }

    fn take_visit_set(&self) -> VersionedBitSet {
        let pooled = self.visit_pool.lock().unwrap_or_else(|e| e.into_inner()).pop();
        pooled.unwrap_or_else(|| VersionedBitSet::with_len(self.graph.object_count()))
    }

    fn return_visit_set(&self, set: VersionedBitSet) {
        self.visit_pool.lock().unwrap_or_else(|e| e.into_inner()).push(set);
    }

    fn render_path(&self, nodes: &[Slot], edges: &[usize]) -> RetentionPath {
        let steps = nodes
            .iter()
            .enumerate()
            .map(|(i, &slot)| PathStep {
                object: self.graph.object_id(slot),
                class_name: self.graph.class_name(self.graph.class_of(slot)).to_owned(),
                shallow_size: self.graph.shallow_size(slot),
                retained_size: self.retained.retained(slot),
                referenced_by: edges.get(i).map(|&e| self.graph.edge(e).label().to_string()),
            })
            .collect();
        let root_kinds = nodes
            .last()
            .map(|&root| self.graph.root_kinds(root))
            .unwrap_or_default();
        RetentionPath { steps, root_kinds }
    }
}
