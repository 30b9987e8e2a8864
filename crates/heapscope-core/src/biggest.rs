// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Biggest-objects index.
//!
//! One pass over all slots, split into chunks scanned in parallel. Each
//! chunk produces, per class, a bounded top-K list for both sort keys and a
//! running summary; the per-chunk lists are then k-way merged into the
//! final per-class rankings. Rankings order by size descending, then by
//! object identifier ascending, so the result does not depend on how the
//! scan was partitioned.

use std::cmp::Ordering;
use std::time::Instant;

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{info, warn};

use crate::category::{CategoryFilter, ClassCategorizer, ClassCategory};
use crate::error::Outcome;
use crate::graph::HeapGraph;
use crate::ident::{ObjectId, Slot};
use crate::scan::{merge_sorted, scan_chunks, Deadline, TopK};
use crate::traverse::RetainedSizes;

/// Slots scanned between stop-signal checks inside one chunk.
const STOP_STRIDE: usize = 4096;

/// Size used to rank objects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Bytes of the object itself.
    Shallow,
    /// Bytes freed if the object were collected.
    #[default]
    Retained,
}

/// Build parameters for [`BiggestObjectsIndex`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexOptions {
    /// Instances kept per class and sort key.
    pub top_k_per_class: usize,
    /// Slots per scan chunk.
    pub chunk_size: usize,
    /// Scan worker threads.
    pub workers: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            top_k_per_class: 100,
            chunk_size: 65_536,
            workers: crate::scan::default_workers(),
        }
    }
}

/// Per-class totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ClassSummary {
    /// Number of instances.
    pub instance_count: u64,
    /// Sum of shallow sizes.
    pub shallow_total: u64,
    /// Sum of retained sizes (instances may retain each other, so this can
    /// exceed the bytes actually freed).
    pub retained_sum: u64,
}

impl ClassSummary {
    fn absorb(&mut self, other: &Self) {
        self.instance_count += other.instance_count;
        self.shallow_total = self.shallow_total.saturating_add(other.shallow_total);
        self.retained_sum = self.retained_sum.saturating_add(other.retained_sum);
    }

    /// Total for `key`.
    #[must_use]
    pub fn total(&self, key: SortKey) -> u64 {
        match key {
            SortKey::Shallow => self.shallow_total,
            SortKey::Retained => self.retained_sum,
        }
    }
}

/// A class (all class ids sharing one name) in a histogram ranking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClassRanking {
    /// Class name.
    pub name: String,
    /// Category reported by the categorizer.
    pub category: ClassCategory,
    /// Totals across every class id with this name.
    #[serde(flatten)]
    pub summary: ClassSummary,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Ranked {
    size: u64,
    id: ObjectId,
    slot: Slot,
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        other.size.cmp(&self.size).then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Clone, Debug, Default)]
struct ClassEntry {
    summary: ClassSummary,
    by_shallow: Vec<Ranked>,
    by_retained: Vec<Ranked>,
}

impl ClassEntry {
    fn ranked(&self, key: SortKey) -> &[Ranked] {
        match key {
            SortKey::Shallow => &self.by_shallow,
            SortKey::Retained => &self.by_retained,
        }
    }
}

struct ChunkClass {
    summary: ClassSummary,
    by_shallow: TopK<Ranked>,
    by_retained: TopK<Ranked>,
}

/// Per-class rankings of instances by shallow and retained size.
#[derive(Clone, Debug)]
pub struct BiggestObjectsIndex {
    classes: Vec<ClassEntry>,
    top_k: usize,
}

impl BiggestObjectsIndex {
    /// Scans `graph` and builds the index.
    ///
    /// When `deadline` expires mid-scan the partial index is returned with
    /// `complete == false`; it covers only the chunks that were scanned.
    pub fn build(
        graph: &HeapGraph,
        retained: &RetainedSizes,
        options: &IndexOptions,
        deadline: Deadline,
    ) -> Outcome<Self> {
        let started = Instant::now();
        let top_k = options.top_k_per_class;
        let scan = scan_chunks(
            graph.object_count(),
            options.chunk_size,
            options.workers,
            deadline,
            |range, signal| {
                let mut local: FxHashMap<Slot, ChunkClass> = FxHashMap::default();
                for (n, slot) in range.enumerate() {
                    if n % STOP_STRIDE == STOP_STRIDE - 1 && signal.should_stop() {
                        break;
                    }
                    #[allow(clippy::cast_possible_truncation)]
                    let slot = slot as Slot;
                    let shallow = graph.shallow_size(slot);
                    let kept = retained.retained(slot);
                    let id = graph.object_id(slot);
                    let entry = local.entry(graph.class_of(slot)).or_insert_with(|| ChunkClass {
                        summary: ClassSummary::default(),
                        by_shallow: TopK::new(top_k),
                        by_retained: TopK::new(top_k),
                    });
                    entry.summary.absorb(&ClassSummary {
                        instance_count: 1,
                        shallow_total: shallow,
                        retained_sum: kept,
                    });
                    entry.by_shallow.push(Ranked {
                        size: shallow,
                        id,
                        slot,
                    });
                    entry.by_retained.push(Ranked {
                        size: kept,
                        id,
                        slot,
                    });
                }
                local
            },
        );

        let mut summaries = vec![ClassSummary::default(); graph.class_count()];
        let mut shallow_lists: Vec<Vec<Vec<Ranked>>> = vec![Vec::new(); graph.class_count()];
        let mut retained_lists: Vec<Vec<Vec<Ranked>>> = vec![Vec::new(); graph.class_count()];
        for (_, local) in scan.parts {
            for (class, part) in local {
                let c = class as usize;
                summaries[c].absorb(&part.summary);
                shallow_lists[c].push(part.by_shallow.into_sorted_vec());
                retained_lists[c].push(part.by_retained.into_sorted_vec());
            }
        }
        let classes: Vec<ClassEntry> = summaries
            .into_iter()
            .zip(shallow_lists.iter().zip(&retained_lists))
            .map(|(summary, (shallow, kept))| ClassEntry {
                summary,
                by_shallow: merge_sorted(shallow, top_k),
                by_retained: merge_sorted(kept, top_k),
            })
            .collect();

        let index = Self { classes, top_k };
        let elapsed_ms = started.elapsed().as_millis();
        if scan.complete {
            info!(classes = index.classes.len(), elapsed_ms, "biggest-objects index built");
            Outcome::complete(index)
        } else {
            warn!(elapsed_ms, "biggest-objects index build hit its deadline");
            Outcome::partial(index)
        }
    }

    /// Instances kept per class and key.
    #[must_use]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Totals for one class slot.
    #[must_use]
    pub fn summary(&self, class_slot: Slot) -> ClassSummary {
        self.classes
            .get(class_slot as usize)
            .map(|c| c.summary)
            .unwrap_or_default()
    }

    /// Largest instances of every class called `class_name`, best first.
    ///
    /// Classes sharing a name are merged into one ranking. `top_n` is capped
    /// at [`Self::top_k`]. Returns `None` when no class has this name.
    #[must_use]
    pub fn by_class(&self, graph: &HeapGraph, class_name: &str, top_n: usize, key: SortKey) -> Option<Vec<Slot>> {
        let lists: Vec<Vec<Ranked>> = graph
            .classes_named(class_name)
            .filter_map(|c| self.classes.get(c as usize))
            .map(|entry| entry.ranked(key).to_vec())
            .collect();
        if lists.is_empty() {
            return None;
        }
        let merged = merge_sorted(&lists, top_n.min(self.top_k));
        Some(merged.into_iter().map(|r| r.slot).collect())
    }

    /// Classes ranked by total size, merged by name and filtered by category.
    ///
    /// Ties are broken by class name. Classes without instances are skipped.
    #[must_use]
    pub fn top_classes(
        &self,
        graph: &HeapGraph,
        categorizer: &dyn ClassCategorizer,
        top_n: usize,
        key: SortKey,
        filter: CategoryFilter,
    ) -> Vec<ClassRanking> {
        let mut by_name: FxHashMap<&str, ClassSummary> = FxHashMap::default();
        for (c, entry) in self.classes.iter().enumerate() {
            if entry.summary.instance_count == 0 {
                continue;
            }
            #[allow(clippy::cast_possible_truncation)]
            let name = graph.class_name(c as Slot);
            by_name.entry(name).or_default().absorb(&entry.summary);
        }
        let mut ranked: Vec<ClassRanking> = by_name
            .into_iter()
            .filter_map(|(name, summary)| {
                let category = categorizer.categorize(name);
                filter.allows(category).then(|| ClassRanking {
                    name: name.to_owned(),
                    category,
                    summary,
                })
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.summary
                .total(key)
                .cmp(&a.summary.total(key))
                .then_with(|| a.name.cmp(&b.name))
        });
        ranked.truncate(top_n);
        ranked
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_possible_truncation)]
mod tests {
    use super::*;
    use crate::category::FixedCategory;
    use crate::record::{ClassInfo, EdgeRecord, ObjectRecord, RootKind};
    use crate::{ClassId, HeapGraphBuilder};

    fn class(name: &str) -> ClassInfo {
        ClassInfo {
            name: name.into(),
            superclass: None,
            instance_fields: vec![],
        }
    }

    /// Root 1 (Holder) references every `Item`; `Item` sizes vary with ties.
    fn fixture() -> (HeapGraph, RetainedSizes) {
        let mut b = HeapGraphBuilder::new();
        b.insert_class(ClassId(1), class("Holder"));
        b.insert_class(ClassId(2), class("Item"));
        b.insert_class(ClassId(3), class("Item"));
        let sizes = [(10, 2, 50), (11, 2, 70), (12, 3, 70), (13, 3, 10), (14, 2, 30)];
        let mut holder = ObjectRecord::new(ClassId(1), 16);
        for (i, (id, _, _)) in sizes.iter().enumerate() {
            holder = holder.with_edge(EdgeRecord::element(i as u32, ObjectId(*id)));
        }
        b.insert_object(ObjectId(1), holder);
        for (id, class, size) in sizes {
            b.insert_object(ObjectId(id), ObjectRecord::new(ClassId(class), size));
        }
        b.add_root(ObjectId(1), RootKind::StaticField);
        let graph = b.build().unwrap();
        let retained = RetainedSizes::compute(&graph, 1);
        (graph, retained)
    }

    fn ids(graph: &HeapGraph, slots: &[Slot]) -> Vec<u64> {
        slots.iter().map(|s| graph.object_id(*s).0).collect()
    }

    fn options(chunk_size: usize, workers: usize) -> IndexOptions {
        IndexOptions {
            top_k_per_class: 10,
            chunk_size,
            workers,
        }
    }

    #[test]
    fn same_name_classes_merge_with_id_tie_break() {
        let (graph, retained) = fixture();
        let index = BiggestObjectsIndex::build(&graph, &retained, &options(2, 2), Deadline::NONE);
        assert!(index.complete);
        let top = index.value.by_class(&graph, "Item", 3, SortKey::Shallow).unwrap();
        assert_eq!(ids(&graph, &top), vec![11, 12, 10]);
        assert!(index.value.by_class(&graph, "Missing", 3, SortKey::Shallow).is_none());
    }

    #[test]
    fn partitioning_does_not_change_rankings() {
        let (graph, retained) = fixture();
        let serial = BiggestObjectsIndex::build(&graph, &retained, &options(1024, 1), Deadline::NONE).value;
        let chunked = BiggestObjectsIndex::build(&graph, &retained, &options(1, 4), Deadline::NONE).value;
        for key in [SortKey::Shallow, SortKey::Retained] {
            assert_eq!(
                serial.by_class(&graph, "Item", 10, key),
                chunked.by_class(&graph, "Item", 10, key)
            );
        }
    }

    #[test]
    fn retained_ranking_puts_the_holder_first() {
        let (graph, retained) = fixture();
        let index = BiggestObjectsIndex::build(&graph, &retained, &options(3, 2), Deadline::NONE).value;
        let top = index.by_class(&graph, "Holder", 5, SortKey::Retained).unwrap();
        assert_eq!(ids(&graph, &top), vec![1]);
        let holder = graph.class_slot_of(ClassId(1)).unwrap();
        assert_eq!(index.summary(holder).retained_sum, 16 + 50 + 70 + 70 + 10 + 30);
    }

    #[test]
    fn top_classes_merge_names_and_filter() {
        let (graph, retained) = fixture();
        let index = BiggestObjectsIndex::build(&graph, &retained, &options(2, 1), Deadline::NONE).value;
        let all = index.top_classes(&graph, &FixedCategory::default(), 10, SortKey::Shallow, CategoryFilter::all());
        let names: Vec<&str> = all.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Item", "Holder"]);
        assert_eq!(all[0].summary.instance_count, 5);
        assert_eq!(all[0].summary.shallow_total, 230);

        let runtime_only = CategoryFilter::only(&[ClassCategory::RuntimeInternal]);
        assert!(index
            .top_classes(&graph, &FixedCategory::default(), 10, SortKey::Shallow, runtime_only)
            .is_empty());
    }

    #[test]
    fn expired_deadline_gives_partial_index() {
        let (graph, retained) = fixture();
        let out = BiggestObjectsIndex::build(
            &graph,
            &retained,
            &options(1, 1),
            Deadline::at(Instant::now()),
        );
        assert!(!out.complete);
    }

    #[test]
    fn top_n_is_capped_by_top_k() {
        let (graph, retained) = fixture();
        let opts = IndexOptions {
            top_k_per_class: 2,
            ..options(2, 1)
        };
        let index = BiggestObjectsIndex::build(&graph, &retained, &opts, Deadline::NONE).value;
        let top = index.by_class(&graph, "Item", 50, SortKey::Shallow).unwrap();
        assert_eq!(ids(&graph, &top), vec![11, 12]);
    }
}
