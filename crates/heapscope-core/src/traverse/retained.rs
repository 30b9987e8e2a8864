// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Dominators and retained sizes.
//!
//! A synthetic super-root points at every GC root. Object `d` dominates `o`
//! when every path from the super-root to `o` passes through `d`; the
//! retained size of `d` is the shallow total of everything it dominates,
//! itself included.
//!
//! Steps:
//! 1. Mark reachability level by level, workers sharing a
//!    [`ConcurrentBitSet`].
//! 2. Number the reachable objects in DFS postorder (super-root last).
//! 3. Run the Cooper–Harvey–Kennedy fixed point in reverse postorder,
//!    intersecting predecessor dominators in postorder-number space.
//! 4. Fold shallow sizes up the dominator tree in increasing postorder;
//!    every dominator has a higher number than the objects it dominates.
//!
//! Unreachable objects keep `retained == shallow` and have no dominator.

use std::time::Instant;

use tracing::{debug, info, instrument};

use crate::graph::HeapGraph;
use crate::ident::{Slot, NO_SLOT};
use crate::scan::{scan_chunks, Deadline};
use crate::visit::{ConcurrentBitSet, DenseBitSet, VisitSet};

/// Frontier entries handed to a marking worker at a time.
const FRONTIER_CHUNK: usize = 4096;

const UNDEF: u32 = u32::MAX;

/// Stored in the dominator column for children of the super-root.
const SUPER_ROOT: Slot = NO_SLOT - 1;

/// Immediate dominator of a reachable object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dominator {
    /// Dominated only by the synthetic super-root (typically a GC root).
    SuperRoot,
    /// Dominated by this object.
    Object(Slot),
}

/// Per-object retained sizes and dominator tree.
#[derive(Clone, Debug)]
pub struct RetainedSizes {
    retained: Vec<u64>,
    idom: Vec<Slot>,
    reachable: DenseBitSet,
    reachable_count: usize,
    reachable_total: u64,
}

impl RetainedSizes {
    /// Computes dominators and retained sizes for every object of `graph`.
    #[instrument(skip(graph), fields(objects = graph.object_count()))]
    #[allow(clippy::cast_possible_truncation)]
    pub fn compute(graph: &HeapGraph, workers: usize) -> Self {
        let started = Instant::now();
        let reachable = mark_reachable(graph, workers);
        let (order, postorder) = reachable_postorder(graph, &reachable);
        let doms = dominators(graph, &order, &postorder);

        let n = graph.object_count();
        let sup = order.len() as u32;
        let mut retained = graph.shallow_sizes().to_vec();
        let mut idom = vec![NO_SLOT; n];
        let mut reachable_total = 0u64;
        for (po, &slot) in order.iter().enumerate() {
            let dom = doms[po];
            let size = retained[slot as usize];
            if dom == sup || dom == UNDEF {
                idom[slot as usize] = SUPER_ROOT;
                reachable_total = reachable_total.saturating_add(size);
            } else {
                let parent = order[dom as usize];
                idom[slot as usize] = parent;
                retained[parent as usize] = retained[parent as usize].saturating_add(size);
            }
        }

        info!(
            reachable = order.len(),
            unreachable = n - order.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "retained sizes computed"
        );
        Self {
            retained,
            idom,
            reachable,
            reachable_count: order.len(),
            reachable_total,
        }
    }

    /// Retained size of `slot`.
    #[must_use]
    pub fn retained(&self, slot: Slot) -> u64 {
        self.retained[slot as usize]
    }

    /// Retained sizes in slot order.
    #[must_use]
    pub fn as_slice(&self) -> &[u64] {
        &self.retained
    }

    /// Immediate dominator of `slot`; `None` when unreachable.
    #[must_use]
    pub fn immediate_dominator(&self, slot: Slot) -> Option<Dominator> {
        match self.idom[slot as usize] {
            NO_SLOT => None,
            SUPER_ROOT => Some(Dominator::SuperRoot),
            parent => Some(Dominator::Object(parent)),
        }
    }

    /// Objects immediately dominated by `dom`, ascending by slot.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn dominated_children(&self, dom: Dominator) -> Vec<Slot> {
        let key = match dom {
            Dominator::SuperRoot => SUPER_ROOT,
            Dominator::Object(slot) => slot,
        };
        self.idom
            .iter()
            .enumerate()
            .filter(|&(_, &d)| d == key)
            .map(|(s, _)| s as Slot)
            .collect()
    }

    /// Returns `true` if `slot` is reachable from some GC root.
    #[must_use]
    pub fn is_reachable(&self, slot: Slot) -> bool {
        self.reachable.test(slot as usize)
    }

    /// Number of reachable objects.
    #[must_use]
    pub fn reachable_count(&self) -> usize {
        self.reachable_count
    }

    /// Number of objects not reachable from any GC root.
    #[must_use]
    pub fn unreachable_count(&self) -> usize {
        self.retained.len() - self.reachable_count
    }

    /// Shallow total of all reachable objects; equals the summed retained
    /// sizes of the super-root's children.
    #[must_use]
    pub fn reachable_shallow_total(&self) -> u64 {
        self.reachable_total
    }
}

/// Level-synchronous parallel reachability from all GC roots.
fn mark_reachable(graph: &HeapGraph, workers: usize) -> DenseBitSet {
    let marks = ConcurrentBitSet::with_len(graph.object_count());
    let mut frontier: Vec<Slot> = graph
        .roots()
        .iter()
        .map(|(slot, _)| *slot)
        .filter(|slot| !marks.test_and_set(*slot as usize))
        .collect();
    let mut levels = 0usize;
    while !frontier.is_empty() {
        levels += 1;
        let level = scan_chunks(frontier.len(), FRONTIER_CHUNK, workers, Deadline::NONE, |range, _| {
            let mut next = Vec::new();
            for &slot in &frontier[range] {
                for target in graph.referents(slot) {
                    if !marks.test_and_set(target as usize) {
                        next.push(target);
                    }
                }
            }
            next
        });
        frontier = level.parts.into_iter().flat_map(|(_, next)| next).collect();
    }
    debug!(levels, "reachability marked");
    marks.into_dense()
}

/// DFS postorder of the reachable subgraph, roots visited in root-table order.
///
/// Returns the slots in postorder and, per slot, its postorder number
/// (`UNDEF` when unreachable).
#[allow(clippy::cast_possible_truncation)]
fn reachable_postorder(graph: &HeapGraph, reachable: &DenseBitSet) -> (Vec<Slot>, Vec<u32>) {
    let n = graph.object_count();
    let mut postorder = vec![UNDEF; n];
    let mut order = Vec::with_capacity(reachable.count_ones());
    let mut visited = DenseBitSet::with_len(n);
    let mut stack: Vec<(Slot, usize)> = Vec::new();

    for &(root, _) in graph.roots() {
        if !visited.insert(root as usize) {
            continue;
        }
        stack.push((root, 0));
        while let Some(top) = stack.last_mut() {
            let (slot, pos) = *top;
            let targets = graph.out_targets(slot);
            if pos < targets.len() {
                top.1 += 1;
                let t = targets[pos];
                if t != NO_SLOT && visited.insert(t as usize) {
                    stack.push((t, 0));
                }
            } else {
                postorder[slot as usize] = order.len() as u32;
                order.push(slot);
                stack.pop();
            }
        }
    }
    debug_assert_eq!(order.len(), reachable.count_ones());
    (order, postorder)
}

/// Immediate dominators in postorder-number space; the super-root is `order.len()`.
#[allow(clippy::cast_possible_truncation)]
fn dominators(graph: &HeapGraph, order: &[Slot], postorder: &[u32]) -> Vec<u32> {
    let n = order.len();
    let sup = n as u32;
    let mut doms = vec![UNDEF; n + 1];
    doms[n] = sup;

    let mut rounds = 0usize;
    let mut changed = true;
    while changed {
        changed = false;
        rounds += 1;
        for b in (0..n).rev() {
            let slot = order[b];
            let mut new_idom = if graph.is_root(slot) { sup } else { UNDEF };
            for &pred in graph.in_sources(slot) {
                let p = postorder[pred as usize];
                if p == UNDEF || doms[p as usize] == UNDEF {
                    continue;
                }
                new_idom = if new_idom == UNDEF {
                    p
                } else {
                    intersect(&doms, p, new_idom)
                };
            }
            if new_idom != UNDEF && doms[b] != new_idom {
                doms[b] = new_idom;
                changed = true;
            }
        }
    }
    debug!(rounds, "dominator fixed point reached");
    doms.truncate(n);
    doms
}

fn intersect(doms: &[u32], mut a: u32, mut b: u32) -> u32 {
    while a != b {
        while a < b {
            a = doms[a as usize];
        }
        while b < a {
            b = doms[b as usize];
        }
    }
    a
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_possible_truncation)]
mod tests {
    use super::*;
    use crate::record::{ClassInfo, EdgeRecord, ObjectRecord, RootKind};
    use crate::{ClassId, HeapGraphBuilder, ObjectId};

    /// `(id, shallow, referents)`; roots listed separately.
    fn graph(objects: &[(u64, u64, &[u64])], roots: &[u64]) -> HeapGraph {
        let mut b = HeapGraphBuilder::new();
        b.insert_class(
            ClassId(1),
            ClassInfo {
                name: "Node".into(),
                superclass: None,
                instance_fields: vec![],
            },
        );
        for (id, shallow, refs) in objects {
            let mut rec = ObjectRecord::new(ClassId(1), *shallow);
            for (i, t) in refs.iter().enumerate() {
                rec = rec.with_edge(EdgeRecord::element(i as u32, ObjectId(*t)));
            }
            b.insert_object(ObjectId(*id), rec);
        }
        for r in roots {
            b.add_root(ObjectId(*r), RootKind::Unknown);
        }
        b.build().unwrap()
    }

    fn retained(g: &HeapGraph, sizes: &RetainedSizes, id: u64) -> u64 {
        sizes.retained(g.slot_of(ObjectId(id)).unwrap())
    }

    #[test]
    fn diamond_is_retained_by_its_root() {
        // R(1) → A(2) → B(4), R → C(3) → B.
        let g = graph(
            &[(1, 10, &[2, 3]), (2, 20, &[4]), (3, 30, &[4]), (4, 40, &[])],
            &[1],
        );
        let sizes = RetainedSizes::compute(&g, 2);
        assert_eq!(retained(&g, &sizes, 1), 100);
        assert_eq!(retained(&g, &sizes, 2), 20);
        assert_eq!(retained(&g, &sizes, 3), 30);
        assert_eq!(retained(&g, &sizes, 4), 40);
        let b = g.slot_of(ObjectId(4)).unwrap();
        let r = g.slot_of(ObjectId(1)).unwrap();
        assert_eq!(sizes.immediate_dominator(b), Some(Dominator::Object(r)));
        assert_eq!(sizes.immediate_dominator(r), Some(Dominator::SuperRoot));
        assert_eq!(sizes.reachable_shallow_total(), 100);
    }

    #[test]
    fn chain_accumulates() {
        let g = graph(&[(1, 1, &[2]), (2, 2, &[3]), (3, 4, &[])], &[1]);
        let sizes = RetainedSizes::compute(&g, 1);
        assert_eq!(retained(&g, &sizes, 1), 7);
        assert_eq!(retained(&g, &sizes, 2), 6);
        assert_eq!(retained(&g, &sizes, 3), 4);
    }

    #[test]
    fn shared_between_roots_belongs_to_super_root() {
        // Roots 1 and 2 both reference 3.
        let g = graph(&[(1, 5, &[3]), (2, 5, &[3]), (3, 50, &[])], &[1, 2]);
        let sizes = RetainedSizes::compute(&g, 2);
        assert_eq!(retained(&g, &sizes, 1), 5);
        assert_eq!(retained(&g, &sizes, 2), 5);
        let shared = g.slot_of(ObjectId(3)).unwrap();
        assert_eq!(sizes.immediate_dominator(shared), Some(Dominator::SuperRoot));
        assert_eq!(sizes.dominated_children(Dominator::SuperRoot).len(), 3);
        assert_eq!(sizes.reachable_shallow_total(), 60);
    }

    #[test]
    fn unreachable_objects_keep_shallow_size() {
        let g = graph(&[(1, 1, &[]), (2, 9, &[3]), (3, 4, &[2])], &[1]);
        let sizes = RetainedSizes::compute(&g, 1);
        let orphan = g.slot_of(ObjectId(2)).unwrap();
        assert!(!sizes.is_reachable(orphan));
        assert_eq!(sizes.retained(orphan), 9);
        assert_eq!(sizes.immediate_dominator(orphan), None);
        assert_eq!(sizes.unreachable_count(), 2);
        assert_eq!(sizes.reachable_count(), 1);
    }

    #[test]
    fn cycles_with_back_edges_resolve() {
        // 1 → 2 → 3 → 4 → 2 and 1 → 4: 2, 3, 4 each reachable two ways.
        let g = graph(
            &[(1, 1, &[2, 4]), (2, 2, &[3]), (3, 4, &[4]), (4, 8, &[2])],
            &[1],
        );
        let sizes = RetainedSizes::compute(&g, 3);
        let s = |id| g.slot_of(ObjectId(id)).unwrap();
        assert_eq!(sizes.immediate_dominator(s(2)), Some(Dominator::Object(s(1))));
        assert_eq!(sizes.immediate_dominator(s(3)), Some(Dominator::Object(s(2))));
        assert_eq!(sizes.immediate_dominator(s(4)), Some(Dominator::Object(s(1))));
        assert_eq!(retained(&g, &sizes, 1), 15);
        assert_eq!(retained(&g, &sizes, 2), 6);
    }

    #[test]
    fn dangling_edges_are_ignored() {
        let g = graph(&[(1, 3, &[99, 2]), (2, 4, &[])], &[1]);
        let sizes = RetainedSizes::compute(&g, 1);
        assert_eq!(retained(&g, &sizes, 1), 7);
    }
}
