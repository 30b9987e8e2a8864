// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shortest retention paths from an object back to GC roots.
//!
//! Breadth-first over the incoming-edge index, so the first paths found are
//! the shortest. Non-root objects are visited at most once per search; roots
//! are never marked, so two distinct retainers reaching the same root yield
//! two paths. The search frontier is an arena of parent links; a path is
//! materialised only when a root is reached.

use std::collections::VecDeque;

use crate::error::Outcome;
use crate::graph::HeapGraph;
use crate::ident::Slot;
use crate::scan::Deadline;
use crate::visit::{VersionedBitSet, VisitSet};

/// How often (in dequeued nodes) the deadline is consulted.
const DEADLINE_STRIDE: usize = 1024;

const NO_PARENT: u32 = u32::MAX;

/// Bounds for one path search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathLimits {
    /// Stop after this many root-reaching paths.
    pub max_paths: usize,
    /// Longest path, in hops.
    pub max_depth: usize,
}

/// One retention chain.
///
/// `nodes[0]` is the queried object and `nodes.last()` a GC root.
/// `edges[i]` is the edge from `nodes[i + 1]` to `nodes[i]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RootPath {
    /// Objects from the queried object to the root.
    pub nodes: Vec<Slot>,
    /// Edges connecting consecutive nodes.
    pub edges: Vec<usize>,
}

impl RootPath {
    /// Number of hops.
    #[must_use]
    pub fn hops(&self) -> usize {
        self.edges.len()
    }

    /// The root at the end of the chain.
    #[must_use]
    pub fn root(&self) -> Slot {
        self.nodes[self.nodes.len() - 1]
    }
}

#[derive(Clone, Copy)]
struct Step {
    slot: Slot,
    parent: u32,
    edge: usize,
    depth: u32,
}

fn materialise(arena: &[Step], mut at: usize) -> RootPath {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    loop {
        let step = arena[at];
        nodes.push(step.slot);
        if step.parent == NO_PARENT {
            break;
        }
        edges.push(step.edge);
        at = step.parent as usize;
    }
    nodes.reverse();
    edges.reverse();
    RootPath { nodes, edges }
}

/// Finds up to `limits.max_paths` shortest paths from `target` to GC roots.
///
/// An object that is itself a root yields one zero-hop path. Ties between
/// equally short paths follow retainer index order. `visited` is reset before
/// use and may be reused across searches.
#[allow(clippy::cast_possible_truncation)]
pub fn paths_to_root(
    graph: &HeapGraph,
    target: Slot,
    limits: PathLimits,
    deadline: Deadline,
    visited: &mut VersionedBitSet,
) -> Outcome<Vec<RootPath>> {
    let mut paths = Vec::new();
    if limits.max_paths == 0 {
        return Outcome::complete(paths);
    }
    if graph.is_root(target) {
        paths.push(RootPath {
            nodes: vec![target],
            edges: Vec::new(),
        });
        return Outcome::complete(paths);
    }

    visited.reset();
    visited.ensure_len(graph.object_count());
    visited.set(target as usize);

    let mut arena = vec![Step {
        slot: target,
        parent: NO_PARENT,
        edge: 0,
        depth: 0,
    }];
    let mut queue = VecDeque::from([0usize]);
    let mut popped = 0usize;

    while let Some(at) = queue.pop_front() {
        popped += 1;
        if popped % DEADLINE_STRIDE == 0 && deadline.expired() {
            return Outcome::partial(paths);
        }
        let Step { slot, depth, .. } = arena[at];
        if depth as usize >= limits.max_depth {
            continue;
        }
        let next_depth = depth + 1;
        for edge in graph.in_edges(slot) {
            let source = edge.source;
            let root = graph.is_root(source);
            if !root && !visited.insert(source as usize) {
                continue;
            }
            if !root && next_depth as usize >= limits.max_depth {
                continue;
            }
            arena.push(Step {
                slot: source,
                parent: at as u32,
                edge: edge.edge,
                depth: next_depth,
            });
            let child = arena.len() - 1;
            if root {
                paths.push(materialise(&arena, child));
                if paths.len() >= limits.max_paths {
                    return Outcome::complete(paths);
                }
            } else {
                queue.push_back(child);
            }
        }
    }
    Outcome::complete(paths)
}
