// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
//! Properties checked on generated graphs.

use heapscope_core::hsc::{decode_snapshot, encode_snapshot, peek_counts};
use heapscope_core::{CategoryFilter, Deadline, Dominator, HeapGraph, Slot, SortKey};
use heapscope_dry_tests::{analyse, random_graph, RandomGraphParams};
use proptest::prelude::*;

fn params() -> impl Strategy<Value = (u64, RandomGraphParams)> {
    (any::<u64>(), 0u64..80, 1u64..6, 0u64..5, 0u64..5, 0u64..4).prop_map(
        |(seed, objects, classes, max_out, roots, dangling_one_in)| {
            (
                seed,
                RandomGraphParams {
                    objects,
                    classes,
                    max_out,
                    roots,
                    dangling_one_in,
                },
            )
        },
    )
}

fn slots(graph: &HeapGraph) -> impl Iterator<Item = Slot> {
    0..graph.object_count() as Slot
}

/// Objects reachable from the GC roots when `removed` is taken out of the graph.
fn reachable_without(graph: &HeapGraph, removed: Option<Slot>) -> Vec<bool> {
    let mut seen = vec![false; graph.object_count()];
    let mut stack: Vec<Slot> = slots(graph)
        .filter(|&s| graph.is_root(s) && Some(s) != removed)
        .collect();
    for &s in &stack {
        seen[s as usize] = true;
    }
    while let Some(s) = stack.pop() {
        for t in graph.referents(s) {
            if Some(t) != removed && !seen[t as usize] {
                seen[t as usize] = true;
                stack.push(t);
            }
        }
    }
    seen
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn codec_preserves_every_record((seed, p) in params()) {
        let graph = random_graph(seed, p);
        let bytes = encode_snapshot(&graph).unwrap();
        prop_assert_eq!(peek_counts(&bytes).unwrap(), graph.counts());

        let decoded = decode_snapshot(&bytes).unwrap();
        prop_assert_eq!(decoded.object_ids(), graph.object_ids());
        prop_assert_eq!(decoded.class_count(), graph.class_count());
        for c in 0..graph.class_count() as Slot {
            prop_assert_eq!(decoded.class_info(c), graph.class_info(c));
        }
        for s in slots(&graph) {
            prop_assert_eq!(decoded.object_record(s), graph.object_record(s));
        }
        prop_assert_eq!(
            decoded.gc_roots().collect::<Vec<_>>(),
            graph.gc_roots().collect::<Vec<_>>()
        );
        prop_assert_eq!(decoded.dangling_count(), graph.dangling_count());
    }

    #[test]
    fn retained_sizes_account_for_every_reachable_byte((seed, p) in params()) {
        let analysis = analyse(random_graph(seed, p));
        let graph = analysis.graph();
        let retained = analysis.retained_sizes();

        let mut reachable_shallow = 0u64;
        for s in slots(graph) {
            let shallow = graph.shallow_size(s);
            prop_assert!(retained.retained(s) >= shallow);
            if !retained.is_reachable(s) {
                prop_assert_eq!(retained.retained(s), shallow);
                prop_assert_eq!(retained.immediate_dominator(s), None);
                continue;
            }
            reachable_shallow += shallow;
            let children: u64 = retained
                .dominated_children(Dominator::Object(s))
                .iter()
                .map(|&c| retained.retained(c))
                .sum();
            prop_assert_eq!(retained.retained(s), shallow + children);
            if let Some(Dominator::Object(d)) = retained.immediate_dominator(s) {
                prop_assert!(retained.retained(d) >= retained.retained(s) + graph.shallow_size(d));
            }
        }
        let top: u64 = retained
            .dominated_children(Dominator::SuperRoot)
            .iter()
            .map(|&c| retained.retained(c))
            .sum();
        prop_assert_eq!(top, reachable_shallow);
        prop_assert_eq!(retained.reachable_shallow_total(), reachable_shallow);
    }

    #[test]
    fn retained_size_is_what_removal_frees((seed, p) in params()) {
        let analysis = analyse(random_graph(seed, p));
        let graph = analysis.graph();
        let retained = analysis.retained_sizes();
        let live = reachable_without(graph, None);

        for d in slots(graph) {
            prop_assert_eq!(retained.is_reachable(d), live[d as usize]);
            if !live[d as usize] {
                continue;
            }
            let still_live = reachable_without(graph, Some(d));
            let freed: u64 = slots(graph)
                .filter(|&s| s != d && live[s as usize] && !still_live[s as usize])
                .map(|s| graph.shallow_size(s))
                .sum();
            prop_assert_eq!(retained.retained(d), graph.shallow_size(d) + freed, "object {}", d);
        }
    }

    #[test]
    fn paths_are_bounded_and_connected(
        (seed, p) in params(),
        target in any::<prop::sample::Index>(),
        max_paths in 1i64..8,
        max_depth in 1i64..12,
    ) {
        prop_assume!(p.objects > 0);
        let analysis = analyse(random_graph(seed, p));
        let graph = analysis.graph();
        let slot = target.index(graph.object_count()) as Slot;
        let id = graph.object_id(slot);

        let found = analysis
            .paths_to_root(&id.to_string(), max_paths, max_depth, Deadline::NONE)
            .unwrap();
        prop_assert!(found.complete);
        prop_assert!(found.value.len() <= max_paths as usize);
        let mut last_hops = 0;
        for path in &found.value {
            let hops = path.steps.len() - 1;
            prop_assert!(hops <= max_depth as usize);
            prop_assert!(hops >= last_hops);
            last_hops = hops;
            prop_assert_eq!(path.steps[0].object, id);
            let end = graph.slot_of(path.steps[hops].object).unwrap();
            prop_assert!(graph.is_root(end));
            for pair in path.steps.windows(2) {
                let child = graph.slot_of(pair[0].object).unwrap();
                let parent = graph.slot_of(pair[1].object).unwrap();
                prop_assert!(graph.referents(parent).any(|t| t == child));
            }
        }
        if graph.is_root(slot) {
            prop_assert_eq!(found.value.len(), 1);
        }
    }

    #[test]
    fn retainers_mirror_outgoing_edges((seed, p) in params()) {
        let analysis = analyse(random_graph(seed, p));
        let graph = analysis.graph();
        let mut resolved_edges = 0usize;
        for s in slots(graph) {
            resolved_edges += graph.referents(s).count();
            let list = analysis.retainers(&graph.object_id(s).to_string(), i64::MAX).unwrap();
            prop_assert_eq!(list.total, graph.in_degree(s));
            let mut from_query: Vec<_> = list.retainers.iter().map(|r| r.object).collect();
            let mut from_edges: Vec<_> = graph
                .in_sources(s)
                .iter()
                .map(|&src| graph.object_id(src))
                .collect();
            from_query.sort();
            from_edges.sort();
            prop_assert_eq!(from_query, from_edges);
            for src in graph.in_sources(s) {
                prop_assert!(graph.referents(*src).any(|t| t == s));
            }
        }
        let incoming: usize = slots(graph).map(|s| graph.in_degree(s)).sum();
        prop_assert_eq!(incoming, resolved_edges);
    }

    #[test]
    fn rankings_are_deterministic((seed, p) in params(), shallow in any::<bool>()) {
        let key = if shallow { SortKey::Shallow } else { SortKey::Retained };
        let first = analyse(random_graph(seed, p));
        let second = analyse(random_graph(seed, p));

        let a = first.biggest_classes(0, key, CategoryFilter::all(), Deadline::NONE);
        let b = second.biggest_classes(0, key, CategoryFilter::all(), Deadline::NONE);
        prop_assert!(a.complete && b.complete);
        prop_assert_eq!(&a.value, &b.value);
        for pair in a.value.windows(2) {
            let (x, y) = (pair[0].summary.total(key), pair[1].summary.total(key));
            prop_assert!(x > y || (x == y && pair[0].name < pair[1].name));
        }

        for ranking in &a.value {
            let x = first.biggest_by_class(&ranking.name, 0, key, Deadline::NONE).unwrap();
            let y = second.biggest_by_class(&ranking.name, 0, key, Deadline::NONE).unwrap();
            prop_assert_eq!(x.value, y.value);
        }
    }
}
