// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end query scenarios on hand-shaped graphs.

use std::sync::Arc;
use std::time::Instant;

use heapscope_core::{
    AnalysisOptions, CategoryFilter, Deadline, Dominator, ErrorKind, FixedCategory, HeapAnalysis,
    HeapError, ObjectId, RootKind, SortKey,
};
use heapscope_dry_tests::{analyse, chain_graph, cycle_graph, diamond_graph, Diamond};

fn id(o: ObjectId) -> String {
    o.to_string()
}

#[test]
fn diamond_retainers_of_shared_child() {
    let analysis = analyse(diamond_graph());
    let list = analysis.retainers(&id(Diamond::B), 0).unwrap();
    assert_eq!(list.total, 2);
    let mut objects: Vec<ObjectId> = list.retainers.iter().map(|r| r.object).collect();
    objects.sort();
    assert_eq!(objects, vec![Diamond::A, Diamond::C]);
    assert!(list.retainers.iter().all(|r| r.field == "next"));
}

#[test]
fn diamond_paths_to_root() {
    let analysis = analyse(diamond_graph());
    let found = analysis
        .paths_to_root(&id(Diamond::B), 2, 5, Deadline::NONE)
        .unwrap()
        .into_complete("paths_to_root")
        .unwrap();
    assert_eq!(found.len(), 2);
    let mut middles = Vec::new();
    for path in &found {
        let objects: Vec<ObjectId> = path.steps.iter().map(|s| s.object).collect();
        assert_eq!(objects.len(), 3, "two hops, three steps");
        assert_eq!(objects[0], Diamond::B);
        assert_eq!(objects[2], Diamond::R);
        assert_eq!(path.root_kinds, vec![RootKind::JniGlobal]);
        middles.push(objects[1]);
    }
    middles.sort();
    assert_eq!(middles, vec![Diamond::A, Diamond::C]);
}

#[test]
fn diamond_retained_sizes() {
    let analysis = analyse(diamond_graph());
    let root = analysis.object_info(&id(Diamond::R)).unwrap();
    assert_eq!(root.retained_size, Diamond::TOTAL);
    assert_eq!(root.root_kinds, vec![RootKind::JniGlobal]);

    // Neither A nor C alone keeps B alive.
    let [_, a_size, b_size, c_size] = Diamond::SIZES;
    assert_eq!(analysis.object_info(&id(Diamond::A)).unwrap().retained_size, a_size);
    assert_eq!(analysis.object_info(&id(Diamond::C)).unwrap().retained_size, c_size);
    let b = analysis.object_info(&id(Diamond::B)).unwrap();
    assert_eq!(b.retained_size, b_size);
    assert_eq!(b.dominator, Some(Diamond::R));

    let graph = analysis.graph();
    let r_slot = graph.slot_of(Diamond::R).unwrap();
    assert_eq!(
        analysis.retained_sizes().immediate_dominator(r_slot),
        Some(Dominator::SuperRoot)
    );
}

#[test]
fn unknown_object_is_not_found() {
    let analysis = analyse(diamond_graph());
    let err = analysis.object_info("0xdeadbeef").unwrap_err();
    assert!(matches!(err, HeapError::ObjectNotFound(ObjectId(0xdead_beef))));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(analysis.retainers("12345", 1).unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn malformed_identifier_is_invalid_input() {
    let analysis = analyse(diamond_graph());
    for bad in ["", "0xzz", "twelve"] {
        let err = analysis.object_fields(bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput, "{bad:?}");
    }
}

#[test]
fn unknown_class_is_not_found() {
    let analysis = analyse(diamond_graph());
    let err = analysis
        .biggest_by_class("com.example.Missing", 5, SortKey::Retained, Deadline::NONE)
        .unwrap_err();
    assert!(matches!(err, HeapError::ClassNotFound(_)));
}

#[test]
fn biggest_by_class_orders_by_key() {
    let analysis = analyse(diamond_graph());
    let by_retained = analysis
        .biggest_by_class("com.example.Node", 2, SortKey::Retained, Deadline::NONE)
        .unwrap()
        .into_complete("biggest_by_class")
        .unwrap();
    assert_eq!(by_retained.len(), 2);
    assert_eq!(by_retained[0].id, Diamond::R);

    let by_shallow = analysis
        .biggest_by_class("com.example.Node", 0, SortKey::Shallow, Deadline::NONE)
        .unwrap()
        .value;
    let ids: Vec<ObjectId> = by_shallow.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![Diamond::B, Diamond::C, Diamond::A, Diamond::R]);
}

#[test]
fn biggest_by_class_is_capped_at_the_index_depth() {
    let options = AnalysisOptions {
        top_k_per_class: 2,
        ..AnalysisOptions::default()
    };
    let analysis = HeapAnalysis::new(
        Arc::new(diamond_graph()),
        Arc::new(FixedCategory::default()),
        options,
    )
    .unwrap();
    let found = analysis
        .biggest_by_class("com.example.Node", 10, SortKey::Shallow, Deadline::NONE)
        .unwrap();
    assert!(found.complete);
    let ids: Vec<ObjectId> = found.value.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![Diamond::B, Diamond::C]);
}

#[test]
fn biggest_classes_totals_instances() {
    let analysis = analyse(diamond_graph());
    let ranking = analysis
        .biggest_classes(0, SortKey::Shallow, CategoryFilter::all(), Deadline::NONE)
        .into_complete("biggest_classes")
        .unwrap();
    assert_eq!(ranking.len(), 1);
    assert_eq!(ranking[0].summary.instance_count, 4);
    assert_eq!(ranking[0].summary.shallow_total, Diamond::TOTAL);
}

#[test]
fn chain_retained_sizes_accumulate() {
    let analysis = analyse(chain_graph(4));
    let expected = [80, 72, 56, 32];
    for (i, want) in (1..=4).zip(expected) {
        let info = analysis.object_info(&i.to_string()).unwrap();
        assert_eq!(info.retained_size, want, "object {i}");
    }
}

#[test]
fn cycle_paths_terminate() {
    let analysis = analyse(cycle_graph(6));
    let found = analysis
        .paths_to_root("4", 10, 10, Deadline::NONE)
        .unwrap()
        .value;
    assert_eq!(found.len(), 1);
    let objects: Vec<u64> = found[0].steps.iter().map(|s| s.object.0).collect();
    assert_eq!(objects, vec![4, 3, 2, 1]);
}

#[test]
fn paths_to_root_honours_an_expired_deadline() {
    let analysis = analyse(chain_graph(5000));
    let found = analysis
        .paths_to_root("5000", 1, 10_000, Deadline::at(Instant::now()))
        .unwrap();
    assert!(!found.complete);
    assert!(found.value.is_empty());
    let err = found.into_complete("paths_to_root").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);

    // Without a deadline the same search reaches the root.
    let full = analysis
        .paths_to_root("5000", 1, 10_000, Deadline::NONE)
        .unwrap()
        .into_complete("paths_to_root")
        .unwrap();
    assert_eq!(full.len(), 1);
    assert_eq!(full[0].steps.len(), 5000);
}

#[test]
fn depth_limit_prunes_long_paths() {
    let analysis = analyse(chain_graph(10));
    let found = analysis
        .paths_to_root("10", 5, 3, Deadline::NONE)
        .unwrap()
        .value;
    assert!(found.is_empty());
}

#[test]
fn root_object_has_zero_hop_path() {
    let analysis = analyse(diamond_graph());
    let found = analysis
        .paths_to_root(&id(Diamond::R), 0, 0, Deadline::NONE)
        .unwrap()
        .value;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].steps.len(), 1);
}

#[test]
fn fields_follow_declared_order() {
    let analysis = analyse(diamond_graph());
    let fields = analysis.object_fields(&id(Diamond::B)).unwrap();
    let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["next", "other", "value"]);
}
