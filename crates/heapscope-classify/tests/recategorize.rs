// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(clippy::unwrap_used)]
//! A prefix change shows up in class rankings of an already-built analysis.

use std::sync::Arc;

use heapscope_classify::PrefixCategorizer;
use heapscope_core::{
    AnalysisOptions, CategoryFilter, ClassCategory, ClassId, ClassInfo, Deadline, HeapAnalysis,
    HeapGraphBuilder, ObjectId, ObjectRecord, RootKind, SortKey,
};

fn class(name: &str) -> ClassInfo {
    ClassInfo {
        name: name.into(),
        superclass: None,
        instance_fields: vec![],
    }
}

#[test]
fn business_prefix_changes_rankings_without_rebuilding() {
    let mut b = HeapGraphBuilder::new();
    b.insert_class(ClassId(1), class("com.acme.billing.Invoice"));
    b.insert_class(ClassId(2), class("com.acme.web.Session"));
    b.insert_class(ClassId(3), class("java.util.HashMap"));
    for (i, c) in [1u64, 2, 2, 3].into_iter().enumerate() {
        let id = ObjectId(0x100 + i as u64);
        b.insert_object(id, ObjectRecord::new(ClassId(c), 16));
        b.add_root(id, RootKind::StaticField);
    }
    let categorizer = Arc::new(PrefixCategorizer::new());
    let analysis = HeapAnalysis::new(
        Arc::new(b.build().unwrap()),
        categorizer.clone(),
        AnalysisOptions::default(),
    )
    .unwrap();

    let only_business = CategoryFilter::only(&[ClassCategory::Business]);
    let before = analysis.biggest_classes(10, SortKey::Shallow, only_business, Deadline::NONE);
    assert!(before.complete);
    assert!(before.value.is_empty());

    categorizer.add_business_prefix("com.acme.billing.");
    let after = analysis.biggest_classes(10, SortKey::Shallow, only_business, Deadline::NONE);
    let names: Vec<&str> = after.value.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["com.acme.billing.Invoice"]);

    let defaults = analysis.biggest_classes(10, SortKey::Shallow, CategoryFilter::default(), Deadline::NONE);
    let names: Vec<&str> = defaults.value.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["com.acme.web.Session", "com.acme.billing.Invoice"]);
}
