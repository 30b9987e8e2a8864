// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Direct predecessor lookup.

use crate::graph::{HeapGraph, InEdge};
use crate::ident::Slot;

/// Objects holding a reference to `slot`, one entry per incoming edge.
///
/// Entries are in index order (source slot, then edge order) and truncated
/// to `limit`. Returns the entries and the untruncated count.
#[must_use]
pub fn direct_retainers(graph: &HeapGraph, slot: Slot, limit: usize) -> (Vec<InEdge>, usize) {
    let total = graph.in_degree(slot);
    (graph.in_edges(slot).take(limit).collect(), total)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::record::{ClassInfo, EdgeRecord, ObjectRecord};
    use crate::{ClassId, HeapGraphBuilder, ObjectId};

    #[test]
    fn one_entry_per_edge_in_index_order() {
        let mut b = HeapGraphBuilder::new();
        b.insert_class(
            ClassId(1),
            ClassInfo {
                name: "Holder".into(),
                superclass: None,
                instance_fields: vec!["a".into(), "b".into()],
            },
        );
        b.insert_object(
            ObjectId(1),
            ObjectRecord::new(ClassId(1), 16)
                .with_edge(EdgeRecord::field("a", ObjectId(3)))
                .with_edge(EdgeRecord::field("b", ObjectId(3))),
        );
        b.insert_object(
            ObjectId(2),
            ObjectRecord::new(ClassId(1), 16).with_edge(EdgeRecord::field("a", ObjectId(3))),
        );
        b.insert_object(ObjectId(3), ObjectRecord::new(ClassId(1), 16));
        let graph = b.build().unwrap();
        let target = graph.slot_of(ObjectId(3)).unwrap();

        let (all, total) = direct_retainers(&graph, target, 10);
        assert_eq!(total, 3);
        let sources: Vec<ObjectId> = all.iter().map(|r| graph.object_id(r.source)).collect();
        assert_eq!(sources, vec![ObjectId(1), ObjectId(1), ObjectId(2)]);
        let labels: Vec<String> = all.iter().map(|r| graph.edge(r.edge).label().to_string()).collect();
        assert_eq!(labels, vec!["a", "b", "a"]);

        let (two, total) = direct_retainers(&graph, target, 2);
        assert_eq!(two.len(), 2);
        assert_eq!(total, 3);
    }
}
