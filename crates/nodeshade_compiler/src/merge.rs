// SPDX-License-Identifier: MIT OR Apache-2.0
//! Identity-preserving merge of a freshly parsed graph against the live one.
//!
//! The editing surface keys selection and animation state off node IDs;
//! replacing the graph wholesale on every keystroke would reset that
//! continuity. Matched nodes inherit the live node's ID and position. The
//! matching is a greedy two-pass heuristic (exact kind+label, then kind
//! only), deliberately kept order-dependent for parity with previously
//! persisted graphs.

use indexmap::IndexMap;
use nodeshade_graph::{Edge, Graph, NodeId};
use std::collections::HashSet;

/// Merge `parsed` against `live`, preserving node identity where possible.
///
/// Unmatched parsed nodes keep their fresh IDs and default positions; an
/// external auto-layout step places them afterwards. Every edge is rewritten
/// to the resolved IDs with its canonical edge ID recomputed. Never fails.
pub fn merge(parsed: &Graph, live: &Graph) -> Graph {
    let mut id_map: IndexMap<NodeId, NodeId> = IndexMap::new();
    let mut used: HashSet<NodeId> = HashSet::new();

    // Pass 1: exact matches on (kind, label).
    for new_node in parsed.nodes() {
        let matched = live.nodes().find(|old| {
            !used.contains(&old.id) && old.op_kind == new_node.op_kind && old.name == new_node.name
        });
        if let Some(old) = matched {
            used.insert(old.id);
            id_map.insert(new_node.id, old.id);
        }
    }

    // Pass 2: any unused node of the same kind.
    for new_node in parsed.nodes() {
        if id_map.contains_key(&new_node.id) {
            continue;
        }
        let matched = live
            .nodes()
            .find(|old| !used.contains(&old.id) && old.op_kind == new_node.op_kind);
        if let Some(old) = matched {
            used.insert(old.id);
            id_map.insert(new_node.id, old.id);
        }
    }

    let mut result = Graph::new();
    for new_node in parsed.nodes() {
        let mut node = new_node.clone();
        if let Some(old_id) = id_map.get(&new_node.id) {
            node.id = *old_id;
            if let Some(old) = live.node(*old_id) {
                node.position = old.position;
            }
        }
        result.add_node(node);
    }
    for edge in parsed.edges() {
        let from = id_map.get(&edge.from_node).copied().unwrap_or(edge.from_node);
        let to = id_map.get(&edge.to_node).copied().unwrap_or(edge.to_node);
        result.insert_edge(Edge::new(
            from,
            edge.from_port.clone(),
            to,
            edge.to_port.clone(),
            edge.data_type,
        ));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodeshade_graph::registry::{create_shading_registry, OUTPUT_KIND};
    use nodeshade_graph::Node;

    #[test]
    fn test_exact_match_inherits_id_and_position() {
        let mut live = Graph::new();
        let old_id = live.add_node(Node::new("noise", "Noise").with_position(42.0, 7.0));

        let mut parsed = Graph::new();
        parsed.add_node(Node::new("noise", "Noise"));

        let merged = merge(&parsed, &live);
        let node = merged.nodes().next().unwrap();
        assert_eq!(node.id, old_id);
        assert_eq!(node.position, [42.0, 7.0]);
    }

    #[test]
    fn test_type_only_fallback() {
        let mut live = Graph::new();
        let old_id = live.add_node(Node::new("float", "Speed").with_position(5.0, 5.0));

        let mut parsed = Graph::new();
        parsed.add_node(Node::new("float", "Float"));

        let merged = merge(&parsed, &live);
        assert_eq!(merged.nodes().next().unwrap().id, old_id);
    }

    #[test]
    fn test_unmatched_nodes_stay_fresh() {
        let live = Graph::new();
        let mut parsed = Graph::new();
        let fresh = parsed.add_node(Node::new("add", "Add"));
        let merged = merge(&parsed, &live);
        assert_eq!(merged.nodes().next().unwrap().id, fresh);
    }

    #[test]
    fn test_edges_rewritten_with_canonical_ids() {
        let registry = create_shading_registry();

        let mut live = Graph::new();
        let old_color = live.add_node(Node::new("color", "Color"));
        let old_sink = live.add_node(Node::new(OUTPUT_KIND, "Output"));

        let mut parsed = Graph::new();
        let new_color = parsed.add_node(Node::new("color", "Color"));
        let new_sink = parsed.add_node(Node::new(OUTPUT_KIND, "Output"));
        parsed
            .connect(&registry, new_color, "out", new_sink, "color")
            .unwrap();

        let merged = merge(&parsed, &live);
        let edge = merged.edges().next().unwrap();
        assert_eq!(edge.from_node, old_color);
        assert_eq!(edge.to_node, old_sink);
        // Canonical ID matches one recomputed from the resolved endpoints.
        let expected = Edge::new(old_color, "out", old_sink, "color", edge.data_type);
        assert_eq!(edge.id, expected.id);
    }

    #[test]
    fn test_generate_parse_merge_round_trip() {
        use crate::codegen::generate;
        use crate::reconstruct::reconstruct;

        let registry = create_shading_registry();
        let mut live = Graph::new();
        let pos = live.add_node(Node::new("position", "Position"));
        let noise = live.add_node(Node::new("noise", "Noise"));
        let ca = live.add_node(Node::new("color", "Color").with_param("hex", "#ff0000"));
        let cb = live.add_node(Node::new("color", "Color").with_param("hex", "#0000ff"));
        let mix = live.add_node(Node::new("mix", "Mix"));
        let sink = live.add_node(Node::new(OUTPUT_KIND, "Output"));
        live.connect(&registry, pos, "out", noise, "position").unwrap();
        live.connect(&registry, noise, "out", mix, "t").unwrap();
        live.connect(&registry, ca, "out", mix, "a").unwrap();
        live.connect(&registry, cb, "out", mix, "b").unwrap();
        live.connect(&registry, mix, "out", sink, "color").unwrap();

        let text = generate(&live, &registry).text;
        let outcome = reconstruct(&text, &registry);
        assert!(outcome.errors.is_empty());
        let merged = merge(&outcome.graph, &live);

        // Same operation kinds under the same identities.
        for id in live.node_ids() {
            assert_eq!(
                merged.node(id).map(|n| n.op_kind.as_str()),
                live.node(id).map(|n| n.op_kind.as_str())
            );
        }
        // Same connectivity; canonical IDs make the edge sets comparable.
        let mut live_edges: Vec<_> = live.edges().map(|e| e.id).collect();
        let mut merged_edges: Vec<_> = merged.edges().map(|e| e.id).collect();
        live_edges.sort_by_key(|id| id.0);
        merged_edges.sort_by_key(|id| id.0);
        assert_eq!(live_edges, merged_edges);
        // Color values survive renormalization.
        assert_eq!(
            merged.node(ca).and_then(|n| n.param("hex")).cloned(),
            Some(nodeshade_graph::ParamValue::Text("#ff0000".to_string()))
        );
    }

    #[test]
    fn test_greedy_first_unused_order() {
        let mut live = Graph::new();
        let first = live.add_node(Node::new("float", "Float"));
        let second = live.add_node(Node::new("float", "Float"));

        let mut parsed = Graph::new();
        parsed.add_node(Node::new("float", "Float"));
        parsed.add_node(Node::new("float", "Float"));

        let merged = merge(&parsed, &live);
        let ids: Vec<NodeId> = merged.node_ids().collect();
        assert_eq!(ids, vec![first, second]);
    }
}
