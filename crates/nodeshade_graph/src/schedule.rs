// SPDX-License-Identifier: MIT OR Apache-2.0
//! Topological scheduling of graph nodes.

use crate::graph::Graph;
use crate::node::NodeId;
use indexmap::IndexMap;
use std::collections::VecDeque;

/// Result of scheduling a graph
#[derive(Debug, Clone)]
pub struct Schedule {
    /// Node IDs in dependency order: for every edge, the source appears
    /// before the target
    pub order: Vec<NodeId>,
    /// Nodes excluded because they never reached in-degree zero (cycles)
    pub dropped: usize,
}

/// Order the graph's nodes so that every edge's source precedes its target.
///
/// Kahn's algorithm over the insertion-ordered node map, so identical graphs
/// always schedule identically. Nodes caught in a cycle never reach in-degree
/// zero and are excluded from the order; the exclusion is reported in
/// [`Schedule::dropped`] and logged, not surfaced as an error.
pub fn topological_order(graph: &Graph) -> Schedule {
    let mut in_degree: IndexMap<NodeId, usize> =
        graph.node_ids().map(|id| (id, 0)).collect();
    for edge in graph.edges() {
        if let Some(d) = in_degree.get_mut(&edge.to_node) {
            *d += 1;
        }
    }

    let mut queue: VecDeque<NodeId> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(id, _)| *id)
        .collect();

    let mut order = Vec::with_capacity(in_degree.len());
    while let Some(id) = queue.pop_front() {
        order.push(id);
        for edge in graph.edges_out_of(id) {
            if let Some(d) = in_degree.get_mut(&edge.to_node) {
                *d -= 1;
                if *d == 0 {
                    queue.push_back(edge.to_node);
                }
            }
        }
    }

    let dropped = in_degree.len() - order.len();
    if dropped > 0 {
        let excluded: Vec<NodeId> = in_degree
            .keys()
            .filter(|id| !order.contains(id))
            .copied()
            .collect();
        tracing::warn!(dropped, ?excluded, "cycle detected; nodes excluded from schedule");
    }

    Schedule { order, dropped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Edge;
    use crate::node::Node;
    use crate::registry::{create_shading_registry, DataType};

    #[test]
    fn test_order_respects_edges() {
        let registry = create_shading_registry();
        let mut graph = Graph::new();
        // Insert out of dependency order on purpose.
        let mix = graph.add_node(Node::new("mix", "Mix"));
        let noise = graph.add_node(Node::new("noise", "Noise"));
        let pos = graph.add_node(Node::new("position", "Position"));
        graph.connect(&registry, pos, "out", noise, "position").unwrap();
        graph.connect(&registry, noise, "out", mix, "t").unwrap();

        let schedule = topological_order(&graph);
        assert_eq!(schedule.order.len(), 3);
        assert_eq!(schedule.dropped, 0);
        for edge in graph.edges() {
            let from = schedule.order.iter().position(|id| *id == edge.from_node).unwrap();
            let to = schedule.order.iter().position(|id| *id == edge.to_node).unwrap();
            assert!(from < to);
        }
    }

    #[test]
    fn test_cycle_members_are_dropped() {
        let mut graph = Graph::new();
        let a = graph.add_node(Node::new("add", "Add"));
        let b = graph.add_node(Node::new("add", "Add"));
        let lone = graph.add_node(Node::new("float", "Float"));
        // Bypass connect() validation to build the cycle directly.
        graph.insert_edge(Edge::new(a, "out", b, "a", DataType::Any));
        graph.insert_edge(Edge::new(b, "out", a, "a", DataType::Any));

        let schedule = topological_order(&graph);
        assert_eq!(schedule.order, vec![lone]);
        assert_eq!(schedule.dropped, 2);
    }

    #[test]
    fn test_deterministic_for_identical_graphs() {
        let registry = create_shading_registry();
        let build = || {
            let mut graph = Graph::new();
            let t = graph.add_node(Node::new("time", "Time"));
            let s = graph.add_node(Node::new("sin", "Sine"));
            let f = graph.add_node(Node::new("float", "Float"));
            graph.connect(&registry, t, "out", s, "value").unwrap();
            (graph, t, s, f)
        };
        let (g1, t1, s1, f1) = build();
        let (g2, t2, s2, f2) = build();
        let o1: Vec<usize> = topological_order(&g1)
            .order
            .iter()
            .map(|id| [t1, s1, f1].iter().position(|n| n == id).unwrap())
            .collect();
        let o2: Vec<usize> = topological_order(&g2)
            .order
            .iter()
            .map(|id| [t2, s2, f2].iter().position(|n| n == id).unwrap())
            .collect();
        assert_eq!(o1, o2);
    }
}
