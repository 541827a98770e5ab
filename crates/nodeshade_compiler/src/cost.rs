// SPDX-License-Identifier: MIT OR Apache-2.0
//! Estimated shading cost for the subgraph feeding the terminal node.

use nodeshade_graph::registry::OUTPUT_KIND;
use nodeshade_graph::{Graph, NodeId};
use std::collections::{HashMap, HashSet, VecDeque};

/// Terminal parameter key the accumulated cost is written to.
pub const COST_PARAM: &str = "cost";

/// Sum the per-kind costs of every node reachable backwards from the
/// terminal, terminal excluded. Kinds absent from `table` cost zero, so
/// disconnected decoration never inflates the estimate.
pub fn total_cost(graph: &Graph, table: &HashMap<String, f64>) -> f64 {
    let Some(terminal) = graph.terminal_id() else {
        return 0.0;
    };
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    seen.insert(terminal);
    queue.push_back(terminal);
    let mut total = 0.0;
    while let Some(id) = queue.pop_front() {
        if id != terminal {
            if let Some(node) = graph.node(id) {
                if node.op_kind != OUTPUT_KIND {
                    total += table.get(&node.op_kind).copied().unwrap_or(0.0);
                }
            }
        }
        for edge in graph.edges_into(id) {
            if seen.insert(edge.from_node) {
                queue.push_back(edge.from_node);
            }
        }
    }
    total
}

/// Recompute the cost and store it on the terminal. Returns whether the
/// stored value actually changed, so callers can skip redundant save and
/// regeneration passes.
pub fn apply_cost(graph: &mut Graph, table: &HashMap<String, f64>) -> bool {
    let total = total_cost(graph, table);
    let Some(terminal) = graph.terminal_id() else {
        return false;
    };
    let current = graph
        .node(terminal)
        .map(|n| n.number_param(COST_PARAM, f64::NAN))
        .unwrap_or(f64::NAN);
    if current == total {
        return false;
    }
    if let Some(node) = graph.node_mut(terminal) {
        node.set_param(COST_PARAM, total);
        true
    } else {
        false
    }
}
