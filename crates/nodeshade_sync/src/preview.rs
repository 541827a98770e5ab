// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-frame preview sampling for registered consumers.
//!
//! The hub only asks for animation-frame callbacks while at least one
//! consumer is registered and the graph contains a time source; static
//! graphs are sampled once on change instead.

use nodeshade_compiler::EvalContext;
use nodeshade_graph::registry::TIME_KIND;
use nodeshade_graph::{Graph, NodeId};
use std::collections::HashMap;

/// Tracks preview consumers and drives evaluation passes for them.
#[derive(Debug, Default)]
pub struct PreviewHub {
    consumers: usize,
}

impl PreviewHub {
    /// Create a hub with no consumers
    pub fn new() -> Self {
        Self::default()
    }

    /// A preview consumer came online
    pub fn register(&mut self) {
        self.consumers += 1;
        tracing::debug!(consumers = self.consumers, "Preview consumer registered");
    }

    /// A preview consumer went away
    pub fn unregister(&mut self) {
        self.consumers = self.consumers.saturating_sub(1);
        tracing::debug!(consumers = self.consumers, "Preview consumer unregistered");
    }

    /// Number of registered consumers
    pub fn consumer_count(&self) -> usize {
        self.consumers
    }

    /// Whether the caller should keep scheduling per-frame sample passes.
    pub fn wants_frame_updates(&self, graph: &Graph) -> bool {
        self.consumers > 0 && graph.nodes().any(|n| n.op_kind == TIME_KIND)
    }

    /// Evaluate every node once at `time`, sharing one memo cache across the
    /// pass. Unevaluable nodes are absent from the result.
    pub fn sample(&self, graph: &Graph, time: f32) -> HashMap<NodeId, Vec<f32>> {
        let mut ctx = EvalContext::new(graph, time);
        let mut values = HashMap::new();
        for id in graph.node_ids() {
            if let Some(channels) = ctx.evaluate(id) {
                values.insert(id, channels);
            }
        }
        values
    }
}
