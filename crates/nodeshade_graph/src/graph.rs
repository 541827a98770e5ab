// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and edges.

use crate::edge::{Edge, EdgeId};
use crate::node::{Node, NodeId};
use crate::registry::{OpRegistry, OUTPUT_KIND};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A shading node graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    nodes: IndexMap<NodeId, Node>,
    edges: IndexMap<EdgeId, Edge>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node and every edge touching it
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        self.edges.retain(|_, e| !e.involves_node(node_id));
        self.nodes.shift_remove(&node_id)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// All nodes, in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All node IDs, in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Connect an output port to an input port, validating against the registry
    pub fn connect(
        &mut self,
        registry: &OpRegistry,
        from_node: NodeId,
        from_port: &str,
        to_node: NodeId,
        to_port: &str,
    ) -> Result<EdgeId, GraphError> {
        if from_node == to_node {
            return Err(GraphError::SelfLoop);
        }
        let source = self.nodes.get(&from_node).ok_or(GraphError::NodeNotFound(from_node))?;
        let target = self.nodes.get(&to_node).ok_or(GraphError::NodeNotFound(to_node))?;

        let source_def = registry
            .get(&source.op_kind)
            .ok_or_else(|| GraphError::UnknownKind(source.op_kind.clone()))?;
        let target_def = registry
            .get(&target.op_kind)
            .ok_or_else(|| GraphError::UnknownKind(target.op_kind.clone()))?;

        let out_spec = source_def
            .output(from_port)
            .ok_or_else(|| GraphError::PortNotFound(from_port.to_string()))?;
        let in_spec = target_def
            .input(to_port)
            .ok_or_else(|| GraphError::PortNotFound(to_port.to_string()))?;

        if !out_spec.data_type.can_connect_to(in_spec.data_type) {
            return Err(GraphError::IncompatibleTypes);
        }

        // Single-input-per-port invariant.
        if self.edge_into_port(to_node, to_port).is_some() {
            return Err(GraphError::PortOccupied(to_port.to_string()));
        }

        let edge = Edge::new(from_node, from_port, to_node, to_port, out_spec.data_type);
        let id = edge.id;
        self.edges.insert(id, edge);
        Ok(id)
    }

    /// Insert a pre-built edge, replacing any edge into the same input port.
    ///
    /// Used by the reconstructor and merger, which build edges wholesale.
    pub fn insert_edge(&mut self, edge: Edge) -> EdgeId {
        self.edges
            .retain(|_, e| !(e.to_node == edge.to_node && e.to_port == edge.to_port));
        let id = edge.id;
        self.edges.insert(id, edge);
        id
    }

    /// Remove an edge
    pub fn disconnect(&mut self, edge_id: EdgeId) -> Option<Edge> {
        self.edges.shift_remove(&edge_id)
    }

    /// All edges, in insertion order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edges feeding a node's inputs
    pub fn edges_into(&self, node_id: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.values().filter(move |e| e.to_node == node_id)
    }

    /// Edges leaving a node's outputs
    pub fn edges_out_of(&self, node_id: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.values().filter(move |e| e.from_node == node_id)
    }

    /// The edge feeding a specific input port, if any
    pub fn edge_into_port(&self, node_id: NodeId, port: &str) -> Option<&Edge> {
        self.edges
            .values()
            .find(|e| e.to_node == node_id && e.to_port == port)
    }

    /// The terminal (sink) node, if present
    pub fn terminal(&self) -> Option<&Node> {
        self.nodes.values().find(|n| n.op_kind == OUTPUT_KIND)
    }

    /// ID of the terminal node, if present
    pub fn terminal_id(&self) -> Option<NodeId> {
        self.terminal().map(|n| n.id)
    }
}

/// Error when mutating the graph
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Node not found
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// Port key not declared by the operation
    #[error("port not found: {0}")]
    PortNotFound(String),

    /// Operation kind absent from the registry
    #[error("unknown operation kind: {0}")]
    UnknownKind(String),

    /// Incompatible port data types
    #[error("incompatible port types")]
    IncompatibleTypes,

    /// Input port already has an inbound edge
    #[error("input port already connected: {0}")]
    PortOccupied(String),

    /// Self-loop not allowed
    #[error("self-loop not allowed")]
    SelfLoop,
}
