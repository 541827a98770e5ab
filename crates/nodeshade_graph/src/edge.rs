// SPDX-License-Identifier: MIT OR Apache-2.0
//! Edge definitions for the shading graph.

use crate::node::NodeId;
use crate::registry::DataType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an edge.
///
/// Edge IDs are derived deterministically from the endpoint 4-tuple, so the
/// same connection always carries the same ID across parses and merges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub Uuid);

impl EdgeId {
    /// Compute the canonical ID for a connection
    pub fn canonical(from_node: NodeId, from_port: &str, to_node: NodeId, to_port: &str) -> Self {
        let key = format!("{from_node}:{from_port}:{to_node}:{to_port}");
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()))
    }
}

/// A directed connection from one node's output port to another's input port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Canonical edge ID
    pub id: EdgeId,
    /// Source node
    pub from_node: NodeId,
    /// Source output port key
    pub from_port: String,
    /// Target node
    pub to_node: NodeId,
    /// Target input port key
    pub to_port: String,
    /// Declared data type of the connection
    pub data_type: DataType,
}

impl Edge {
    /// Create an edge with its canonical ID
    pub fn new(
        from_node: NodeId,
        from_port: impl Into<String>,
        to_node: NodeId,
        to_port: impl Into<String>,
        data_type: DataType,
    ) -> Self {
        let from_port = from_port.into();
        let to_port = to_port.into();
        Self {
            id: EdgeId::canonical(from_node, &from_port, to_node, &to_port),
            from_node,
            from_port,
            to_node,
            to_port,
            data_type,
        }
    }

    /// Check if this edge touches a node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.from_node == node_id || self.to_node == node_id
    }
}
