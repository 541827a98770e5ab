// SPDX-License-Identifier: MIT OR Apache-2.0
//! Forward migration of persisted graph documents.
//!
//! Documents written by older builds are upgraded in place on load: deprecated
//! visual-kind tags are remapped from the node's operation kind, and the
//! terminal node's exposed-port list is backfilled when absent.

use crate::edge::Edge;
use crate::graph::Graph;
use crate::node::{Node, NodeId, ParamValue};
use crate::registry::{OpCategory, OpRegistry, OUTPUT_KIND};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Current persisted document version
pub const FORMAT_VERSION: u32 = 2;

/// Ports always exposed on the terminal node
pub const DEFAULT_EXPOSED_PORTS: [&str; 3] = ["color", "roughness", "metalness"];

/// Visual-kind tags retired by older builds
const DEPRECATED_VIEW_TAGS: [&str; 4] = ["noiseNode", "colorNode", "outputNode", "uniformNode"];

/// A node as written to durable storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedNode {
    /// Node ID
    pub id: NodeId,
    /// Operation kind
    pub op_kind: String,
    /// Visual widget tag consumed by the editing surface
    pub view_tag: String,
    /// Display label
    pub name: String,
    /// Canvas position
    pub position: [f32; 2],
    /// Stored parameter values
    #[serde(default)]
    pub params: IndexMap<String, ParamValue>,
    /// Exposed input ports; absent in documents written before v2
    #[serde(default)]
    pub exposed_ports: Option<BTreeSet<String>>,
}

/// A graph document as written to durable storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedGraph {
    /// Document format version
    pub version: u32,
    /// Nodes
    pub nodes: Vec<PersistedNode>,
    /// Edges
    pub edges: Vec<Edge>,
}

/// The visual-kind tag current builds expect for an operation kind
pub fn view_tag_for(registry: &OpRegistry, op_kind: &str) -> String {
    let tag = match registry.get(op_kind).map(|d| d.category) {
        Some(OpCategory::Output) => "output_node",
        Some(OpCategory::Procedural) => "procedural_node",
        Some(OpCategory::Property) => "property_node",
        _ => "standard_node",
    };
    tag.to_string()
}

/// Upgrade a persisted document to [`FORMAT_VERSION`] in place
pub fn migrate(registry: &OpRegistry, doc: &mut PersistedGraph) {
    if doc.version >= FORMAT_VERSION {
        return;
    }
    tracing::info!(from = doc.version, to = FORMAT_VERSION, "migrating persisted graph");

    for node in &mut doc.nodes {
        if DEPRECATED_VIEW_TAGS.contains(&node.view_tag.as_str()) {
            node.view_tag = view_tag_for(registry, &node.op_kind);
        }
    }

    // Backfill exposed ports on the terminal node: union of the fixed
    // default set and every port that already has an inbound edge.
    for node in &mut doc.nodes {
        if node.op_kind != OUTPUT_KIND || node.exposed_ports.is_some() {
            continue;
        }
        let mut ports: BTreeSet<String> =
            DEFAULT_EXPOSED_PORTS.iter().map(|p| (*p).to_string()).collect();
        for edge in doc.edges.iter().filter(|e| e.to_node == node.id) {
            ports.insert(edge.to_port.clone());
        }
        node.exposed_ports = Some(ports);
    }

    doc.version = FORMAT_VERSION;
}

/// Convert a persisted document into a live graph
pub fn into_graph(doc: PersistedGraph) -> Graph {
    let mut graph = Graph::new();
    for pn in doc.nodes {
        let node = Node {
            id: pn.id,
            op_kind: pn.op_kind,
            name: pn.name,
            position: pn.position,
            params: pn.params,
            exposed_ports: pn.exposed_ports.unwrap_or_default(),
        };
        graph.add_node(node);
    }
    for edge in doc.edges {
        graph.insert_edge(edge);
    }
    graph
}

/// Convert a live graph into its persisted form
pub fn from_graph(registry: &OpRegistry, graph: &Graph) -> PersistedGraph {
    PersistedGraph {
        version: FORMAT_VERSION,
        nodes: graph
            .nodes()
            .map(|n| PersistedNode {
                id: n.id,
                op_kind: n.op_kind.clone(),
                view_tag: view_tag_for(registry, &n.op_kind),
                name: n.name.clone(),
                position: n.position,
                params: n.params.clone(),
                exposed_ports: Some(n.exposed_ports.clone()),
            })
            .collect(),
        edges: graph.edges().cloned().collect(),
    }
}
