// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the shading graph.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A parameter value stored on a node.
///
/// Inputs without an inbound edge fall back to these, keyed by input port ID.
/// Colors are stored as `"#rrggbb"` text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// Numeric value
    Number(f64),
    /// Textual value (colors, property names)
    Text(String),
}

impl ParamValue {
    /// Get the numeric value, if this is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    /// Get the numeric value, or a fallback
    pub fn number_or(&self, fallback: f64) -> f64 {
        self.as_number().unwrap_or(fallback)
    }

    /// Get the text value, if this is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Number(_) => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// A node instance in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Operation kind, resolved against the operation registry
    pub op_kind: String,
    /// Display label (user-renamable; drives variable naming for properties)
    pub name: String,
    /// Position on the canvas; opaque to the compiler
    pub position: [f32; 2],
    /// Stored parameter values by input port key
    pub params: IndexMap<String, ParamValue>,
    /// Input ports surfaced on the node body (used by the terminal node)
    pub exposed_ports: BTreeSet<String>,
}

impl Node {
    /// Create a new node of the given operation kind
    pub fn new(op_kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            op_kind: op_kind.into(),
            name: name.into(),
            position: [0.0, 0.0],
            params: IndexMap::new(),
            exposed_ports: BTreeSet::new(),
        }
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    /// Store a parameter value
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Get a stored parameter value
    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    /// Get a stored numeric parameter, or a fallback
    pub fn number_param(&self, key: &str, fallback: f64) -> f64 {
        self.param(key).map_or(fallback, |v| v.number_or(fallback))
    }

    /// Store a parameter value in place
    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.params.insert(key.into(), value.into());
    }
}
