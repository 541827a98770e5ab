// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shading node graph data model for `NodeShade`.
//!
//! This crate holds the representation shared by every other part of the
//! system:
//! - Nodes with stored parameter values and edges with canonical IDs
//! - The injected operation registry (ports, defaults, codegen bindings)
//! - Topological scheduling
//! - Forward migration of persisted graph documents

pub mod node;
pub mod edge;
pub mod graph;
pub mod registry;
pub mod schedule;
pub mod migrate;

pub use edge::{Edge, EdgeId};
pub use graph::{Graph, GraphError};
pub use node::{Node, NodeId, ParamValue};
pub use registry::{DataType, OpDef, OpRegistry, PortSpec};
pub use schedule::{topological_order, Schedule};
