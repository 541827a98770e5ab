// SPDX-License-Identifier: MIT OR Apache-2.0
//! CPU-side expression evaluation for live preview values.
//!
//! Walks the graph from the requested node, producing a multi-channel numeric
//! value per node. `None` means "unevaluable": values that depend on
//! per-fragment geometry, unknown kinds, or cycles. Results are memoized per
//! pass so shared producers are evaluated once.

use crate::literal::{channel_index, css_to_rgb};
use crate::noise;
use nodeshade_graph::registry::PRIMARY_CHANNEL;
use nodeshade_graph::{Graph, Node, NodeId, ParamValue};
use std::collections::{HashMap, HashSet};

/// Evaluate one node's channels at the given time.
///
/// Pure: identical arguments always produce identical output.
pub fn evaluate(graph: &Graph, node_id: NodeId, time: f32) -> Option<Vec<f32>> {
    EvalContext::new(graph, time).evaluate(node_id)
}

/// A single evaluation pass with its memo cache.
///
/// Reuse one context when sampling many nodes of the same graph at the same
/// time, e.g. the per-frame preview sweep.
pub struct EvalContext<'a> {
    graph: &'a Graph,
    time: f32,
    cache: HashMap<NodeId, Option<Vec<f32>>>,
    visiting: HashSet<NodeId>,
}

impl<'a> EvalContext<'a> {
    /// Create a pass over `graph` at `time`
    pub fn new(graph: &'a Graph, time: f32) -> Self {
        Self {
            graph,
            time,
            cache: HashMap::new(),
            visiting: HashSet::new(),
        }
    }

    /// Evaluate a node, memoized
    pub fn evaluate(&mut self, id: NodeId) -> Option<Vec<f32>> {
        if let Some(cached) = self.cache.get(&id) {
            return cached.clone();
        }
        // A node re-entered before finishing sits on a cycle.
        if !self.visiting.insert(id) {
            return None;
        }
        let node = self.graph.node(id);
        let result = node.and_then(|n| self.eval_node(n));
        self.visiting.remove(&id);
        self.cache.insert(id, result.clone());
        result
    }

    fn eval_node(&mut self, node: &Node) -> Option<Vec<f32>> {
        match node.op_kind.as_str() {
            "float" | "property" => Some(vec![node.number_param("value", 0.0) as f32]),
            "color" => {
                let hex = node.param("hex").and_then(ParamValue::as_text).unwrap_or("#ffffff");
                css_to_rgb(hex).map(|rgb| rgb.to_vec())
            }
            "vec2" => self.assemble(node, &["x", "y"]),
            "vec3" => self.assemble(node, &["x", "y", "z"]),
            "vec4" => self.assemble(node, &["x", "y", "z", "w"]),
            "time" => Some(vec![self.time]),
            // Per-fragment geometry has no single preview value.
            "position" | "normal" | "uv" => None,

            "add" => self.binary(node, |a, b| a + b),
            "subtract" => self.binary(node, |a, b| a - b),
            "multiply" => self.binary(node, |a, b| a * b),
            "divide" => self.binary(node, |a, b| if b == 0.0 { 0.0 } else { a / b }),

            "sin" => self.unary(node, f32::sin),
            "cos" => self.unary(node, f32::cos),
            "abs" => self.unary(node, f32::abs),
            "floor" => self.unary(node, f32::floor),
            "fract" => self.unary(node, |v| v - v.floor()),
            "one_minus" => self.unary(node, |v| 1.0 - v),

            "mix" => {
                let a = self.input(node, "a")?;
                let b = self.input(node, "b")?;
                let t = self.input(node, "t")?;
                Some(broadcast3(&a, &b, &t, |a, b, t| a * (1.0 - t) + b * t))
            }
            "smoothstep" => {
                let low = self.input(node, "low")?;
                let high = self.input(node, "high")?;
                let value = self.input(node, "value")?;
                Some(broadcast3(&low, &high, &value, |low, high, v| {
                    if (high - low).abs() < f32::EPSILON {
                        if v < low { 0.0 } else { 1.0 }
                    } else {
                        let t = ((v - low) / (high - low)).clamp(0.0, 1.0);
                        t * t * (3.0 - 2.0 * t)
                    }
                }))
            }
            "remap" => {
                let value = self.input(node, "value")?;
                let in_low = self.scalar(node, "in_low", 0.0)?;
                let in_high = self.scalar(node, "in_high", 1.0)?;
                let out_low = self.scalar(node, "out_low", 0.0)?;
                let out_high = self.scalar(node, "out_high", 1.0)?;
                let span = in_high - in_low;
                Some(
                    value
                        .iter()
                        .map(|v| {
                            if span.abs() < f32::EPSILON {
                                out_low
                            } else {
                                out_low + (v - in_low) * (out_high - out_low) / span
                            }
                        })
                        .collect(),
                )
            }
            "select" => {
                let cond = self.scalar(node, "cond", 0.0)?;
                if cond >= 0.5 {
                    self.input(node, "a")
                } else {
                    self.input(node, "b")
                }
            }

            "length" => {
                let v = self.input(node, "value")?;
                Some(vec![norm(&v)])
            }
            "distance" => {
                let a = self.input(node, "a")?;
                let b = self.input(node, "b")?;
                let diff = broadcast2(&a, &b, |a, b| a - b);
                Some(vec![norm(&diff)])
            }
            "dot" => {
                let a = self.input(node, "a")?;
                let b = self.input(node, "b")?;
                Some(vec![broadcast2(&a, &b, |a, b| a * b).iter().sum()])
            }
            "normalize" => {
                let v = self.input(node, "value")?;
                let len = norm(&v);
                if len == 0.0 {
                    Some(vec![0.0; v.len()])
                } else {
                    Some(v.iter().map(|c| c / len).collect())
                }
            }
            "cross" => {
                let a = self.input(node, "a")?;
                let b = self.input(node, "b")?;
                if a.len() < 3 || b.len() < 3 {
                    return None;
                }
                Some(vec![
                    a[1] * b[2] - a[2] * b[1],
                    a[2] * b[0] - a[0] * b[2],
                    a[0] * b[1] - a[1] * b[0],
                ])
            }
            "split" => self.input(node, "value"),

            "noise" => {
                let (x, y) = self.sample_point(node)?;
                Some(vec![noise::gradient2(x, y)])
            }
            "fbm" => {
                let (x, y) = self.sample_point(node)?;
                let octaves = self.scalar(node, "octaves", 4.0)?.max(1.0) as u32;
                Some(vec![noise::fractal2(x, y, octaves)])
            }
            "voronoi" => {
                let (x, y) = self.sample_point(node)?;
                Some(vec![noise::cell2(x, y)])
            }

            "output" => {
                let edge = self.graph.edge_into_port(node.id, PRIMARY_CHANNEL)?;
                let from = edge.from_node;
                self.evaluate(from)
            }

            _ => None,
        }
    }

    /// Resolve an input port to channels: the inbound edge's producer when
    /// connected (picking one channel for splitter taps), else the stored
    /// parameter, else zero.
    fn input(&mut self, node: &Node, port: &str) -> Option<Vec<f32>> {
        if let Some(edge) = self.graph.edge_into_port(node.id, port) {
            let from = edge.from_node;
            let from_port = edge.from_port.clone();
            let value = self.evaluate(from)?;
            if from_port != "out" {
                if let Some(idx) = channel_index(&from_port) {
                    return Some(vec![value.get(idx).copied().unwrap_or(0.0)]);
                }
            }
            return Some(value);
        }
        match node.param(port) {
            Some(ParamValue::Number(n)) => Some(vec![*n as f32]),
            Some(ParamValue::Text(s)) => css_to_rgb(s).map(|rgb| rgb.to_vec()),
            None => Some(vec![0.0]),
        }
    }

    fn scalar(&mut self, node: &Node, port: &str, fallback: f32) -> Option<f32> {
        if self.graph.edge_into_port(node.id, port).is_none() && node.param(port).is_none() {
            return Some(fallback);
        }
        self.input(node, port).map(|v| v.first().copied().unwrap_or(fallback))
    }

    /// Constructor channels from named sub-inputs
    fn assemble(&mut self, node: &Node, components: &[&str]) -> Option<Vec<f32>> {
        let mut channels = Vec::with_capacity(components.len());
        for component in components {
            channels.push(self.scalar(node, component, 0.0)?);
        }
        Some(channels)
    }

    fn binary(&mut self, node: &Node, f: fn(f32, f32) -> f32) -> Option<Vec<f32>> {
        let a = self.input(node, "a")?;
        let b = self.input(node, "b")?;
        Some(broadcast2(&a, &b, f))
    }

    fn unary(&mut self, node: &Node, f: fn(f32) -> f32) -> Option<Vec<f32>> {
        let v = self.input(node, "value")?;
        Some(v.iter().map(|c| f(*c)).collect())
    }

    /// Representative 2D sample point for the procedural family: the first
    /// two channels of the position input (sample center when unconnected),
    /// scaled by the scale sub-parameter.
    fn sample_point(&mut self, node: &Node) -> Option<(f32, f32)> {
        let pos = if self.graph.edge_into_port(node.id, "position").is_some() {
            self.input(node, "position")?
        } else {
            vec![0.5, 0.5]
        };
        let x = pos.first().copied().unwrap_or(0.5);
        let y = pos.get(1).copied().unwrap_or(x);
        let scale = self.scalar(node, "scale", 1.0)?;
        Some((x * scale, y * scale))
    }
}

fn at(v: &[f32], i: usize) -> f32 {
    if v.is_empty() {
        0.0
    } else {
        v[i % v.len()]
    }
}

/// Component-wise application with cyclic broadcast of the shorter operand
fn broadcast2(a: &[f32], b: &[f32], f: impl Fn(f32, f32) -> f32) -> Vec<f32> {
    let len = a.len().max(b.len()).max(1);
    (0..len).map(|i| f(at(a, i), at(b, i))).collect()
}

fn broadcast3(a: &[f32], b: &[f32], c: &[f32], f: impl Fn(f32, f32, f32) -> f32) -> Vec<f32> {
    let len = a.len().max(b.len()).max(c.len()).max(1);
    (0..len).map(|i| f(at(a, i), at(b, i), at(c, i))).collect()
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|c| c * c).sum::<f32>().sqrt()
}
