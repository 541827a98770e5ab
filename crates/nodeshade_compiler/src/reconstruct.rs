// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph reconstruction: program text back into a freshly-identified graph.
//!
//! Every node produced here carries a brand-new ID; continuity with the live
//! graph is the merger's job, not ours. Operation kinds that do not resolve
//! in the registry are skipped silently, malformed text yields a positioned
//! error list and an empty graph.

use crate::lexer::SyntaxError;
use crate::literal::hex_to_css;
use crate::parser::{parse, Expr, Stmt};
use indexmap::IndexMap;
use nodeshade_graph::migrate::DEFAULT_EXPOSED_PORTS;
use nodeshade_graph::registry::{
    DataType, OpDef, OpRegistry, OUTPUT_CHANNELS, OUTPUT_KIND, PRIMARY_CHANNEL, PROPERTY_KIND,
};
use nodeshade_graph::{Edge, Graph, Node, NodeId, ParamValue};

/// Result of reconstructing a graph from text
#[derive(Debug, Default)]
pub struct ParseOutcome {
    /// The reconstructed graph; empty when `errors` is non-empty
    pub graph: Graph,
    /// Positioned syntax errors; empty on success
    pub errors: Vec<SyntaxError>,
}

/// Parse program text into a fresh graph, or a positioned error list.
///
/// Empty or whitespace-only text returns an empty, error-free outcome.
pub fn reconstruct(text: &str, registry: &OpRegistry) -> ParseOutcome {
    if text.trim().is_empty() {
        return ParseOutcome::default();
    }

    let stmts = match parse(text) {
        Ok(stmts) => stmts,
        Err(errors) => {
            tracing::debug!(count = errors.len(), "parse rejected");
            return ParseOutcome {
                graph: Graph::new(),
                errors,
            };
        }
    };
    if stmts.is_empty() {
        // Comment-only text behaves like empty text.
        return ParseOutcome::default();
    }

    let mut builder = Builder {
        registry,
        graph: Graph::new(),
        env: IndexMap::new(),
        terminal: None,
    };
    for stmt in &stmts {
        builder.stmt(stmt);
    }
    if builder.terminal.is_none() {
        // Always yield exactly one terminal node.
        builder.make_terminal();
    }

    ParseOutcome {
        graph: builder.graph,
        errors: Vec::new(),
    }
}

struct Builder<'a> {
    registry: &'a OpRegistry,
    graph: Graph,
    /// Bound identifiers to their producing node
    env: IndexMap<String, NodeId>,
    terminal: Option<NodeId>,
}

impl Builder<'_> {
    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Const { name, value } => self.binding(name, value),
            // Only the first return is honored.
            Stmt::Return(expr) if self.terminal.is_none() => self.return_stmt(expr),
            Stmt::Return(_) => {}
        }
    }

    fn binding(&mut self, name: &str, value: &Expr) {
        match value {
            Expr::Ident(id) => {
                if let Some(producer) = self.env.get(id).copied() {
                    // Plain alias of an earlier binding.
                    self.env.insert(name.to_string(), producer);
                } else if let Some(def) = self.registry.resolve(id) {
                    if def.inputs.is_empty() && def.defaults.is_empty() {
                        let node_id = self.graph.add_node(Node::new(&def.kind, &def.name));
                        self.env.insert(name.to_string(), node_id);
                    }
                }
            }
            Expr::Call { callee, args } => {
                if let Some(node_id) = self.call(name, None, callee, args) {
                    self.env.insert(name.to_string(), node_id);
                }
            }
            Expr::MethodCall {
                object,
                method,
                args,
            } => {
                if let Some(node_id) = self.call(name, Some(object), method, args) {
                    self.env.insert(name.to_string(), node_id);
                }
            }
            _ => {}
        }
    }

    /// Build a node for a call expression. Returns `None` when the callee
    /// does not resolve; the binding is then left undefined.
    fn call(
        &mut self,
        name: &str,
        receiver: Option<&Expr>,
        callee: &str,
        args: &[Expr],
    ) -> Option<NodeId> {
        let Some(def) = self.registry.resolve(callee) else {
            tracing::debug!(callee, "unresolvable call skipped");
            return None;
        };
        let def = def.clone();
        let label = if def.kind == PROPERTY_KIND {
            name.to_string()
        } else {
            def.name.clone()
        };
        let node_id = self.graph.add_node(Node::new(&def.kind, label));

        if def.is_constructor() {
            self.constructor_args(node_id, &def, args);
            return Some(node_id);
        }

        let mut port_idx = 0;
        if let Some(object) = receiver {
            // The chained receiver consumes the first input slot.
            if let Some(port_id) = def.inputs.first().map(|p| p.id.clone()) {
                self.wire_expr(object, node_id, &port_id, &def);
                port_idx = 1;
            }
        }

        if let [Expr::Object(fields)] = args {
            self.named_args(node_id, &def, fields);
            return Some(node_id);
        }

        for arg in args {
            if port_idx >= def.inputs.len() {
                // Ports exhausted; remaining positional args are dropped.
                break;
            }
            let port = def.inputs[port_idx].clone();
            match arg {
                Expr::Ident(_) | Expr::Member { .. } => {
                    self.wire_expr(arg, node_id, &port.id, &def);
                    port_idx += 1;
                }
                Expr::MethodCall {
                    object,
                    method,
                    args: margs,
                } if method == "mul" => {
                    // Scaled position form of the procedural family:
                    // binding(pos.mul(scale), ...). The receiver feeds this
                    // port, the factor lands in the scale sub-parameter.
                    self.wire_expr(object, node_id, &port.id, &def);
                    if let [Expr::Number { value, .. }] = margs.as_slice() {
                        if let Some(node) = self.graph.node_mut(node_id) {
                            node.set_param("scale", *value);
                        }
                    }
                    port_idx += 1;
                    if def.inputs.get(port_idx).is_some_and(|p| p.id == "scale") {
                        port_idx += 1;
                    }
                }
                Expr::Number { value, lexeme } => {
                    let stored = self.literal_value(*value, lexeme, port.data_type);
                    if let Some(node) = self.graph.node_mut(node_id) {
                        node.params.insert(port.id.clone(), stored);
                    }
                    port_idx += 1;
                }
                Expr::Str(s) => {
                    if let Some(node) = self.graph.node_mut(node_id) {
                        node.params.insert(port.id.clone(), ParamValue::Text(s.clone()));
                    }
                    port_idx += 1;
                }
                _ => {
                    port_idx += 1;
                }
            }
        }
        Some(node_id)
    }

    /// Positional literals of a zero-input constructor map onto its ordered
    /// default keys.
    fn constructor_args(&mut self, node_id: NodeId, def: &OpDef, args: &[Expr]) {
        for (i, arg) in args.iter().enumerate() {
            let Some((key, fallback)) = def.defaults.get_index(i) else {
                break;
            };
            let stored = match arg {
                Expr::Number { value, lexeme } => match (hex_to_css(lexeme), fallback) {
                    (Some(css), ParamValue::Text(_)) => ParamValue::Text(css),
                    _ => ParamValue::Number(*value),
                },
                Expr::Str(s) => ParamValue::Text(s.clone()),
                _ => continue,
            };
            if let Some(node) = self.graph.node_mut(node_id) {
                node.params.insert(key.clone(), stored);
            }
        }
    }

    /// A single object-literal argument is a named-parameters call: each
    /// property wires an edge or stores a value under its own key.
    fn named_args(&mut self, node_id: NodeId, def: &OpDef, fields: &[(String, Expr)]) {
        for (key, value) in fields {
            match value {
                Expr::Ident(_) | Expr::Member { .. } => {
                    self.wire_expr(value, node_id, key, def);
                }
                Expr::Number { value: n, lexeme } => {
                    let data_type = def.input(key).map_or(DataType::Any, |p| p.data_type);
                    let stored = self.literal_value(*n, lexeme, data_type);
                    if let Some(node) = self.graph.node_mut(node_id) {
                        node.params.insert(key.clone(), stored);
                    }
                }
                Expr::Str(s) => {
                    if let Some(node) = self.graph.node_mut(node_id) {
                        node.params.insert(key.clone(), ParamValue::Text(s.clone()));
                    }
                }
                Expr::Call { callee, args } => {
                    self.decomposed_constructor(node_id, key, callee, args);
                }
                _ => {}
            }
        }
    }

    /// Constructor sub-expressions inside named parameters decompose into
    /// structured keys: component-suffixed for vectors, a single hex string
    /// for colors.
    fn decomposed_constructor(&mut self, node_id: NodeId, key: &str, callee: &str, args: &[Expr]) {
        let Some(inner) = self.registry.resolve(callee) else {
            return;
        };
        if inner.kind == "color" {
            if let Some(Expr::Number { value, lexeme }) = args.first() {
                let css = hex_to_css(lexeme)
                    .unwrap_or_else(|| format!("#{:06x}", (*value as u32) & 0xff_ffff));
                if let Some(node) = self.graph.node_mut(node_id) {
                    node.params.insert(key.to_string(), ParamValue::Text(css));
                }
            }
        } else if inner.kind.starts_with("vec") {
            for (component, arg) in ["x", "y", "z", "w"].iter().zip(args) {
                if let Expr::Number { value, .. } = arg {
                    if let Some(node) = self.graph.node_mut(node_id) {
                        node.params
                            .insert(format!("{key}_{component}"), ParamValue::Number(*value));
                    }
                }
            }
        }
    }

    fn literal_value(&self, value: f64, lexeme: &str, data_type: DataType) -> ParamValue {
        match (hex_to_css(lexeme), data_type) {
            (Some(css), DataType::Color) => ParamValue::Text(css),
            _ => ParamValue::Number(value),
        }
    }

    /// Wire an identifier (or channel member) expression into an input port
    fn wire_expr(&mut self, expr: &Expr, to_node: NodeId, to_port: &str, def: &OpDef) {
        let (ident, from_port) = match expr {
            Expr::Ident(name) => (name.as_str(), "out".to_string()),
            Expr::Member { object, field } => match object.as_ref() {
                Expr::Ident(name) => (name.as_str(), field.clone()),
                _ => return,
            },
            _ => return,
        };
        let Some(from_node) = self.env.get(ident).copied() else {
            return;
        };
        // Stamp the producing output's type, matching what `Graph::connect` does.
        let data_type = self
            .graph
            .node(from_node)
            .and_then(|n| self.registry.get(&n.op_kind))
            .and_then(|d| d.output(&from_port))
            .map(|p| p.data_type)
            .unwrap_or_else(|| def.input(to_port).map_or(DataType::Any, |p| p.data_type));
        self.graph
            .insert_edge(Edge::new(from_node, from_port, to_node, to_port, data_type));
    }

    fn make_terminal(&mut self) -> NodeId {
        let mut node = Node::new(OUTPUT_KIND, "Output");
        node.exposed_ports = DEFAULT_EXPOSED_PORTS.iter().map(|p| (*p).to_string()).collect();
        let id = self.graph.add_node(node);
        self.terminal = Some(id);
        id
    }

    fn return_stmt(&mut self, expr: &Expr) {
        let terminal = self.make_terminal();
        let Some(output_def) = self.registry.get(OUTPUT_KIND).cloned() else {
            return;
        };
        match expr {
            Expr::Ident(_) | Expr::Member { .. } => {
                self.wire_expr(expr, terminal, PRIMARY_CHANNEL, &output_def);
            }
            Expr::Object(fields) => {
                for (channel, value) in fields {
                    if !OUTPUT_CHANNELS.contains(&channel.as_str()) {
                        continue;
                    }
                    self.wire_expr(value, terminal, channel, &output_def);
                }
            }
            _ => {}
        }
        // Mirror wired channels into the terminal's exposed-port set.
        let wired: Vec<String> = self
            .graph
            .edges_into(terminal)
            .map(|e| e.to_port.clone())
            .collect();
        if let Some(node) = self.graph.node_mut(terminal) {
            node.exposed_ports.extend(wired);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodeshade_graph::registry::create_shading_registry;

    #[test]
    fn test_empty_text_is_empty_result() {
        let registry = create_shading_registry();
        for text in ["", "   \n\t  ", "// just a comment\n"] {
            let outcome = reconstruct(text, &registry);
            assert!(outcome.errors.is_empty());
            assert_eq!(outcome.graph.node_count(), 0);
        }
    }

    #[test]
    fn test_color_return_scenario() {
        let registry = create_shading_registry();
        let outcome = reconstruct("const c = color(0xff0000); return c;", &registry);
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.graph.node_count(), 2);

        let color = outcome.graph.nodes().find(|n| n.op_kind == "color").unwrap();
        assert_eq!(color.param("hex").and_then(ParamValue::as_text), Some("#ff0000"));

        let terminal = outcome.graph.terminal().unwrap();
        let edge = outcome.graph.edge_into_port(terminal.id, "color").unwrap();
        assert_eq!(edge.from_node, color.id);
        assert_eq!(edge.from_port, "out");
        assert_eq!(outcome.graph.edge_count(), 1);
    }

    #[test]
    fn test_edges_carry_source_output_type() {
        let registry = create_shading_registry();
        let text = "const a = color(0xff0000);\nconst b = color(0x0000ff);\nconst sum = add(a, b);\nreturn sum;";
        let outcome = reconstruct(text, &registry);
        assert!(outcome.errors.is_empty());

        // Edges into `add`'s Any-typed inputs keep the producing output's type,
        // the same stamp `Graph::connect` would apply.
        let add = outcome.graph.nodes().find(|n| n.op_kind == "add").unwrap();
        for port in ["a", "b"] {
            let edge = outcome.graph.edge_into_port(add.id, port).unwrap();
            assert_eq!(edge.data_type, DataType::Color);
        }
    }

    #[test]
    fn test_syntax_error_leaves_empty_graph() {
        let registry = create_shading_registry();
        let outcome = reconstruct("const = oops(", &registry);
        assert!(!outcome.errors.is_empty());
        assert_eq!(outcome.graph.node_count(), 0);
    }

    #[test]
    fn test_unresolvable_calls_skipped_silently() {
        let registry = create_shading_registry();
        let outcome = reconstruct("const x = frobnicate(1, 2); return x;", &registry);
        assert!(outcome.errors.is_empty());
        // Only the synthesized terminal remains; the skipped binding wires nothing.
        assert_eq!(outcome.graph.node_count(), 1);
        assert_eq!(outcome.graph.edge_count(), 0);
    }

    #[test]
    fn test_terminal_synthesized_without_return() {
        let registry = create_shading_registry();
        let outcome = reconstruct("const p = positionLocal;", &registry);
        assert_eq!(outcome.graph.node_count(), 2);
        assert!(outcome.graph.terminal().is_some());
    }

    #[test]
    fn test_first_return_wins() {
        let registry = create_shading_registry();
        let text = "const a = color(0xff0000); const b = color(0x00ff00);\nreturn a; return b;";
        let outcome = reconstruct(text, &registry);
        let terminal = outcome.graph.terminal().unwrap();
        let edge = outcome.graph.edge_into_port(terminal.id, "color").unwrap();
        let a = outcome.graph.nodes().find(|n| n.op_kind == "color").unwrap();
        assert_eq!(edge.from_node, a.id);
        assert_eq!(outcome.graph.nodes().filter(|n| n.op_kind == OUTPUT_KIND).count(), 1);
    }

    #[test]
    fn test_chained_method_form() {
        let registry = create_shading_registry();
        let text = "const t = time; const s = t.mul(2); return s;";
        let outcome = reconstruct(text, &registry);
        let mul = outcome.graph.nodes().find(|n| n.op_kind == "multiply").unwrap();
        let time = outcome.graph.nodes().find(|n| n.op_kind == "time").unwrap();
        let a = outcome.graph.edge_into_port(mul.id, "a").unwrap();
        assert_eq!(a.from_node, time.id);
        assert_eq!(mul.number_param("b", 0.0), 2.0);
    }

    #[test]
    fn test_scaled_noise_round_form() {
        let registry = create_shading_registry();
        let text = "const p = positionLocal; const n = mx_noise_float(p.mul(4)); return n;";
        let outcome = reconstruct(text, &registry);
        let noise = outcome.graph.nodes().find(|n| n.op_kind == "noise").unwrap();
        assert_eq!(noise.number_param("scale", 0.0), 4.0);
        assert!(outcome.graph.edge_into_port(noise.id, "position").is_some());
    }

    #[test]
    fn test_named_parameters_call() {
        let registry = create_shading_registry();
        let text = "const p = positionLocal;\n\
                    const m = mix({ a: color(0xff0000), b: p, t: 0.25 });\nreturn m;";
        let outcome = reconstruct(text, &registry);
        let mix = outcome.graph.nodes().find(|n| n.op_kind == "mix").unwrap();
        assert_eq!(mix.param("a").and_then(ParamValue::as_text), Some("#ff0000"));
        assert_eq!(mix.number_param("t", 0.0), 0.25);
        assert!(outcome.graph.edge_into_port(mix.id, "b").is_some());
    }

    #[test]
    fn test_vector_constructor_decomposes() {
        let registry = create_shading_registry();
        let text = "const m = mix({ a: vec2(1, 2) }); return m;";
        let outcome = reconstruct(text, &registry);
        let mix = outcome.graph.nodes().find(|n| n.op_kind == "mix").unwrap();
        assert_eq!(mix.number_param("a_x", 0.0), 1.0);
        assert_eq!(mix.number_param("a_y", 0.0), 2.0);
    }

    #[test]
    fn test_property_label_from_binding_name() {
        let registry = create_shading_registry();
        let outcome = reconstruct("const speed = uniform(1.5); return speed;", &registry);
        let prop = outcome.graph.nodes().find(|n| n.op_kind == PROPERTY_KIND).unwrap();
        assert_eq!(prop.name, "speed");
        assert_eq!(prop.number_param("value", 0.0), 1.5);
    }

    #[test]
    fn test_object_return_wires_channels() {
        let registry = create_shading_registry();
        let text = "const c = color(0x123456); const r = float(0.3);\n\
                    return { color: c, roughness: r };";
        let outcome = reconstruct(text, &registry);
        let terminal = outcome.graph.terminal().unwrap();
        assert!(outcome.graph.edge_into_port(terminal.id, "color").is_some());
        assert!(outcome.graph.edge_into_port(terminal.id, "roughness").is_some());
        assert!(terminal.exposed_ports.contains("roughness"));
    }
}
