// SPDX-License-Identifier: MIT OR Apache-2.0
//! Code generation: turn an ordered graph into program text plus grouped
//! import declarations.
//!
//! Output is fully deterministic: nodes are emitted in topological order,
//! variable names are assigned by a stable collision policy, and imports are
//! grouped per module with sorted names. Identical graphs always produce
//! byte-identical text.

use crate::literal::{channel_index, css_to_hex, format_number};
use crate::literal::sanitize_ident;
use nodeshade_graph::registry::{
    OpCategory, OpRegistry, CORE_MODULE, OUTPUT_CHANNELS, OUTPUT_KIND, PRIMARY_CHANNEL,
    PROPERTY_KIND, WRAPPER_BINDING,
};
use nodeshade_graph::{topological_order, Graph, Node, NodeId, ParamValue};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Program emitted when the graph has no nodes
pub const EMPTY_PROGRAM: &str = "// Empty graph: add nodes to build a program.\n";

/// A generated program: text plus its import groups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedProgram {
    /// Full program text
    pub text: String,
    /// Imported binding names, grouped by source module
    pub imports: BTreeMap<String, BTreeSet<String>>,
}

/// Variable base name for a binding: library namespace prefix stripped,
/// uniformizing family suffix trimmed.
fn base_var_name(binding: &str) -> String {
    let stripped = binding.strip_prefix("mx_").unwrap_or(binding);
    for suffix in ["_float", "_vec2", "_vec3", "_vec4", "Local"] {
        if let Some(root) = stripped.strip_suffix(suffix) {
            if !root.is_empty() {
                return root.to_string();
            }
        }
    }
    stripped.to_string()
}

/// Generate program text for a graph.
///
/// Operation kinds absent from the registry produce no statement and no
/// import; they are skipped silently.
pub fn generate(graph: &Graph, registry: &OpRegistry) -> GeneratedProgram {
    if graph.node_count() == 0 {
        return GeneratedProgram {
            text: EMPTY_PROGRAM.to_string(),
            imports: BTreeMap::new(),
        };
    }

    let schedule = topological_order(graph);
    tracing::debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        dropped = schedule.dropped,
        "generating program"
    );

    // Import groups, the wrapper binding unconditionally included.
    let mut imports: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    imports
        .entry(CORE_MODULE.to_string())
        .or_default()
        .insert(WRAPPER_BINDING.to_string());
    for id in &schedule.order {
        let node = match graph.node(*id) {
            Some(n) if n.op_kind != OUTPUT_KIND => n,
            _ => continue,
        };
        if let Some(def) = registry.get(&node.op_kind) {
            imports
                .entry(def.module.clone())
                .or_default()
                .insert(def.binding.clone());
        } else {
            tracing::debug!(kind = %node.op_kind, "skipping unresolvable kind");
        }
    }

    // Assign variable names. Imported bindings are reserved so a statement
    // never shadows the name it references.
    let mut used: HashSet<String> = imports.values().flatten().cloned().collect();
    let mut names: HashMap<NodeId, String> = HashMap::new();
    for id in &schedule.order {
        let node = match graph.node(*id) {
            Some(n) if n.op_kind != OUTPUT_KIND => n,
            _ => continue,
        };
        let Some(def) = registry.get(&node.op_kind) else {
            continue;
        };
        let base = if node.op_kind == PROPERTY_KIND {
            sanitize_ident(&node.name)
        } else {
            base_var_name(&def.binding)
        };
        let mut candidate = base.clone();
        let mut counter = 1;
        while used.contains(&candidate) {
            candidate = format!("{base}{counter}");
            counter += 1;
        }
        used.insert(candidate.clone());
        names.insert(*id, candidate);
    }

    // One statement per node, in schedule order.
    let mut statements = Vec::new();
    for id in &schedule.order {
        let node = match graph.node(*id) {
            Some(n) if n.op_kind != OUTPUT_KIND => n,
            _ => continue,
        };
        let Some(def) = registry.get(&node.op_kind) else {
            continue;
        };
        let var = &names[id];

        let rhs = if def.is_pure_reference() {
            def.binding.clone()
        } else if def.is_constructor() {
            let (key, fallback) = def
                .defaults
                .first()
                .map(|(k, v)| (k.as_str(), v))
                .unwrap_or(("value", &ParamValue::Number(0.0)));
            let value = node.param(key).unwrap_or(fallback);
            format!("{}({})", def.binding, literal_arg(value))
        } else if def.category == OpCategory::Procedural {
            procedural_call(graph, registry, node, def.binding.as_str(), &names)
        } else {
            let args: Vec<String> = def
                .inputs
                .iter()
                .map(|port| resolve_arg(graph, node, &port.id, &names))
                .collect();
            format!("{}({})", def.binding, args.join(", "))
        };
        statements.push(format!("const {var} = {rhs};"));
    }

    // Terminal channel resolution.
    let mut populated: Vec<(&str, String)> = Vec::new();
    if let Some(term) = graph.terminal() {
        for channel in OUTPUT_CHANNELS {
            let Some(edge) = graph.edge_into_port(term.id, channel) else {
                continue;
            };
            if let Some(expr) = producer_ref(&names, edge.from_node, &edge.from_port) {
                populated.push((channel, expr));
            }
        }
    }
    let return_stmt = match populated.as_slice() {
        [] => {
            // The fallback references a binding the main pass never saw.
            imports
                .entry(CORE_MODULE.to_string())
                .or_default()
                .insert("color".to_string());
            statements.push("// No output connected; emitting opaque black.".to_string());
            "return color(0x000000);".to_string()
        }
        [(channel, expr)] if *channel == PRIMARY_CHANNEL => format!("return {expr};"),
        entries => {
            let fields: Vec<String> = entries
                .iter()
                .map(|(channel, expr)| format!("{channel}: {expr}"))
                .collect();
            format!("return {{ {} }};", fields.join(", "))
        }
    };
    statements.push(return_stmt);

    // Assemble: import lines, blank line, wrapped function body.
    let mut text = String::new();
    for (module, bindings) in &imports {
        let list: Vec<&str> = bindings.iter().map(String::as_str).collect();
        text.push_str(&format!("import {{ {} }} from '{module}';\n", list.join(", ")));
    }
    text.push('\n');
    text.push_str("export const main = Fn(() => {\n");
    for stmt in &statements {
        text.push_str("  ");
        text.push_str(stmt);
        text.push('\n');
    }
    text.push_str("});\n");

    GeneratedProgram { text, imports }
}

/// Reference to a producer's value: its variable, plus a single-character
/// channel accessor when the edge taps a component-splitting output.
fn producer_ref(names: &HashMap<NodeId, String>, from_node: NodeId, from_port: &str) -> Option<String> {
    let var = names.get(&from_node)?;
    if from_port != "out" && from_port.len() == 1 && channel_index(from_port).is_some() {
        Some(format!("{var}.{from_port}"))
    } else {
        Some(var.clone())
    }
}

/// Resolve one call argument: the inbound edge's producer if connected,
/// otherwise the node's stored parameter value, defaulting to zero.
fn resolve_arg(graph: &Graph, node: &Node, port: &str, names: &HashMap<NodeId, String>) -> String {
    if let Some(edge) = graph.edge_into_port(node.id, port) {
        if let Some(expr) = producer_ref(names, edge.from_node, &edge.from_port) {
            return expr;
        }
    }
    match node.param(port) {
        Some(value) => literal_arg(value),
        None => "0".to_string(),
    }
}

fn literal_arg(value: &ParamValue) -> String {
    match value {
        ParamValue::Number(n) => format_number(*n),
        ParamValue::Text(s) => css_to_hex(s).unwrap_or_else(|| format!("'{s}'")),
    }
}

/// Emit a procedural (noise-family) call: the position argument is scaled by
/// the resolved scale sub-parameter before use; remaining sub-parameters
/// follow as plain arguments.
fn procedural_call(
    graph: &Graph,
    registry: &OpRegistry,
    node: &Node,
    binding: &str,
    names: &HashMap<NodeId, String>,
) -> String {
    let mut position = resolve_arg(graph, node, "position", names);
    let scale_connected = graph.edge_into_port(node.id, "scale").is_some();
    if scale_connected || node.param("scale").is_some() {
        let scale = resolve_arg(graph, node, "scale", names);
        position = format!("{position}.mul({scale})");
    }
    let mut args = vec![position];
    if let Some(def) = registry.get(&node.op_kind) {
        for port in &def.inputs {
            if port.id == "position" || port.id == "scale" {
                continue;
            }
            args.push(resolve_arg(graph, node, &port.id, names));
        }
    }
    format!("{binding}({})", args.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodeshade_graph::registry::create_shading_registry;

    fn line_pos(text: &str, needle: &str) -> usize {
        text.find(needle)
            .unwrap_or_else(|| panic!("missing {needle:?} in:\n{text}"))
    }

    #[test]
    fn test_empty_graph_is_placeholder() {
        let registry = create_shading_registry();
        let program = generate(&Graph::new(), &registry);
        assert_eq!(program.text, EMPTY_PROGRAM);
        assert!(program.imports.is_empty());
    }

    #[test]
    fn test_scenario_ordering_and_imports() {
        let registry = create_shading_registry();
        let mut graph = Graph::new();
        let pos = graph.add_node(Node::new("position", "Position"));
        let noise = graph.add_node(Node::new("noise", "Noise"));
        let ca = graph.add_node(Node::new("color", "Color").with_param("hex", "#ff0000"));
        let cb = graph.add_node(Node::new("color", "Color").with_param("hex", "#0000ff"));
        let mix = graph.add_node(Node::new("mix", "Mix"));
        let sink = graph.add_node(Node::new(OUTPUT_KIND, "Output"));
        graph.connect(&registry, pos, "out", noise, "position").unwrap();
        graph.connect(&registry, noise, "out", mix, "t").unwrap();
        graph.connect(&registry, ca, "out", mix, "a").unwrap();
        graph.connect(&registry, cb, "out", mix, "b").unwrap();
        graph.connect(&registry, mix, "out", sink, "color").unwrap();

        let program = generate(&graph, &registry);
        let text = &program.text;

        // Statement order follows dependencies.
        assert!(line_pos(text, "const position = positionLocal;") < line_pos(text, "mx_noise_float(position)"));
        assert!(line_pos(text, "mx_noise_float") < line_pos(text, "const mix1 = mix("));
        assert!(line_pos(text, "return mix1;") > line_pos(text, "const mix1"));

        // Import groups: exactly the modules the non-terminal kinds declare.
        assert_eq!(program.imports.len(), 2);
        let core = &program.imports["three/tsl"];
        assert!(core.contains("Fn") && core.contains("positionLocal") && core.contains("mix") && core.contains("color"));
        assert!(program.imports["three/addons/materialx"].contains("mx_noise_float"));
    }

    #[test]
    fn test_identical_graphs_identical_text() {
        let registry = create_shading_registry();
        let build = || {
            let mut graph = Graph::new();
            let a = graph.add_node(Node::new("float", "Float").with_param("value", 2.0));
            let b = graph.add_node(Node::new("float", "Float").with_param("value", 3.0));
            let add = graph.add_node(Node::new("add", "Add"));
            let sink = graph.add_node(Node::new(OUTPUT_KIND, "Output"));
            graph.connect(&registry, a, "out", add, "a").unwrap();
            graph.connect(&registry, b, "out", add, "b").unwrap();
            graph.connect(&registry, add, "out", sink, "color").unwrap();
            graph
        };
        assert_eq!(generate(&build(), &registry).text, generate(&build(), &registry).text);
    }

    #[test]
    fn test_collision_naming() {
        let registry = create_shading_registry();
        let mut graph = Graph::new();
        graph.add_node(Node::new("float", "Float"));
        graph.add_node(Node::new("float", "Float"));
        graph.add_node(Node::new(OUTPUT_KIND, "Output"));
        let text = generate(&graph, &registry).text;
        // "float" itself is reserved by the import.
        assert!(text.contains("const float1 = float(0);"));
        assert!(text.contains("const float2 = float(0);"));
    }

    #[test]
    fn test_property_names_from_label() {
        let registry = create_shading_registry();
        let mut graph = Graph::new();
        graph.add_node(Node::new("property", "Wave Speed").with_param("value", 1.5));
        graph.add_node(Node::new(OUTPUT_KIND, "Output"));
        let text = generate(&graph, &registry).text;
        assert!(text.contains("const Wave_Speed = uniform(1.5);"));
    }

    #[test]
    fn test_default_return_forces_color_import() {
        let registry = create_shading_registry();
        let mut graph = Graph::new();
        graph.add_node(Node::new("float", "Float"));
        graph.add_node(Node::new(OUTPUT_KIND, "Output"));
        let program = generate(&graph, &registry);
        assert!(program.text.contains("return color(0x000000);"));
        assert!(program.imports["three/tsl"].contains("color"));
    }

    #[test]
    fn test_multi_channel_object_return() {
        let registry = create_shading_registry();
        let mut graph = Graph::new();
        let c = graph.add_node(Node::new("color", "Color"));
        let f = graph.add_node(Node::new("float", "Float").with_param("value", 0.3));
        let sink = graph.add_node(Node::new(OUTPUT_KIND, "Output"));
        graph.connect(&registry, c, "out", sink, "color").unwrap();
        graph.connect(&registry, f, "out", sink, "roughness").unwrap();
        let text = generate(&graph, &registry).text;
        assert!(text.contains("return { color: color1, roughness: float1 };"));
    }

    #[test]
    fn test_split_channel_accessor() {
        let registry = create_shading_registry();
        let mut graph = Graph::new();
        let pos = graph.add_node(Node::new("position", "Position"));
        let split = graph.add_node(Node::new("split", "Split"));
        let sine = graph.add_node(Node::new("sin", "Sine"));
        let sink = graph.add_node(Node::new(OUTPUT_KIND, "Output"));
        graph.connect(&registry, pos, "out", split, "value").unwrap();
        graph.connect(&registry, split, "y", sine, "value").unwrap();
        graph.connect(&registry, sine, "out", sink, "roughness").unwrap();
        let text = generate(&graph, &registry).text;
        assert!(text.contains("const sin1 = sin(split1.y);"));
    }

    #[test]
    fn test_procedural_scale_multiplication() {
        let registry = create_shading_registry();
        let mut graph = Graph::new();
        let pos = graph.add_node(Node::new("position", "Position"));
        let noise = graph.add_node(Node::new("noise", "Noise").with_param("scale", 4.0));
        let sink = graph.add_node(Node::new(OUTPUT_KIND, "Output"));
        graph.connect(&registry, pos, "out", noise, "position").unwrap();
        graph.connect(&registry, noise, "out", sink, "roughness").unwrap();
        let text = generate(&graph, &registry).text;
        assert!(text.contains("mx_noise_float(position.mul(4))"));
    }
}
