// SPDX-License-Identifier: MIT OR Apache-2.0
//! Operation registry: the typed, read-only catalog of operation kinds.
//!
//! The registry is injected into the compiler and parser; it describes each
//! operation's ports, stored defaults, and its binding in generated program
//! text (name + source module).

use crate::node::ParamValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Operation kind of the terminal (sink) node
pub const OUTPUT_KIND: &str = "output";
/// Operation kind of named user properties (uniforms)
pub const PROPERTY_KIND: &str = "property";
/// Operation kind of the time source
pub const TIME_KIND: &str = "time";

/// Module that hosts the core bindings, including the function wrapper
pub const CORE_MODULE: &str = "three/tsl";
/// Module that hosts the procedural noise bindings
pub const MATX_MODULE: &str = "three/addons/materialx";
/// Binding of the shader-function wrapper, always imported
pub const WRAPPER_BINDING: &str = "Fn";

/// Terminal output channels, in emission order. `color` is primary.
pub const OUTPUT_CHANNELS: [&str; 6] =
    ["color", "emissive", "roughness", "metalness", "normal", "position"];
/// The primary terminal channel
pub const PRIMARY_CHANNEL: &str = "color";

/// Data type that can flow through ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    /// Scalar
    Float,
    /// 2D vector
    Vec2,
    /// 3D vector
    Vec3,
    /// 4D vector
    Vec4,
    /// RGB color
    Color,
    /// Any type (generic math nodes)
    Any,
}

impl DataType {
    /// Check whether a value of this type may feed a port of `other`
    pub fn can_connect_to(self, other: DataType) -> bool {
        if self == other || matches!(self, Self::Any) || matches!(other, Self::Any) {
            return true;
        }
        match (self, other) {
            // Scalars broadcast into any wider type.
            (Self::Float, Self::Vec2 | Self::Vec3 | Self::Vec4 | Self::Color) => true,
            // Vectors extend or truncate into each other.
            (Self::Vec2 | Self::Vec3 | Self::Vec4, Self::Vec2 | Self::Vec3 | Self::Vec4) => true,
            (Self::Color, Self::Vec3 | Self::Vec4) | (Self::Vec3 | Self::Vec4, Self::Color) => {
                true
            }
            _ => false,
        }
    }
}

/// Operation category, used for palette grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpCategory {
    /// Geometry/time sources
    Source,
    /// Constant values
    Value,
    /// Scalar math
    Math,
    /// Vector operations
    Vector,
    /// Procedural patterns
    Procedural,
    /// Named user properties
    Property,
    /// Terminal output
    Output,
}

/// A named, typed connection point on an operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortSpec {
    /// Port key, stable across versions
    pub id: String,
    /// Display label
    pub label: String,
    /// Data type
    pub data_type: DataType,
}

impl PortSpec {
    /// Create a port spec
    pub fn new(id: impl Into<String>, label: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            data_type,
        }
    }
}

/// Definition of one operation kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpDef {
    /// Unique kind identifier
    pub kind: String,
    /// Display name
    pub name: String,
    /// Category
    pub category: OpCategory,
    /// Name this operation binds to in generated program text
    pub binding: String,
    /// Module the binding is imported from
    pub module: String,
    /// Ordered input ports
    pub inputs: Vec<PortSpec>,
    /// Ordered output ports
    pub outputs: Vec<PortSpec>,
    /// Default parameter values, in positional-argument order
    pub defaults: IndexMap<String, ParamValue>,
    /// Whether the operation may appear in method-chained form in text
    pub chainable: bool,
}

impl OpDef {
    /// Look up an input port by key
    pub fn input(&self, id: &str) -> Option<&PortSpec> {
        self.inputs.iter().find(|p| p.id == id)
    }

    /// Look up an output port by key
    pub fn output(&self, id: &str) -> Option<&PortSpec> {
        self.outputs.iter().find(|p| p.id == id)
    }

    /// Whether this is a zero-input reference to a built-in value
    pub fn is_pure_reference(&self) -> bool {
        self.inputs.is_empty() && self.defaults.is_empty()
    }

    /// Whether this is a zero-input constructor carrying stored defaults
    pub fn is_constructor(&self) -> bool {
        self.inputs.is_empty() && !self.defaults.is_empty()
    }
}

/// Registry of available operation kinds
#[derive(Debug, Clone, Default)]
pub struct OpRegistry {
    defs: IndexMap<String, OpDef>,
    by_binding: HashMap<String, String>,
}

impl OpRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operation definition
    pub fn register(&mut self, def: OpDef) {
        self.by_binding.insert(def.binding.clone(), def.kind.clone());
        self.defs.insert(def.kind.clone(), def);
    }

    /// Get a definition by kind
    pub fn get(&self, kind: &str) -> Option<&OpDef> {
        self.defs.get(kind)
    }

    /// Reverse lookup by codegen binding name
    pub fn by_binding(&self, binding: &str) -> Option<&OpDef> {
        self.by_binding.get(binding).and_then(|k| self.defs.get(k))
    }

    /// Resolve a name from program text: binding first, raw kind as fallback
    pub fn resolve(&self, name: &str) -> Option<&OpDef> {
        self.by_binding(name).or_else(|| self.get(name))
    }

    /// All registered definitions
    pub fn defs(&self) -> impl Iterator<Item = &OpDef> {
        self.defs.values()
    }

    /// Definitions in a category
    pub fn defs_in_category(&self, category: OpCategory) -> impl Iterator<Item = &OpDef> {
        self.defs.values().filter(move |d| d.category == category)
    }
}

fn op(
    kind: &str,
    name: &str,
    category: OpCategory,
    binding: &str,
    module: &str,
    inputs: Vec<PortSpec>,
    outputs: Vec<PortSpec>,
) -> OpDef {
    OpDef {
        kind: kind.to_string(),
        name: name.to_string(),
        category,
        binding: binding.to_string(),
        module: module.to_string(),
        inputs,
        outputs,
        defaults: IndexMap::new(),
        chainable: false,
    }
}

fn chainable(mut def: OpDef) -> OpDef {
    def.chainable = true;
    def
}

fn with_defaults(mut def: OpDef, defaults: Vec<(&str, ParamValue)>) -> OpDef {
    def.defaults = defaults
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    def
}

/// Create the default shading operation catalog
pub fn create_shading_registry() -> OpRegistry {
    use DataType::{Any, Color, Float, Vec2, Vec3, Vec4};
    use OpCategory as Cat;

    let mut registry = OpRegistry::new();
    let out = |dt| vec![PortSpec::new("out", "Out", dt)];

    // ------------------------------------------------------------------
    // Sources
    // ------------------------------------------------------------------

    registry.register(op(
        "position",
        "Position",
        Cat::Source,
        "positionLocal",
        CORE_MODULE,
        vec![],
        out(Vec3),
    ));
    registry.register(op(
        "normal",
        "Normal",
        Cat::Source,
        "normalLocal",
        CORE_MODULE,
        vec![],
        out(Vec3),
    ));
    registry.register(op("uv", "UV", Cat::Source, "uv", CORE_MODULE, vec![], out(Vec2)));
    registry.register(op(
        TIME_KIND,
        "Time",
        Cat::Source,
        "time",
        CORE_MODULE,
        vec![],
        out(Float),
    ));

    // ------------------------------------------------------------------
    // Values
    // ------------------------------------------------------------------

    registry.register(with_defaults(
        op("float", "Float", Cat::Value, "float", CORE_MODULE, vec![], out(Float)),
        vec![("value", ParamValue::Number(0.0))],
    ));
    registry.register(with_defaults(
        op("color", "Color", Cat::Value, "color", CORE_MODULE, vec![], out(Color)),
        vec![("hex", ParamValue::Text("#ffffff".to_string()))],
    ));
    registry.register(op(
        "vec2",
        "Vector2",
        Cat::Value,
        "vec2",
        CORE_MODULE,
        vec![
            PortSpec::new("x", "X", Float),
            PortSpec::new("y", "Y", Float),
        ],
        out(Vec2),
    ));
    registry.register(op(
        "vec3",
        "Vector3",
        Cat::Value,
        "vec3",
        CORE_MODULE,
        vec![
            PortSpec::new("x", "X", Float),
            PortSpec::new("y", "Y", Float),
            PortSpec::new("z", "Z", Float),
        ],
        out(Vec3),
    ));
    registry.register(op(
        "vec4",
        "Vector4",
        Cat::Value,
        "vec4",
        CORE_MODULE,
        vec![
            PortSpec::new("x", "X", Float),
            PortSpec::new("y", "Y", Float),
            PortSpec::new("z", "Z", Float),
            PortSpec::new("w", "W", Float),
        ],
        out(Vec4),
    ));

    // ------------------------------------------------------------------
    // Math
    // ------------------------------------------------------------------

    let binary = |kind: &str, name: &str, binding: &str| {
        chainable(op(
            kind,
            name,
            Cat::Math,
            binding,
            CORE_MODULE,
            vec![PortSpec::new("a", "A", Any), PortSpec::new("b", "B", Any)],
            out(Any),
        ))
    };
    registry.register(binary("add", "Add", "add"));
    registry.register(binary("subtract", "Subtract", "sub"));
    registry.register(binary("multiply", "Multiply", "mul"));
    registry.register(binary("divide", "Divide", "div"));

    let unary = |kind: &str, name: &str, binding: &str| {
        chainable(op(
            kind,
            name,
            Cat::Math,
            binding,
            CORE_MODULE,
            vec![PortSpec::new("value", "Value", Any)],
            out(Any),
        ))
    };
    registry.register(unary("sin", "Sine", "sin"));
    registry.register(unary("cos", "Cosine", "cos"));
    registry.register(unary("abs", "Absolute", "abs"));
    registry.register(unary("floor", "Floor", "floor"));
    registry.register(unary("fract", "Fraction", "fract"));
    registry.register(unary("one_minus", "One Minus", "oneMinus"));

    registry.register(op(
        "mix",
        "Mix",
        Cat::Math,
        "mix",
        CORE_MODULE,
        vec![
            PortSpec::new("a", "A", Any),
            PortSpec::new("b", "B", Any),
            PortSpec::new("t", "Factor", Float),
        ],
        out(Any),
    ));
    registry.register(op(
        "smoothstep",
        "Smoothstep",
        Cat::Math,
        "smoothstep",
        CORE_MODULE,
        vec![
            PortSpec::new("low", "Low", Float),
            PortSpec::new("high", "High", Float),
            PortSpec::new("value", "Value", Any),
        ],
        out(Any),
    ));
    registry.register(op(
        "remap",
        "Remap",
        Cat::Math,
        "remap",
        CORE_MODULE,
        vec![
            PortSpec::new("value", "Value", Any),
            PortSpec::new("in_low", "In Low", Float),
            PortSpec::new("in_high", "In High", Float),
            PortSpec::new("out_low", "Out Low", Float),
            PortSpec::new("out_high", "Out High", Float),
        ],
        out(Any),
    ));
    registry.register(op(
        "select",
        "Select",
        Cat::Math,
        "select",
        CORE_MODULE,
        vec![
            PortSpec::new("cond", "Condition", Float),
            PortSpec::new("a", "A", Any),
            PortSpec::new("b", "B", Any),
        ],
        out(Any),
    ));

    // ------------------------------------------------------------------
    // Vector
    // ------------------------------------------------------------------

    registry.register(chainable(op(
        "length",
        "Length",
        Cat::Vector,
        "length",
        CORE_MODULE,
        vec![PortSpec::new("value", "Vector", Any)],
        out(Float),
    )));
    registry.register(op(
        "distance",
        "Distance",
        Cat::Vector,
        "distance",
        CORE_MODULE,
        vec![PortSpec::new("a", "A", Any), PortSpec::new("b", "B", Any)],
        out(Float),
    ));
    registry.register(op(
        "dot",
        "Dot Product",
        Cat::Vector,
        "dot",
        CORE_MODULE,
        vec![PortSpec::new("a", "A", Any), PortSpec::new("b", "B", Any)],
        out(Float),
    ));
    registry.register(op(
        "cross",
        "Cross Product",
        Cat::Vector,
        "cross",
        CORE_MODULE,
        vec![PortSpec::new("a", "A", Vec3), PortSpec::new("b", "B", Vec3)],
        out(Vec3),
    ));
    registry.register(chainable(op(
        "normalize",
        "Normalize",
        Cat::Vector,
        "normalize",
        CORE_MODULE,
        vec![PortSpec::new("value", "Vector", Any)],
        out(Any),
    )));
    registry.register(op(
        "split",
        "Split",
        Cat::Vector,
        "split",
        CORE_MODULE,
        vec![PortSpec::new("value", "Vector", Any)],
        vec![
            PortSpec::new("x", "X", Float),
            PortSpec::new("y", "Y", Float),
            PortSpec::new("z", "Z", Float),
            PortSpec::new("w", "W", Float),
        ],
    ));

    // ------------------------------------------------------------------
    // Procedural
    // ------------------------------------------------------------------

    registry.register(op(
        "noise",
        "Noise",
        Cat::Procedural,
        "mx_noise_float",
        MATX_MODULE,
        vec![
            PortSpec::new("position", "Position", Vec2),
            PortSpec::new("scale", "Scale", Float),
        ],
        out(Float),
    ));
    registry.register(op(
        "fbm",
        "Fractal Noise",
        Cat::Procedural,
        "mx_fractal_noise_float",
        MATX_MODULE,
        vec![
            PortSpec::new("position", "Position", Vec2),
            PortSpec::new("scale", "Scale", Float),
            PortSpec::new("octaves", "Octaves", Float),
        ],
        out(Float),
    ));
    registry.register(op(
        "voronoi",
        "Voronoi",
        Cat::Procedural,
        "mx_worley_noise_float",
        MATX_MODULE,
        vec![
            PortSpec::new("position", "Position", Vec2),
            PortSpec::new("scale", "Scale", Float),
        ],
        out(Float),
    ));

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    registry.register(with_defaults(
        op(
            PROPERTY_KIND,
            "Property",
            Cat::Property,
            "uniform",
            CORE_MODULE,
            vec![],
            out(Float),
        ),
        vec![("value", ParamValue::Number(0.0))],
    ));

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    registry.register(op(
        OUTPUT_KIND,
        "Output",
        Cat::Output,
        "output",
        CORE_MODULE,
        vec![
            PortSpec::new("color", "Color", Color),
            PortSpec::new("emissive", "Emissive", Color),
            PortSpec::new("roughness", "Roughness", Float),
            PortSpec::new("metalness", "Metalness", Float),
            PortSpec::new("normal", "Normal", Vec3),
            PortSpec::new("position", "Position", Vec3),
        ],
        vec![],
    ));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_reverse_lookup() {
        let registry = create_shading_registry();
        assert_eq!(registry.by_binding("mx_noise_float").map(|d| d.kind.as_str()), Some("noise"));
        assert_eq!(registry.by_binding("positionLocal").map(|d| d.kind.as_str()), Some("position"));
        assert!(registry.by_binding("nope").is_none());
    }

    #[test]
    fn test_resolve_falls_back_to_kind() {
        let registry = create_shading_registry();
        // "mix" is both binding and kind; "subtract" only resolves as a kind.
        assert_eq!(registry.resolve("sub").map(|d| d.kind.as_str()), Some("subtract"));
        assert_eq!(registry.resolve("subtract").map(|d| d.kind.as_str()), Some("subtract"));
    }

    #[test]
    fn test_structural_classification() {
        let registry = create_shading_registry();
        assert!(registry.get("position").is_some_and(OpDef::is_pure_reference));
        assert!(registry.get("color").is_some_and(OpDef::is_constructor));
        assert!(!registry.get("mix").is_some_and(OpDef::is_constructor));
    }

    #[test]
    fn test_type_compatibility() {
        assert!(DataType::Float.can_connect_to(DataType::Vec3));
        assert!(DataType::Color.can_connect_to(DataType::Vec3));
        assert!(DataType::Any.can_connect_to(DataType::Color));
        assert!(!DataType::Vec3.can_connect_to(DataType::Float));
    }
}
