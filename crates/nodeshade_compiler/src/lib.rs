// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bidirectional compiler between shading node graphs and program text.
//!
//! The forward direction ([`codegen`]) turns a graph into a deterministic
//! textual shading program; the reverse direction ([`reconstruct`] plus
//! [`merge`]) parses edited text back into a graph while preserving the
//! identity of matching live nodes. [`eval`] gives CPU-side preview values
//! and [`cost`] keeps the terminal's cost estimate current.

pub mod codegen;
pub mod cost;
pub mod eval;
pub mod lexer;
pub mod literal;
pub mod merge;
pub mod noise;
pub mod parser;
pub mod reconstruct;

pub use codegen::{generate, GeneratedProgram, EMPTY_PROGRAM};
pub use cost::{apply_cost, total_cost, COST_PARAM};
pub use eval::{evaluate, EvalContext};
pub use lexer::SyntaxError;
pub use merge::merge;
pub use reconstruct::{reconstruct, ParseOutcome};
