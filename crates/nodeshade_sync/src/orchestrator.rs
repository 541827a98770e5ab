// SPDX-License-Identifier: MIT OR Apache-2.0
//! The authoritative-direction state machine between graph and text.
//!
//! Exactly one writer touches the graph at a time. Graph mutations
//! regenerate the program text synchronously before the next mutation is
//! accepted; text edits reach the graph only through a debounced parse and
//! merge, and never re-enter the graph-mutation path while applying. The
//! regenerated text is remembered as `last_applied_text` so a self-generated
//! program echoed back by the editor does not trigger a redundant parse.

use crate::history::{History, HistoryError};
use nodeshade_compiler::{generate, merge, reconstruct, SyntaxError};
use nodeshade_graph::{Graph, GraphError, OpRegistry};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Delay between the last text keystroke and the parse attempt
pub const TEXT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Which representation is currently the edit origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthoritativeSource {
    /// No edits yet
    #[default]
    Initial,
    /// Graph-side edits drive the text
    Graph,
    /// Text-side edits drive the graph
    Text,
}

/// Where the engine is in a sync cycle.
///
/// `Applying` and `Replaying` both exclude new mutations; `Replaying`
/// additionally keeps the restoration itself off the history stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    /// No sync cycle in flight
    #[default]
    Idle,
    /// A parsed text edit or direct graph mutation is being applied
    Applying,
    /// An undo/redo snapshot is being restored
    Replaying,
}

/// Sync errors
#[derive(Debug, Error)]
pub enum SyncError {
    /// A mutation arrived while another was being applied
    #[error("A sync cycle is already in progress")]
    Busy,

    /// Graph mutation rejected by the data model
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// History error
    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Owns the live graph, the canonical program text, and the history stack.
pub struct SyncEngine {
    graph: Graph,
    registry: OpRegistry,
    authoritative: AuthoritativeSource,
    phase: SyncPhase,
    text: String,
    last_applied_text: String,
    pending_text: Option<String>,
    debounce_deadline: Option<Instant>,
    history: History,
    errors: Vec<SyntaxError>,
}

impl SyncEngine {
    /// Create an engine over an empty graph
    pub fn new(registry: OpRegistry) -> Self {
        Self::with_graph(registry, Graph::new())
    }

    /// Create an engine over a loaded graph, generating its canonical text.
    pub fn with_graph(registry: OpRegistry, graph: Graph) -> Self {
        let text = generate(&graph, &registry).text;
        Self {
            graph,
            registry,
            authoritative: AuthoritativeSource::Initial,
            phase: SyncPhase::Idle,
            last_applied_text: text.clone(),
            text,
            pending_text: None,
            debounce_deadline: None,
            history: History::new(),
            errors: Vec::new(),
        }
    }

    /// The live graph
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The injected operation catalog
    pub fn registry(&self) -> &OpRegistry {
        &self.registry
    }

    /// The canonical program text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Syntax errors from the most recent parse attempt
    pub fn errors(&self) -> &[SyntaxError] {
        &self.errors
    }

    /// Which representation drove the most recent edit
    pub fn authoritative(&self) -> AuthoritativeSource {
        self.authoritative
    }

    /// Current phase of the sync cycle
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// The undo/redo stack
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Apply a graph-side mutation through the closure, then regenerate the
    /// program text before returning. The pre-mutation state is pushed onto
    /// history first.
    pub fn mutate_graph<R>(
        &mut self,
        description: &str,
        f: impl FnOnce(&mut Graph, &OpRegistry) -> Result<R, GraphError>,
    ) -> Result<R, SyncError> {
        if self.phase != SyncPhase::Idle {
            return Err(SyncError::Busy);
        }
        self.history.record(description, &self.graph)?;

        self.phase = SyncPhase::Applying;
        self.authoritative = AuthoritativeSource::Graph;
        let result = f(&mut self.graph, &self.registry);
        self.regenerate();
        self.phase = SyncPhase::Idle;

        Ok(result?)
    }

    /// Record an edited program text and arm the debounce timer.
    ///
    /// The parse does not run until [`tick`](Self::tick) observes the
    /// deadline or [`sync_now`](Self::sync_now) forces it.
    pub fn edit_text(&mut self, text: impl Into<String>, now: Instant) {
        if self.phase != SyncPhase::Idle {
            return;
        }
        self.authoritative = AuthoritativeSource::Text;
        let text = text.into();
        self.text = text.clone();
        self.pending_text = Some(text);
        self.debounce_deadline = Some(now + TEXT_DEBOUNCE);
    }

    /// Drive the debounce timer. Returns true when a pending text edit was
    /// applied to the graph on this tick.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.debounce_deadline {
            Some(deadline) if now >= deadline => {
                self.debounce_deadline = None;
                self.apply_pending_text()
            }
            _ => false,
        }
    }

    /// Force the pending text edit through immediately, bypassing the
    /// debounce. Returns true when the graph changed.
    pub fn sync_now(&mut self) -> bool {
        self.debounce_deadline = None;
        self.apply_pending_text()
    }

    /// Parse and merge the pending text, if any.
    ///
    /// Text identical to the last applied program is self-generated and
    /// skipped. Parse errors leave the graph untouched and are surfaced via
    /// [`errors`](Self::errors). The merge runs under the `Applying` phase so
    /// it cannot re-enter the graph-mutation path and regenerate text.
    fn apply_pending_text(&mut self) -> bool {
        let Some(text) = self.pending_text.take() else {
            return false;
        };
        if text == self.last_applied_text {
            tracing::debug!("Skipping self-generated program text");
            return false;
        }

        let outcome = reconstruct(&text, &self.registry);
        if !outcome.errors.is_empty() {
            tracing::debug!(count = outcome.errors.len(), "Program text has syntax errors");
            self.errors = outcome.errors;
            return false;
        }
        if outcome.graph.node_count() == 0 {
            self.errors.clear();
            return false;
        }

        if self.history.record("Edit program", &self.graph).is_err() {
            return false;
        }
        self.phase = SyncPhase::Applying;
        self.graph = merge(&outcome.graph, &self.graph);
        self.last_applied_text = text;
        self.errors.clear();
        self.phase = SyncPhase::Idle;
        true
    }

    /// Restore the previous history snapshot. The restoration itself is a
    /// replay and is not pushed back onto history; the graph becomes
    /// authoritative and its text is regenerated.
    pub fn undo(&mut self) -> Result<(), SyncError> {
        if self.phase != SyncPhase::Idle {
            return Err(SyncError::Busy);
        }
        self.phase = SyncPhase::Replaying;
        let result = self.history.undo(&self.graph);
        let restored = match result {
            Ok(graph) => graph,
            Err(e) => {
                self.phase = SyncPhase::Idle;
                return Err(e.into());
            }
        };
        self.graph = restored;
        self.authoritative = AuthoritativeSource::Graph;
        self.pending_text = None;
        self.debounce_deadline = None;
        self.regenerate();
        self.phase = SyncPhase::Idle;
        Ok(())
    }

    /// Re-apply the most recently undone snapshot.
    pub fn redo(&mut self) -> Result<(), SyncError> {
        if self.phase != SyncPhase::Idle {
            return Err(SyncError::Busy);
        }
        self.phase = SyncPhase::Replaying;
        let result = self.history.redo(&self.graph);
        let restored = match result {
            Ok(graph) => graph,
            Err(e) => {
                self.phase = SyncPhase::Idle;
                return Err(e.into());
            }
        };
        self.graph = restored;
        self.authoritative = AuthoritativeSource::Graph;
        self.pending_text = None;
        self.debounce_deadline = None;
        self.regenerate();
        self.phase = SyncPhase::Idle;
        Ok(())
    }

    fn regenerate(&mut self) {
        let program = generate(&self.graph, &self.registry);
        self.text = program.text.clone();
        self.last_applied_text = program.text;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodeshade_graph::registry::create_shading_registry;
    use nodeshade_graph::Node;

    fn engine() -> SyncEngine {
        SyncEngine::new(create_shading_registry())
    }

    #[test]
    fn test_graph_mutation_regenerates_text() {
        let mut engine = engine();
        engine
            .mutate_graph("Add noise", |graph, _| {
                graph.add_node(Node::new("noise", "Noise"));
                Ok(())
            })
            .unwrap();
        assert!(engine.text().contains("mx_noise_float"));
        assert_eq!(engine.authoritative(), AuthoritativeSource::Graph);
    }

    #[test]
    fn test_text_edit_waits_for_debounce() {
        let mut engine = engine();
        let start = Instant::now();
        engine.edit_text("const c = color(0xff0000);\nreturn c;", start);
        assert!(!engine.tick(start + Duration::from_millis(100)));
        assert_eq!(engine.graph().node_count(), 0);
        assert!(engine.tick(start + TEXT_DEBOUNCE));
        assert_eq!(engine.graph().node_count(), 2);
    }

    #[test]
    fn test_self_generated_text_is_skipped() {
        let mut engine = engine();
        engine
            .mutate_graph("Add color", |graph, _| {
                graph.add_node(Node::new("color", "Color"));
                Ok(())
            })
            .unwrap();
        let canonical = engine.text().to_string();
        let node_ids: Vec<_> = engine.graph().node_ids().collect();

        engine.edit_text(canonical, Instant::now());
        assert!(!engine.sync_now());
        assert_eq!(engine.graph().node_ids().collect::<Vec<_>>(), node_ids);
    }

    #[test]
    fn test_syntax_errors_leave_graph_untouched() {
        let mut engine = engine();
        engine
            .mutate_graph("Add color", |graph, _| {
                graph.add_node(Node::new("color", "Color"));
                Ok(())
            })
            .unwrap();

        engine.edit_text("const c = color(0xff0000", Instant::now());
        assert!(!engine.sync_now());
        assert_eq!(engine.graph().node_count(), 1);
        assert!(!engine.errors().is_empty());

        // A later good edit clears the surfaced errors.
        engine.edit_text("const n = mx_noise_float();\nreturn n;", Instant::now());
        assert!(engine.sync_now());
        assert!(engine.errors().is_empty());
    }

    #[test]
    fn test_undo_restores_graph_and_text() {
        let mut engine = engine();
        engine
            .mutate_graph("Add noise", |graph, _| {
                graph.add_node(Node::new("noise", "Noise"));
                Ok(())
            })
            .unwrap();
        assert_eq!(engine.graph().node_count(), 1);

        engine.undo().unwrap();
        assert_eq!(engine.graph().node_count(), 0);
        assert!(!engine.text().contains("mx_noise_float"));

        engine.redo().unwrap();
        assert_eq!(engine.graph().node_count(), 1);
        assert!(engine.text().contains("mx_noise_float"));
    }

    #[test]
    fn test_text_edit_applies_through_merge() {
        let mut engine = engine();
        engine
            .mutate_graph("Add noise", |graph, _| {
                graph.add_node(Node::new("noise", "Noise").with_position(40.0, 8.0));
                Ok(())
            })
            .unwrap();
        let original_id = engine.graph().node_ids().next().expect("one node");

        let edited = format!("{}\n// tweaked\n", engine.text());
        engine.edit_text(edited, Instant::now());
        assert!(engine.sync_now());

        // The noise node survives the round trip with its identity.
        let node = engine.graph().node(original_id).expect("node kept its id");
        assert_eq!(node.op_kind, "noise");
        assert_eq!(node.position, [40.0, 8.0]);
    }

    #[test]
    fn test_failed_parse_is_undoable_noop() {
        let mut engine = engine();
        engine.edit_text("not a ( program", Instant::now());
        engine.sync_now();
        assert!(matches!(engine.undo(), Err(SyncError::History(_))));
    }
}
