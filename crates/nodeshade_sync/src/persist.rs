// SPDX-License-Identifier: MIT OR Apache-2.0
//! Debounced persistence of the graph document.
//!
//! Saves run a short debounce after any mutation so rapid edits coalesce
//! into one write. Loading always runs the forward migration, so documents
//! written by older versions come up with current view tags and a complete
//! exposed-port list on the terminal.

use nodeshade_graph::migrate::{self, PersistedGraph};
use nodeshade_graph::{Graph, OpRegistry};
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Delay between the last mutation and the durable write
pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(500);

/// Persistence errors
#[derive(Debug, Error)]
pub enum PersistError {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document (de)serialization error
    #[error("Document error: {0}")]
    Document(#[from] serde_json::Error),
}

/// Coalesces mutations into debounced save requests.
///
/// Callers mark the document dirty on every change and poll
/// [`take_due`](Self::take_due) from their tick loop; a save is due once no
/// new mutation has arrived for [`SAVE_DEBOUNCE`].
#[derive(Debug, Default)]
pub struct PersistQueue {
    deadline: Option<Instant>,
}

impl PersistQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mutation, restarting the debounce window.
    pub fn mark_dirty(&mut self, now: Instant) {
        self.deadline = Some(now + SAVE_DEBOUNCE);
    }

    /// Whether a save will happen once the window elapses
    pub fn is_dirty(&self) -> bool {
        self.deadline.is_some()
    }

    /// Consume the pending save request if its window has elapsed.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Drop any pending save, e.g. on teardown after an explicit save.
    pub fn clear(&mut self) {
        self.deadline = None;
    }
}

/// Serialize the graph into the persisted document form.
pub fn to_document_string(registry: &OpRegistry, graph: &Graph) -> Result<String, PersistError> {
    let doc = migrate::from_graph(registry, graph);
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Deserialize a persisted document, migrating it forward first.
pub fn from_document_string(registry: &OpRegistry, content: &str) -> Result<Graph, PersistError> {
    let mut doc: PersistedGraph = serde_json::from_str(content)?;
    migrate::migrate(registry, &mut doc);
    Ok(migrate::into_graph(doc))
}

/// Write the graph document to `path`.
pub fn save(registry: &OpRegistry, graph: &Graph, path: &Path) -> Result<(), PersistError> {
    let content = to_document_string(registry, graph)?;
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), nodes = graph.node_count(), "Saved graph document");
    Ok(())
}

/// Load and migrate the graph document at `path`.
pub fn load(registry: &OpRegistry, path: &Path) -> Result<Graph, PersistError> {
    let content = std::fs::read_to_string(path)?;
    let graph = from_document_string(registry, &content)?;
    tracing::info!(path = %path.display(), nodes = graph.node_count(), "Loaded graph document");
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodeshade_graph::registry::create_shading_registry;
    use nodeshade_graph::Node;

    #[test]
    fn test_queue_coalesces_marks() {
        let mut queue = PersistQueue::new();
        let start = Instant::now();
        assert!(!queue.take_due(start));

        queue.mark_dirty(start);
        queue.mark_dirty(start + Duration::from_millis(300));
        // First window would have elapsed, but the second mark restarted it.
        assert!(!queue.take_due(start + SAVE_DEBOUNCE));
        assert!(queue.take_due(start + Duration::from_millis(300) + SAVE_DEBOUNCE));
        assert!(!queue.is_dirty());
    }

    #[test]
    fn test_document_round_trip() {
        let registry = create_shading_registry();
        let mut graph = Graph::new();
        let n = graph.add_node(Node::new("noise", "Noise").with_param("scale", 4.0));
        let out = graph.add_node(Node::new("output", "Output"));
        graph.connect(&registry, n, "out", out, "color").unwrap();

        let content = to_document_string(&registry, &graph).unwrap();
        let loaded = from_document_string(&registry, &content).unwrap();
        assert_eq!(loaded, graph);
    }

    #[test]
    fn test_load_migrates_deprecated_tags() {
        let registry = create_shading_registry();
        let content = r#"{
            "version": 1,
            "nodes": [
                {
                    "id": "7e0f1fae-35ee-47a7-a797-0a87a245ad2b",
                    "op_kind": "output",
                    "view_tag": "outputNode",
                    "name": "Output",
                    "position": [0.0, 0.0],
                    "params": {}
                }
            ],
            "edges": []
        }"#;
        let graph = from_document_string(&registry, content).unwrap();
        let terminal = graph.terminal().expect("terminal survives");
        // Backfilled exposed ports contain the default set.
        assert!(terminal.exposed_ports.contains("color"));
        assert!(terminal.exposed_ports.contains("roughness"));
    }
}
