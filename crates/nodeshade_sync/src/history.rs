// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history over whole-graph snapshots.
//!
//! Each entry captures the serialized graph state before a mutation. Undo
//! swaps the current state onto the redo stack and restores the captured
//! one, so text edits, merges, and direct graph mutations all revert through
//! the same path.

use nodeshade_graph::Graph;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

/// Maximum undo history depth
const MAX_HISTORY: usize = 100;

/// History errors
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Nothing to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Nothing to redo
    #[error("Nothing to redo")]
    NothingToRedo,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Serialized graph state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Serialized graph bytes
    data: Vec<u8>,
    /// Size in bytes
    size: usize,
}

impl GraphSnapshot {
    /// Capture the current graph state
    pub fn capture(graph: &Graph) -> Result<Self> {
        let data = bincode::serialize(graph)?;
        let size = data.len();
        Ok(Self { data, size })
    }

    /// Deserialize back into a graph
    pub fn restore(&self) -> Result<Graph> {
        Ok(bincode::deserialize(&self.data)?)
    }
}

/// One undoable step
#[derive(Debug, Clone)]
struct HistoryEntry {
    /// Human-readable description
    description: String,
    /// Graph state before the mutation this entry records
    snapshot: GraphSnapshot,
}

/// Undo/redo history manager
#[derive(Debug)]
pub struct History {
    /// Undo stack
    undo_stack: VecDeque<HistoryEntry>,
    /// Redo stack
    redo_stack: VecDeque<HistoryEntry>,
    /// Maximum history depth
    max_depth: usize,
    /// Total memory used by snapshots
    memory_used: usize,
}

impl History {
    /// Create a new history manager
    pub fn new() -> Self {
        Self::with_max_depth(MAX_HISTORY)
    }

    /// Create with custom maximum depth
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_depth,
            memory_used: 0,
        }
    }

    /// Record the pre-mutation state of the graph. Clears the redo stack,
    /// since a new edit forks away from any undone states.
    pub fn record(&mut self, description: &str, graph: &Graph) -> Result<()> {
        let entry = HistoryEntry {
            description: description.to_string(),
            snapshot: GraphSnapshot::capture(graph)?,
        };

        self.redo_stack.clear();
        self.memory_used += entry.snapshot.size;
        self.undo_stack.push_back(entry);

        // Enforce history limit
        while self.undo_stack.len() > self.max_depth {
            if let Some(old) = self.undo_stack.pop_front() {
                self.memory_used = self.memory_used.saturating_sub(old.snapshot.size);
            }
        }

        Ok(())
    }

    /// Undo the last mutation, returning the graph to restore.
    ///
    /// `current` is captured onto the redo stack first.
    pub fn undo(&mut self, current: &Graph) -> Result<Graph> {
        let entry = self
            .undo_stack
            .pop_back()
            .ok_or(HistoryError::NothingToUndo)?;
        self.memory_used = self.memory_used.saturating_sub(entry.snapshot.size);

        let restored = entry.snapshot.restore()?;
        let redo_entry = HistoryEntry {
            description: entry.description,
            snapshot: GraphSnapshot::capture(current)?,
        };
        self.memory_used += redo_entry.snapshot.size;
        self.redo_stack.push_back(redo_entry);

        Ok(restored)
    }

    /// Redo the last undone mutation, returning the graph to restore.
    pub fn redo(&mut self, current: &Graph) -> Result<Graph> {
        let entry = self
            .redo_stack
            .pop_back()
            .ok_or(HistoryError::NothingToRedo)?;
        self.memory_used = self.memory_used.saturating_sub(entry.snapshot.size);

        let restored = entry.snapshot.restore()?;
        let undo_entry = HistoryEntry {
            description: entry.description,
            snapshot: GraphSnapshot::capture(current)?,
        };
        self.memory_used += undo_entry.snapshot.size;
        self.undo_stack.push_back(undo_entry);

        Ok(restored)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get undo stack depth
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get description of next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|e| e.description.as_str())
    }

    /// Get description of next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|e| e.description.as_str())
    }

    /// Total snapshot bytes currently held
    pub fn memory_used(&self) -> usize {
        self.memory_used
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.memory_used = 0;
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodeshade_graph::Node;

    fn graph_with(count: usize) -> Graph {
        let mut graph = Graph::new();
        for i in 0..count {
            graph.add_node(Node::new("float", format!("Value {i}")));
        }
        graph
    }

    #[test]
    fn test_undo_restores_prior_state() {
        let mut history = History::new();
        let before = graph_with(1);
        let after = graph_with(2);

        history.record("Add node", &before).unwrap();
        let restored = history.undo(&after).unwrap();
        assert_eq!(restored.node_count(), 1);
        assert!(history.can_redo());

        let redone = history.redo(&restored).unwrap();
        assert_eq!(redone.node_count(), 2);
        assert!(history.can_undo());
    }

    #[test]
    fn test_new_record_clears_redo() {
        let mut history = History::new();
        history.record("First", &graph_with(1)).unwrap();
        let _ = history.undo(&graph_with(2)).unwrap();
        assert!(history.can_redo());

        history.record("Second", &graph_with(3)).unwrap();
        assert!(!history.can_redo());
        assert_eq!(history.undo_description(), Some("Second"));
    }

    #[test]
    fn test_depth_limit_drops_oldest() {
        let mut history = History::with_max_depth(3);
        for i in 0..5 {
            history.record(&format!("Edit {i}"), &graph_with(i)).unwrap();
        }
        assert_eq!(history.undo_depth(), 3);
        assert_eq!(history.undo_description(), Some("Edit 4"));
    }

    #[test]
    fn test_empty_stacks_error() {
        let mut history = History::new();
        let graph = Graph::new();
        assert!(matches!(history.undo(&graph), Err(HistoryError::NothingToUndo)));
        assert!(matches!(history.redo(&graph), Err(HistoryError::NothingToRedo)));
    }
}
