// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sync orchestration for `NodeShade`.
//!
//! Ties the graph model and the compiler together into an editing session:
//! the [`orchestrator`] arbitrates which representation is authoritative and
//! applies edits exactly once, [`history`] provides snapshot undo/redo,
//! [`preview`] drives per-frame evaluation for registered consumers, and
//! [`persist`] writes the document to durable storage on a debounce.

pub mod history;
pub mod orchestrator;
pub mod persist;
pub mod preview;

pub use history::{History, HistoryError};
pub use orchestrator::{AuthoritativeSource, SyncEngine, SyncError, SyncPhase, TEXT_DEBOUNCE};
pub use persist::{PersistError, PersistQueue, SAVE_DEBOUNCE};
pub use preview::PreviewHub;
