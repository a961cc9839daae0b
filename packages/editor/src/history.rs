//! # History Manager
//!
//! Reducer-based undo/redo over whole-document snapshots. Snapshots are
//! cheap: a [`Document`] is a persistent value, so an entry costs one
//! handle, not a copy (the same trick as snapshot-store undo in immutable
//! UI runtimes).
//!
//! ## Design
//!
//! - The undo stack always holds the **current** state as its top entry,
//!   seeded at session start; undo therefore needs at least two entries
//!   (current + previous).
//! - Every accepted mutation pushes a new entry, evicts the oldest past
//!   capacity, and clears the redo stack.
//! - Rapid edits to the same logical field (keystrokes) coalesce into one
//!   entry while they stay inside the coalescing window; only the final
//!   value survives. Structural edits never coalesce.
//! - Save bookkeeping actions update auxiliary state (save state, dirty
//!   count) without ever entering history.
//! - Undo/redo on an exhausted stack is a safe no-op, not an error.

use std::collections::VecDeque;

use appdom::{Document, NodeId};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Bounded undo depth; oldest entries are evicted first.
pub const HISTORY_CAPACITY: usize = 100;

/// Edits to the same field within this window collapse into one undo step.
pub const COALESCE_WINDOW_MS: u64 = 500;

pub type Selection = Option<NodeId>;

/// One snapshot retained for undo/redo.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub document: Document,
    pub selection: Selection,
    pub timestamp: u64,
}

/// Persistence state of the session.
///
/// `Clean ⇄ Dirty` on every accepted mutation; `Dirty → Saving → Clean` on
/// a successful save round-trip; `Saving → Dirty` on failure, so a retry
/// can occur. Undo/redo never pass through `Saving`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveState {
    Clean,
    Dirty,
    Saving,
}

/// Identifies a logical edit session for coalescing: consecutive updates
/// carrying an equal key collapse into one history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoalesceKey {
    pub node: NodeId,
    pub field: String,
}

impl CoalesceKey {
    pub fn new(node: NodeId, field: impl Into<String>) -> Self {
        Self {
            node,
            field: field.into(),
        }
    }
}

/// Discrete inputs to the history state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum EditorAction {
    /// An accepted document mutation.
    Update {
        document: Document,
        selection: Selection,
        coalesce: Option<CoalesceKey>,
    },
    /// Selection change; auxiliary, never undoable.
    Select(Selection),
    Undo,
    Redo,
    /// End the current coalescing window so the next edit starts a new
    /// undo step (called before undo, or on blur).
    FlushCoalescing,
    /// Save bookkeeping; bypasses history entirely.
    SaveRequested,
    SaveCompleted {
        revision: u64,
    },
    SaveFailed(String),
}

/// Full editor state threaded through the reducer.
#[derive(Debug, Clone)]
pub struct EditorState {
    pub document: Document,
    pub selection: Selection,
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    pub save_state: SaveState,
    /// Mutations accepted since the last completed save.
    pub dirty_count: u64,
    /// Last persistence error, surfaced for display.
    pub last_error: Option<String>,
    coalesce: Option<(CoalesceKey, u64)>,
}

impl EditorState {
    pub fn new(document: Document) -> Self {
        let mut undo_stack = VecDeque::new();
        undo_stack.push_back(HistoryEntry {
            document: document.clone(),
            selection: None,
            timestamp: 0,
        });
        Self {
            document,
            selection: None,
            undo_stack,
            redo_stack: Vec::new(),
            save_state: SaveState::Clean,
            dirty_count: 0,
            last_error: None,
            coalesce: None,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() >= 2
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Pure state transition. `now_ms` comes from the caller's clock so
    /// coalescing is testable under virtual time.
    pub fn reduce(mut self, action: EditorAction, now_ms: u64) -> EditorState {
        match action {
            EditorAction::Update {
                document,
                selection,
                coalesce,
            } => {
                let entry = HistoryEntry {
                    document: document.clone(),
                    selection: selection.clone(),
                    timestamp: now_ms,
                };

                let coalesced = match (&coalesce, &self.coalesce) {
                    (Some(key), Some((active, since)))
                        if key == active && now_ms.saturating_sub(*since) <= COALESCE_WINDOW_MS =>
                    {
                        true
                    }
                    _ => false,
                };
                if coalesced {
                    // Same logical edit: only the final value survives.
                    if let Some(top) = self.undo_stack.back_mut() {
                        *top = entry;
                    }
                } else {
                    self.undo_stack.push_back(entry);
                    while self.undo_stack.len() > HISTORY_CAPACITY {
                        self.undo_stack.pop_front();
                    }
                }
                self.coalesce = coalesce.map(|key| (key, now_ms));
                self.redo_stack.clear();

                self.document = document;
                self.selection = selection;
                self.dirty_count += 1;
                if self.save_state == SaveState::Clean {
                    self.save_state = SaveState::Dirty;
                }
                self
            }

            EditorAction::Select(selection) => {
                self.selection = selection;
                self
            }

            EditorAction::Undo => {
                if !self.can_undo() {
                    return self;
                }
                self.coalesce = None;
                if let Some(current) = self.undo_stack.pop_back() {
                    self.redo_stack.push(current);
                }
                if let Some(previous) = self.undo_stack.back() {
                    debug!(depth = self.undo_stack.len(), "undo");
                    self.document = previous.document.clone();
                    self.selection = previous.selection.clone();
                }
                self.dirty_count += 1;
                if self.save_state == SaveState::Clean {
                    self.save_state = SaveState::Dirty;
                }
                self
            }

            EditorAction::Redo => {
                let Some(entry) = self.redo_stack.pop() else {
                    return self;
                };
                debug!(depth = self.redo_stack.len(), "redo");
                self.document = entry.document.clone();
                self.selection = entry.selection.clone();
                self.undo_stack.push_back(entry);
                while self.undo_stack.len() > HISTORY_CAPACITY {
                    self.undo_stack.pop_front();
                }
                self.dirty_count += 1;
                if self.save_state == SaveState::Clean {
                    self.save_state = SaveState::Dirty;
                }
                self
            }

            EditorAction::FlushCoalescing => {
                self.coalesce = None;
                self
            }

            EditorAction::SaveRequested => {
                debug!(revision = self.document.revision(), "save requested");
                self.save_state = SaveState::Saving;
                self.last_error = None;
                self
            }

            EditorAction::SaveCompleted { revision } => {
                if revision == self.document.revision() {
                    self.save_state = SaveState::Clean;
                    self.dirty_count = 0;
                } else {
                    // Edits arrived while the save was in flight.
                    self.save_state = SaveState::Dirty;
                }
                self
            }

            EditorAction::SaveFailed(message) => {
                debug!(error = %message, "save failed");
                self.save_state = SaveState::Dirty;
                self.last_error = Some(message);
                self
            }
        }
    }
}
