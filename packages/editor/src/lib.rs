//! Editing sessions over `appdom` documents: bounded undo/redo with
//! keystroke coalescing, debounced autosave against a pluggable store, and
//! selection tracking, all driven by an injected clock.
//!
//! The pieces compose bottom-up:
//!
//! - [`EditorState`] is a pure reducer over whole-document snapshots.
//! - [`AutosaveScheduler`] turns mutation timestamps into save deadlines.
//! - [`EditSession`] wires both to a [`DocumentStore`] and a [`Clock`].

pub mod autosave;
pub mod errors;
pub mod history;
pub mod session;
pub mod store;

pub use autosave::{AutosaveScheduler, Clock, ManualClock, SystemClock, AUTOSAVE_DELAY_MS};
pub use errors::EditorError;
pub use history::{
    CoalesceKey, EditorAction, EditorState, HistoryEntry, SaveState, Selection,
    COALESCE_WINDOW_MS, HISTORY_CAPACITY,
};
pub use session::EditSession;
pub use store::{DocumentStore, MemoryStore};
