//! Persistence boundary.
//!
//! The core never performs I/O itself; the application shell provides a
//! [`DocumentStore`] and drives the autosave scheduler. Documents cross
//! this boundary in the JSON wire shape (`{ nodes, root, version }`).

use std::collections::HashMap;

use appdom::Document;

use crate::errors::EditorError;

/// Load/save contract with the (external) persistence backend.
pub trait DocumentStore {
    fn load(&mut self, app_id: &str) -> Result<Document, EditorError>;
    fn save(&mut self, app_id: &str, doc: &Document) -> Result<(), EditorError>;
}

/// In-memory store for tests and temporary sessions.
#[derive(Default)]
pub struct MemoryStore {
    saved: HashMap<String, Document>,
    save_count: u64,
    /// When set, the next save fails once with this message.
    pub fail_next_save: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self, app_id: &str) -> Option<&Document> {
        self.saved.get(app_id)
    }

    pub fn save_count(&self) -> u64 {
        self.save_count
    }
}

impl DocumentStore for MemoryStore {
    fn load(&mut self, app_id: &str) -> Result<Document, EditorError> {
        self.saved
            .get(app_id)
            .cloned()
            .ok_or_else(|| EditorError::AppNotFound(app_id.to_string()))
    }

    fn save(&mut self, app_id: &str, doc: &Document) -> Result<(), EditorError> {
        if let Some(message) = self.fail_next_save.take() {
            return Err(EditorError::Persistence(message));
        }
        self.save_count += 1;
        self.saved.insert(app_id.to_string(), doc.clone());
        Ok(())
    }
}
