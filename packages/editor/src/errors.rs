//! Error types for the editor shell.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("document error: {0}")]
    Dom(#[from] appdom::DomError),

    /// Surfaced by the persistence collaborator. The session stays dirty
    /// so the caller can retry without losing edits.
    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("no document loaded for app {0:?}")]
    AppNotFound(String),
}
