//! A live editing session over one application document.
//!
//! [`EditSession`] owns the [`EditorState`] reducer, the autosave
//! scheduler, and a [`DocumentStore`], and wires them together: mutations
//! flow through the reducer and arm the debounce; [`EditSession::tick`]
//! drives saves when they come due. Both the store and the clock are
//! injected, so a whole session runs under virtual time in tests.

use appdom::{Document, DomError, NodeId};
use tracing::debug;

use crate::autosave::{AutosaveScheduler, Clock};
use crate::errors::EditorError;
use crate::history::{CoalesceKey, EditorAction, EditorState, Selection};
use crate::store::DocumentStore;

pub struct EditSession<S: DocumentStore, C: Clock> {
    app_id: String,
    state: EditorState,
    scheduler: AutosaveScheduler,
    store: S,
    clock: C,
}

impl<S: DocumentStore, C: Clock> EditSession<S, C> {
    /// Start a session over an already-loaded document. The document is
    /// treated as persisted, so an idle session never re-saves it.
    pub fn new(app_id: impl Into<String>, document: Document, store: S, clock: C) -> Self {
        let mut scheduler = AutosaveScheduler::default();
        scheduler.mark_persisted(document.revision());
        Self {
            app_id: app_id.into(),
            state: EditorState::new(document),
            scheduler,
            store,
            clock,
        }
    }

    /// Load the document from the store and open a session over it.
    pub fn open(app_id: impl Into<String>, mut store: S, clock: C) -> Result<Self, EditorError> {
        let app_id = app_id.into();
        let document = store.load(&app_id)?;
        Ok(Self::new(app_id, document, store, clock))
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn document(&self) -> &Document {
        &self.state.document
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Accept a new document value produced by a store operation. Pass a
    /// [`CoalesceKey`] for keystroke-grade edits so they collapse into one
    /// undo step.
    pub fn update(&mut self, document: Document, coalesce: Option<CoalesceKey>) {
        let now = self.clock.now_ms();
        let selection = self.state.selection.clone();
        self.dispatch(
            EditorAction::Update {
                document,
                selection,
                coalesce,
            },
            now,
        );
        self.scheduler.note_mutation(now);
    }

    /// Apply a fallible edit to the current document; on success the result
    /// enters history and arms autosave, on failure nothing changes.
    pub fn edit<F>(&mut self, coalesce: Option<CoalesceKey>, f: F) -> Result<(), EditorError>
    where
        F: FnOnce(&Document) -> Result<Document, DomError>,
    {
        let next = f(&self.state.document)?;
        self.update(next, coalesce);
        Ok(())
    }

    pub fn select(&mut self, selection: Selection) {
        let now = self.clock.now_ms();
        self.dispatch(EditorAction::Select(selection), now);
    }

    pub fn undo(&mut self) {
        let now = self.clock.now_ms();
        // End any open coalescing run first, so undo lands on the burst's
        // final value rather than extending it.
        self.dispatch(EditorAction::FlushCoalescing, now);
        if self.state.can_undo() {
            self.dispatch(EditorAction::Undo, now);
            self.scheduler.note_mutation(now);
        }
    }

    pub fn redo(&mut self) {
        let now = self.clock.now_ms();
        if self.state.can_redo() {
            self.dispatch(EditorAction::Redo, now);
            self.scheduler.note_mutation(now);
        }
    }

    pub fn selection(&self) -> &Option<NodeId> {
        &self.state.selection
    }

    /// Drive the autosave schedule. Performs at most one save per call;
    /// returns whether one ran.
    pub fn tick(&mut self) -> bool {
        let now = self.clock.now_ms();
        let revision = self.state.document.revision();
        let Some(due) = self.scheduler.poll(now, revision) else {
            return false;
        };
        debug!(app_id = %self.app_id, revision = due, "autosave");
        let document = self.state.document.clone();
        self.dispatch(EditorAction::SaveRequested, now);
        self.scheduler.save_started(due);
        match self.store.save(&self.app_id, &document) {
            Ok(()) => {
                self.scheduler.save_finished(due, true);
                self.dispatch(EditorAction::SaveCompleted { revision: due }, now);
            }
            Err(err) => {
                self.scheduler.save_finished(due, false);
                self.dispatch(EditorAction::SaveFailed(err.to_string()), now);
            }
        }
        true
    }

    fn dispatch(&mut self, action: EditorAction, now_ms: u64) {
        // Cloning the state is cheap: documents are persistent values and
        // history entries are handles.
        self.state = self.state.clone().reduce(action, now_ms);
    }
}
