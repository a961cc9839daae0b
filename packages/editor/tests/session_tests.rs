//! End-to-end session scenarios under virtual time: history round-trips,
//! keystroke coalescing, and the debounced autosave loop against an
//! in-memory store.

use appdom::{BindableValue, Document, NodeInit, NodeType};
use appdom_editor::{
    CoalesceKey, EditSession, ManualClock, MemoryStore, SaveState, AUTOSAVE_DELAY_MS,
    COALESCE_WINDOW_MS,
};

fn session() -> (EditSession<MemoryStore, ManualClock>, ManualClock) {
    let clock = ManualClock::new();
    let session = EditSession::new("app-1", Document::new(), MemoryStore::new(), clock.clone());
    (session, clock)
}

fn add_page(session: &mut EditSession<MemoryStore, ManualClock>, page_name: &str) {
    session
        .edit(None, |doc| {
            let app_id = doc.root().clone();
            let page = doc.create_node(
                NodeType::Page,
                NodeInit {
                    name: Some(page_name.into()),
                    ..Default::default()
                },
            );
            doc.add_node(page, &app_id, "pages", None)
        })
        .unwrap();
}

#[test]
fn mutations_undo_back_to_the_loaded_document() {
    let (mut session, clock) = session();
    let initial = session.document().clone();

    for page_name in ["Home", "About", "Contact"] {
        add_page(&mut session, page_name);
        clock.advance(10_000);
    }
    assert_eq!(session.document().children(session.document().root(), "pages").len(), 3);

    for _ in 0..3 {
        session.undo();
    }
    assert_eq!(*session.document(), initial);

    // Exhausted stacks are safe no-ops.
    session.undo();
    assert_eq!(*session.document(), initial);
}

#[test]
fn redo_after_undo_restores_the_exact_value() {
    let (mut session, clock) = session();
    add_page(&mut session, "Home");
    clock.advance(10_000);
    add_page(&mut session, "About");
    let full = session.document().clone();

    session.undo();
    session.undo();
    session.redo();
    session.redo();
    assert_eq!(*session.document(), full);
}

#[test]
fn keystroke_bursts_are_one_undo_step() {
    let (mut session, clock) = session();
    add_page(&mut session, "Home");
    clock.advance(10_000);
    let page_id = session.document().get_node_id_by_name("Home").unwrap();
    let key = CoalesceKey::new(page_id.clone(), "props.title");

    for title in ["H", "He", "Hel", "Hell", "Hello"] {
        session
            .edit(Some(key.clone()), |doc| {
                doc.set_node_prop(&page_id, "title", Some(BindableValue::constant(title)))
            })
            .unwrap();
        clock.advance(100);
    }
    assert_eq!(
        session
            .document()
            .get_node(&page_id)
            .unwrap()
            .props
            .get("title"),
        Some(&BindableValue::constant("Hello"))
    );

    // One undo removes the whole burst, not one keystroke.
    session.undo();
    assert!(session
        .document()
        .get_node(&page_id)
        .unwrap()
        .props
        .get("title")
        .is_none());
}

#[test]
fn a_pause_past_the_window_starts_a_new_undo_step() {
    let (mut session, clock) = session();
    add_page(&mut session, "Home");
    clock.advance(10_000);
    let page_id = session.document().get_node_id_by_name("Home").unwrap();
    let key = CoalesceKey::new(page_id.clone(), "props.title");

    for title in ["Draft", "Final"] {
        session
            .edit(Some(key.clone()), |doc| {
                doc.set_node_prop(&page_id, "title", Some(BindableValue::constant(title)))
            })
            .unwrap();
        clock.advance(COALESCE_WINDOW_MS + 1);
    }

    session.undo();
    assert_eq!(
        session
            .document()
            .get_node(&page_id)
            .unwrap()
            .props
            .get("title"),
        Some(&BindableValue::constant("Draft"))
    );
}

#[test]
fn a_burst_of_edits_produces_a_single_save() {
    let (mut session, clock) = session();
    for page_name in ["Home", "About", "Contact"] {
        add_page(&mut session, page_name);
        clock.advance(200);
        assert!(!session.tick(), "debounce still pending");
    }

    clock.advance(AUTOSAVE_DELAY_MS);
    assert!(session.tick());
    assert_eq!(session.store().save_count(), 1);
    assert_eq!(session.state().save_state, SaveState::Clean);
    assert_eq!(
        session.store().saved("app-1").unwrap().nodes(),
        session.document().nodes()
    );

    // Idle ticks save nothing further.
    clock.advance(10 * AUTOSAVE_DELAY_MS);
    assert!(!session.tick());
    assert_eq!(session.store().save_count(), 1);
}

#[test]
fn undoing_back_to_the_persisted_value_skips_the_save() {
    let (mut session, clock) = session();
    add_page(&mut session, "Home");
    clock.advance(AUTOSAVE_DELAY_MS);
    assert!(session.tick());
    assert_eq!(session.store().save_count(), 1);

    add_page(&mut session, "About");
    session.undo();
    clock.advance(AUTOSAVE_DELAY_MS);
    assert!(!session.tick(), "revision already persisted");
    assert_eq!(session.store().save_count(), 1);
}

#[test]
fn a_failed_save_stays_dirty_and_retries() {
    let (mut session, clock) = session();
    add_page(&mut session, "Home");
    session.store_mut().fail_next_save = Some("disk full".into());

    clock.advance(AUTOSAVE_DELAY_MS);
    assert!(session.tick());
    assert_eq!(session.state().save_state, SaveState::Dirty);
    assert_eq!(
        session.state().last_error.as_deref(),
        Some("persistence error: disk full")
    );
    assert!(session.store().saved("app-1").is_none());

    // The next tick retries without requiring a new mutation.
    assert!(session.tick());
    assert_eq!(session.state().save_state, SaveState::Clean);
    assert!(session.store().saved("app-1").is_some());
}

#[test]
fn open_loads_from_the_store_and_starts_clean() -> anyhow::Result<()> {
    let clock = ManualClock::new();
    let seed = {
        let mut s = EditSession::new("app-1", Document::new(), MemoryStore::new(), clock.clone());
        add_page(&mut s, "Home");
        clock.advance(AUTOSAVE_DELAY_MS);
        assert!(s.tick());
        s.into_store()
    };

    let mut session = EditSession::open("app-1", seed, clock.clone())?;
    assert_eq!(session.state().save_state, SaveState::Clean);
    assert!(session.document().get_node_id_by_name("Home").is_some());

    // A freshly opened, untouched session never re-saves.
    clock.advance(10 * AUTOSAVE_DELAY_MS);
    assert!(!session.tick());
    Ok(())
}
