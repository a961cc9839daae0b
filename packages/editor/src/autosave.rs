//! Debounced autosave scheduling.
//!
//! The scheduler is pure bookkeeping over millisecond timestamps: the
//! session feeds it mutation times and poll ticks, and it decides when a
//! save is due. Time comes from an injected [`Clock`] so the debounce is
//! testable without sleeping.
//!
//! Rules:
//!
//! - Trailing-edge debounce: every mutation pushes the deadline out by the
//!   full delay, so a burst of edits produces one save of the final value.
//! - A save fires only when the document revision differs from the last
//!   persisted one; an undo back to the persisted value saves nothing.
//! - While a save is in flight, further due saves are deferred and
//!   coalesce into the next round; a stale completion is disregarded.
//! - A failed save re-arms the deadline so the next poll retries.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

/// Debounce delay between the last mutation and the save it triggers.
pub const AUTOSAVE_DELAY_MS: u64 = 1_000;

/// Millisecond time source.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Wall-clock milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Hand-advanced clock for tests. Clones share the same instant.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Rc<Cell<u64>>);

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.0.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }
}

/// Decides when the document is due for persistence.
#[derive(Debug)]
pub struct AutosaveScheduler {
    delay_ms: u64,
    deadline: Option<u64>,
    persisted_revision: Option<u64>,
    in_flight: Option<u64>,
}

impl Default for AutosaveScheduler {
    fn default() -> Self {
        Self::new(AUTOSAVE_DELAY_MS)
    }
}

impl AutosaveScheduler {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            deadline: None,
            persisted_revision: None,
            in_flight: None,
        }
    }

    /// Mark the loaded (already persisted) revision so a fresh session does
    /// not immediately re-save an unchanged document.
    pub fn mark_persisted(&mut self, revision: u64) {
        self.persisted_revision = Some(revision);
    }

    /// An accepted mutation at `now_ms`: push the deadline out by the full
    /// delay (trailing edge).
    pub fn note_mutation(&mut self, now_ms: u64) {
        self.deadline = Some(now_ms + self.delay_ms);
    }

    /// Returns the revision to persist when a save is due, consuming the
    /// deadline. Returns `None` while the deadline has not elapsed, while a
    /// save is in flight, or when `revision` is already persisted.
    pub fn poll(&mut self, now_ms: u64, revision: u64) -> Option<u64> {
        if self.in_flight.is_some() {
            return None;
        }
        let deadline = self.deadline?;
        if now_ms < deadline {
            return None;
        }
        self.deadline = None;
        if self.persisted_revision == Some(revision) {
            debug!(revision, "autosave skipped, revision unchanged");
            return None;
        }
        Some(revision)
    }

    pub fn save_started(&mut self, revision: u64) {
        self.in_flight = Some(revision);
    }

    /// Record the outcome of a save. Results for a revision other than the
    /// one in flight are stale and disregarded.
    pub fn save_finished(&mut self, revision: u64, ok: bool) {
        if self.in_flight != Some(revision) {
            debug!(revision, "stale save result disregarded");
            return;
        }
        self.in_flight = None;
        if ok {
            self.persisted_revision = Some(revision);
        } else {
            // Re-arm immediately so the next poll retries. A mutation made
            // during the save already holds a later deadline; keep it.
            self.deadline.get_or_insert(0);
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn has_pending_deadline(&self) -> bool {
        self.deadline.is_some()
    }
}
