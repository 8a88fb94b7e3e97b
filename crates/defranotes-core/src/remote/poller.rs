//! Timer-driven polling loops standing in for push subscriptions.
//!
//! The store's real-time channel is not assumed available, so a [`Poller`]
//! repeatedly issues the same query and delivers each result to a callback.
//! The single open note polls faster than the note list: list changes are
//! lower-frequency and more expensive to re-render.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::task::AbortHandle;
use tracing::warn;

use crate::error::NotesError;
use crate::remote::client::DefraClient;
use crate::remote::RemoteStore;
use crate::types::Note;

/// Poll interval for the single open note
pub const NOTE_POLL_INTERVAL: Duration = Duration::from_millis(1000);
/// Poll interval for the note list
pub const LIST_POLL_INTERVAL: Duration = Duration::from_millis(2000);

type Registry = Mutex<HashMap<u64, PollEntry>>;

struct PollEntry {
    cancelled: Arc<AtomicBool>,
    abort: AbortHandle,
}

/// Handle for one active polling loop.
///
/// Cancellation is idempotent and stops all future deliveries. A request
/// already in flight is not aborted; its result is discarded.
pub struct PollHandle {
    id: u64,
    cancelled: Arc<AtomicBool>,
    abort: AbortHandle,
    registry: Weak<Registry>,
}

impl PollHandle {
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        self.abort.abort();
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().remove(&self.id);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Runs polling pseudo-subscriptions against a [`RemoteStore`].
///
/// Holds a registry of active polls keyed by a locally generated identifier;
/// [`Poller::disconnect`] cancels them all.
pub struct Poller {
    store: Arc<dyn RemoteStore>,
    next_id: AtomicU64,
    registry: Arc<Registry>,
}

impl Poller {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            next_id: AtomicU64::new(0),
            registry: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of polls currently registered
    pub fn active_polls(&self) -> usize {
        self.registry.lock().len()
    }

    /// Issue one request immediately, then repeat at `interval` until the
    /// returned handle is cancelled.
    ///
    /// Each successful result goes to `on_result`; each failed attempt goes
    /// to `on_error` and does NOT stop the loop — a single bad poll must not
    /// terminate the subscription-equivalent.
    pub fn start_polling(
        &self,
        query: impl Into<String>,
        variables: Value,
        on_result: impl Fn(Value) + Send + Sync + 'static,
        on_error: impl Fn(NotesError) + Send + Sync + 'static,
        interval: Duration,
    ) -> PollHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let cancelled = Arc::new(AtomicBool::new(false));

        let store = Arc::clone(&self.store);
        let flag = Arc::clone(&cancelled);
        let query = query.into();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if flag.load(Ordering::SeqCst) {
                    break;
                }
                let outcome = store.execute(&query, variables.clone()).await;
                // Cancelled mid-flight: drop the result instead of delivering
                if flag.load(Ordering::SeqCst) {
                    break;
                }
                match outcome {
                    Ok(data) => on_result(data),
                    Err(err) => {
                        warn!(%err, "poll attempt failed");
                        on_error(err);
                    }
                }
            }
        });

        let abort = task.abort_handle();
        self.registry.lock().insert(
            id,
            PollEntry {
                cancelled: Arc::clone(&cancelled),
                abort: abort.clone(),
            },
        );

        PollHandle {
            id,
            cancelled,
            abort,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Pseudo-subscription to one note at a 1-second interval.
    ///
    /// Empty results are filtered out (the store answers an empty list while
    /// a freshly created document is still propagating).
    pub fn subscribe_to_note(
        &self,
        doc_id: &str,
        on_data: impl Fn(Note) + Send + Sync + 'static,
        on_error: impl Fn(NotesError) + Send + Sync + 'static,
    ) -> PollHandle {
        let query = "query GetNote($docID: ID!) { Note(docID: $docID) { \
                     _docID title content workspace createdAt updatedAt authorId \
                     _version { cid height } } }";
        self.start_polling(
            query,
            json!({ "docID": doc_id }),
            move |data| match DefraClient::decode_notes(&data, "Note") {
                Ok(notes) => {
                    if let Some(note) = notes.into_iter().next() {
                        on_data(note);
                    }
                }
                Err(err) => warn!(%err, "ignoring undecodable note poll result"),
            },
            on_error,
            NOTE_POLL_INTERVAL,
        )
    }

    /// Pseudo-subscription to the full note list at a 2-second interval
    pub fn subscribe_to_note_list(
        &self,
        on_data: impl Fn(Vec<Note>) + Send + Sync + 'static,
        on_error: impl Fn(NotesError) + Send + Sync + 'static,
    ) -> PollHandle {
        let query = "query { Note { \
                     _docID title content workspace createdAt updatedAt authorId } }";
        self.start_polling(
            query,
            json!({}),
            move |data| match DefraClient::decode_notes(&data, "Note") {
                Ok(notes) => on_data(notes),
                Err(err) => warn!(%err, "ignoring undecodable note list poll result"),
            },
            on_error,
            LIST_POLL_INTERVAL,
        )
    }

    /// Cancel every registered poll
    pub fn disconnect(&self) {
        let mut registry = self.registry.lock();
        for (_, entry) in registry.drain() {
            entry.cancelled.store(true, Ordering::SeqCst);
            entry.abort.abort();
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.disconnect();
    }
}
