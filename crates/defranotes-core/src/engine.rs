//! Reconciliation engine - the primary entry point for DefraNotes.
//!
//! `NotesEngine` owns the authoritative in-memory view of the note list and
//! the currently open note, and arbitrates between three inputs: local edits
//! from the editor surface, remote polling results, and user-issued commands.
//! Everything else (transport, peer bridge, presentation) is stateless with
//! respect to notes.
//!
//! Background work (poll loops, debounce timers, save futures, peer state
//! changes) never mutates engine state directly; it posts an
//! [`EngineMessage`] that the owner drains through
//! [`NotesEngine::handle_message`], so all mutation interleaves on one
//! logical thread.
//!
//! # Merge policy
//!
//! For every polled result on the open note:
//! - while the user is mid-edit (either editing flag set) the result is
//!   ignored entirely - keystrokes are never overwritten mid-entry;
//! - otherwise the remote snapshot is applied only when its `updatedAt` is
//!   strictly newer than the last timestamp this engine accepted, so the
//!   echo of our own write never re-renders as an external change;
//! - the very first load of a note applies unconditionally.
//!
//! This is last-writer-wins at document granularity. A remote title change
//! can be shadowed by a concurrent unsaved local body edit and vice versa;
//! field-level merging is a known limitation, not attempted here.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::bridge::PeerBridgeAdapter;
use crate::error::{NotesError, NotesResult};
use crate::remote::{PollHandle, Poller, RemoteStore};
use crate::types::{
    now_timestamp, Commit, Note, NoteFields, NoteUpdate, PeerCommandResult, PeerConnectionState,
    SyncStatus,
};
use crate::user::UserIdentity;

/// Pause after the last edit signal before a save is issued
pub const DEBOUNCE_INTERVAL: Duration = Duration::from_millis(1000);

/// Default capacity for the UI event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Which editable field an edit signal or debounce firing refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Title,
    Body,
}

/// Messages posted by background tasks for the engine's single logical
/// mutation path
#[derive(Debug)]
pub enum EngineMessage {
    /// The per-note subscription delivered a snapshot
    NotePolled { doc_id: String, note: Note },
    /// The list subscription delivered the full note list
    NoteListPolled { notes: Vec<Note> },
    /// A poll attempt failed (the loop keeps running)
    PollFailed { message: String },
    /// A debounce timer fired for the open note
    DebounceElapsed { doc_id: String, field: EditField },
    /// An outbound save finished
    SaveCompleted {
        doc_id: String,
        result: NotesResult<Note>,
    },
    /// The peer bridge adapter published new connection state
    PeerStateChanged { state: PeerConnectionState },
}

/// Events emitted for the presentation layer
#[derive(Debug, Clone)]
pub enum NoteEvent {
    /// The note list changed (load, poll, create)
    NoteListChanged,
    /// The open note or its displayed content changed
    ActiveNoteChanged { doc_id: Option<String> },
    /// The sync-status indicator changed
    StatusChanged { status: SyncStatus },
    /// Peer connection state changed
    PeerStateChanged { state: PeerConnectionState },
}

/// Per-open-note edit state.
///
/// Created when a note becomes active, destroyed when a different note
/// becomes active. The debounce timer handles are first-class fields so
/// cancellation on note switch is deterministic.
struct EditSession {
    doc_id: String,
    local_title: String,
    local_content: String,
    editing_title: bool,
    editing_body: bool,
    /// Last remote `updatedAt` this engine accepted; polls must be strictly
    /// newer to apply
    last_accepted_update: Option<DateTime<Utc>>,
    title_timer: Option<AbortHandle>,
    body_timer: Option<AbortHandle>,
    save_in_flight: bool,
    /// An edit arrived while a save was outstanding; a follow-up save is due
    save_queued: bool,
}

impl EditSession {
    fn open(note: &Note) -> Self {
        Self {
            doc_id: note.doc_id.clone(),
            local_title: note.title.clone(),
            local_content: note.content.clone(),
            editing_title: false,
            editing_body: false,
            last_accepted_update: note.updated_at_time(),
            title_timer: None,
            body_timer: None,
            save_in_flight: false,
            save_queued: false,
        }
    }

    fn abort_timers(&mut self) {
        if let Some(timer) = self.title_timer.take() {
            timer.abort();
        }
        if let Some(timer) = self.body_timer.take() {
            timer.abort();
        }
    }
}

/// The currently open note with its edit session and per-note subscription
struct ActiveNote {
    note: Note,
    session: EditSession,
    subscription: PollHandle,
}

/// Client-side reconciliation engine for DefraDB-backed notes.
///
/// Constructed once at process start with an injected [`RemoteStore`] and
/// [`PeerBridgeAdapter`]; the presentation layer forwards intents to it and
/// re-renders on [`NoteEvent`]s.
pub struct NotesEngine {
    remote: Arc<dyn RemoteStore>,
    poller: Poller,
    bridge: PeerBridgeAdapter,
    user: UserIdentity,
    notes: Vec<Note>,
    active: Option<ActiveNote>,
    list_subscription: Option<PollHandle>,
    sync_status: SyncStatus,
    is_offline: bool,
    peer_state: PeerConnectionState,
    event_tx: broadcast::Sender<NoteEvent>,
    msg_tx: mpsc::UnboundedSender<EngineMessage>,
    msg_rx: Option<mpsc::UnboundedReceiver<EngineMessage>>,
}

impl NotesEngine {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        bridge: PeerBridgeAdapter,
        user: UserIdentity,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        Self {
            poller: Poller::new(Arc::clone(&remote)),
            remote,
            bridge,
            user,
            notes: Vec::new(),
            active: None,
            list_subscription: None,
            sync_status: SyncStatus::Connecting,
            is_offline: false,
            peer_state: PeerConnectionState::default(),
            event_tx,
            msg_tx,
            msg_rx: Some(msg_rx),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Wiring
    // ═══════════════════════════════════════════════════════════════════════

    /// Subscribe to presentation events
    pub fn subscribe(&self) -> broadcast::Receiver<NoteEvent> {
        self.event_tx.subscribe()
    }

    /// Take the message receiver. The owner must drain it into
    /// [`NotesEngine::handle_message`]; without a pump, debounced saves and
    /// poll results never apply.
    pub fn take_message_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<EngineMessage>> {
        self.msg_rx.take()
    }

    /// Verify the store connection, load the note list, and start the list
    /// subscription and peer-state forwarding.
    ///
    /// On failure the engine records the offline/error state (the
    /// application proceeds in degraded mode) and returns the error.
    pub async fn initialize(&mut self) -> NotesResult<()> {
        self.forward_peer_state(self.bridge.subscribe());
        self.set_status(SyncStatus::Connecting);

        if let Err(err) = self.remote.check_connection().await {
            // A reachable store without the Note type means a fresh node;
            // register the schema through the bridge and check again
            let recovered = matches!(err, NotesError::RemoteSchema(_))
                && matches!(self.bridge.create_schema().await, Ok(true))
                && self.remote.check_connection().await.is_ok();
            if !recovered {
                warn!(%err, "store connection check failed");
                self.is_offline = true;
                self.set_status(SyncStatus::Error(err.to_string()));
                // Keep polling anyway; the first successful list delivery
                // is the recovery signal
                self.start_list_subscription();
                return Err(err);
            }
            info!("registered Note schema with the store");
        }
        info!("DefraDB connection verified");

        match self.remote.fetch_all_notes().await {
            Ok(notes) => {
                self.notes = notes;
                self.emit(NoteEvent::NoteListChanged);
            }
            Err(err) => {
                warn!(%err, "failed to load notes");
                self.is_offline = true;
                self.set_status(SyncStatus::Error(err.to_string()));
                self.start_list_subscription();
                return Err(err);
            }
        }

        self.start_list_subscription();
        self.set_status(SyncStatus::Synced);
        Ok(())
    }

    fn forward_peer_state(&self, mut rx: watch::Receiver<PeerConnectionState>) {
        let tx = self.msg_tx.clone();
        tokio::spawn(async move {
            loop {
                let state = rx.borrow_and_update().clone();
                if tx.send(EngineMessage::PeerStateChanged { state }).is_err() {
                    break;
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        });
    }

    fn start_list_subscription(&mut self) {
        if let Some(old) = self.list_subscription.take() {
            old.cancel();
        }
        let data_tx = self.msg_tx.clone();
        let err_tx = self.msg_tx.clone();
        let handle = self.poller.subscribe_to_note_list(
            move |notes| {
                let _ = data_tx.send(EngineMessage::NoteListPolled { notes });
            },
            move |err| {
                let _ = err_tx.send(EngineMessage::PollFailed {
                    message: err.to_string(),
                });
            },
        );
        self.list_subscription = Some(handle);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Intents
    // ═══════════════════════════════════════════════════════════════════════

    /// Open a note: load it, create a fresh edit session, and start the
    /// per-note subscription. The previous note's subscription and timers
    /// are cancelled first.
    pub async fn select_note(&mut self, doc_id: &str) -> NotesResult<()> {
        if self.active_doc_id() == Some(doc_id) {
            return Ok(());
        }
        self.close_note();

        match self.remote.fetch_note(doc_id).await {
            Ok(Some(note)) => {
                self.activate(note);
                Ok(())
            }
            Ok(None) => {
                warn!(doc_id, "selected note not found in store");
                self.emit(NoteEvent::ActiveNoteChanged { doc_id: None });
                Ok(())
            }
            Err(err) => {
                warn!(%err, doc_id, "failed to load note");
                self.set_status(SyncStatus::Error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Close the open note, cancelling its subscription and any armed
    /// debounce timers
    pub fn close_note(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.subscription.cancel();
            active.session.abort_timers();
            debug!(doc_id = %active.session.doc_id, "closed note");
        }
    }

    fn activate(&mut self, note: Note) {
        let session = EditSession::open(&note);
        let doc_id = note.doc_id.clone();

        let data_tx = self.msg_tx.clone();
        let data_doc = doc_id.clone();
        let err_tx = self.msg_tx.clone();
        let subscription = self.poller.subscribe_to_note(
            &doc_id,
            move |note| {
                let _ = data_tx.send(EngineMessage::NotePolled {
                    doc_id: data_doc.clone(),
                    note,
                });
            },
            move |err| {
                let _ = err_tx.send(EngineMessage::PollFailed {
                    message: err.to_string(),
                });
            },
        );

        self.active = Some(ActiveNote {
            note,
            session,
            subscription,
        });
        self.emit(NoteEvent::ActiveNoteChanged {
            doc_id: Some(doc_id),
        });
    }

    /// Create a note in the default workspace authored by the current user,
    /// append it to the list (de-duplicated by `docID`), and make it the
    /// open note.
    ///
    /// Failures propagate to the caller for a visible alert and leave the
    /// list untouched.
    pub async fn create_note(&mut self, title: &str) -> NotesResult<Note> {
        self.set_status(SyncStatus::Syncing);
        let fields = NoteFields::new(title, &self.user.id);

        match self.remote.create_note(&fields).await {
            Ok(note) => {
                info!(doc_id = %note.doc_id, "created note");
                if !self.notes.iter().any(|n| n.doc_id == note.doc_id) {
                    self.notes.push(note.clone());
                    self.emit(NoteEvent::NoteListChanged);
                }
                self.set_status(SyncStatus::Synced);
                self.close_note();
                self.activate(note.clone());
                Ok(note)
            }
            Err(err) => {
                warn!(%err, "failed to create note");
                self.is_offline = true;
                self.set_status(SyncStatus::Error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Body edit signal from the editor surface. Records the content
    /// locally and (re)arms the body debounce timer.
    pub fn edit_body(&mut self, content: impl Into<String>) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        active.session.local_content = content.into();
        active.session.editing_body = true;
        let timer = Self::arm_debounce(
            &self.msg_tx,
            active.session.doc_id.clone(),
            EditField::Body,
        );
        if let Some(old) = active.session.body_timer.replace(timer) {
            old.abort();
        }
    }

    /// Title edit signal. Separate timer and flag from the body so editing
    /// one field does not inhibit merge suppression for the other.
    pub fn edit_title(&mut self, title: impl Into<String>) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        active.session.local_title = title.into();
        active.session.editing_title = true;
        let timer = Self::arm_debounce(
            &self.msg_tx,
            active.session.doc_id.clone(),
            EditField::Title,
        );
        if let Some(old) = active.session.title_timer.replace(timer) {
            old.abort();
        }
    }

    fn arm_debounce(
        tx: &mpsc::UnboundedSender<EngineMessage>,
        doc_id: String,
        field: EditField,
    ) -> AbortHandle {
        let tx = tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(DEBOUNCE_INTERVAL).await;
            let _ = tx.send(EngineMessage::DebounceElapsed { doc_id, field });
        });
        task.abort_handle()
    }

    /// Connect to a peer by identifier (validated before the bridge is
    /// called)
    pub async fn connect_to_peer(&self, peer_id: &str) -> NotesResult<PeerCommandResult> {
        self.bridge.connect(peer_id).await
    }

    /// Commit history for a document, for display
    pub async fn fetch_commits(&self, doc_id: &str) -> NotesResult<Vec<Commit>> {
        self.remote.fetch_latest_commits(doc_id).await
    }

    /// Version summary (`updatedAt` plus `_version` heads) for a document
    pub async fn fetch_version(&self, doc_id: &str) -> NotesResult<Option<Note>> {
        self.remote.fetch_note_version(doc_id).await
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Message handling
    // ═══════════════════════════════════════════════════════════════════════

    /// Apply one background message. All engine mutation funnels through
    /// here and the intent methods.
    pub fn handle_message(&mut self, msg: EngineMessage) {
        match msg {
            EngineMessage::NotePolled { doc_id, note } => self.apply_remote_note(&doc_id, note),
            EngineMessage::NoteListPolled { notes } => self.apply_remote_list(notes),
            EngineMessage::PollFailed { message } => {
                debug!(%message, "background poll failed");
                if !self.is_offline {
                    self.set_status(SyncStatus::Error(message));
                }
            }
            EngineMessage::DebounceElapsed { doc_id, field } => {
                self.debounce_elapsed(&doc_id, field)
            }
            EngineMessage::SaveCompleted { doc_id, result } => self.save_completed(&doc_id, result),
            EngineMessage::PeerStateChanged { state } => self.peer_state_changed(state),
        }
    }

    /// Merge policy for a polled snapshot of the open note
    fn apply_remote_note(&mut self, doc_id: &str, note: Note) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        // A poll in flight at switch time may still deliver for the old note
        if active.session.doc_id != doc_id {
            debug!(doc_id, "discarding poll result for inactive note");
            return;
        }
        if active.session.editing_title || active.session.editing_body {
            return;
        }
        // Local state is ahead of the store until the write lands; applying
        // a snapshot now could clobber content waiting to be saved
        if active.session.save_in_flight || active.session.save_queued {
            return;
        }

        let Some(remote_time) = note.updated_at_time() else {
            debug!(doc_id, "remote snapshot has unparseable updatedAt, skipping");
            return;
        };
        if let Some(last) = active.session.last_accepted_update {
            // Strictly newer: the echo of our own write carries the exact
            // timestamp we recorded and must not re-render
            if remote_time <= last {
                return;
            }
        }

        active.session.local_title = note.title.clone();
        active.session.local_content = note.content.clone();
        active.session.last_accepted_update = Some(remote_time);
        active.note = note;
        let doc_id = active.session.doc_id.clone();
        self.emit(NoteEvent::ActiveNoteChanged {
            doc_id: Some(doc_id),
        });
    }

    fn apply_remote_list(&mut self, notes: Vec<Note>) {
        let was_offline = self.is_offline;
        self.is_offline = false;
        if was_offline {
            info!("store reachable again, replacing note list");
        }
        if matches!(
            self.sync_status,
            SyncStatus::Connecting | SyncStatus::Error(_) | SyncStatus::Offline
        ) {
            self.set_status(SyncStatus::Synced);
        }
        if self.notes != notes {
            self.notes = notes;
            self.emit(NoteEvent::NoteListChanged);
        }
    }

    fn debounce_elapsed(&mut self, doc_id: &str, field: EditField) {
        {
            let Some(active) = self.active.as_mut() else {
                return;
            };
            // The note was switched between the timer firing and delivery
            if active.session.doc_id != doc_id {
                return;
            }
            match field {
                EditField::Title => {
                    active.session.editing_title = false;
                    active.session.title_timer = None;
                }
                EditField::Body => {
                    active.session.editing_body = false;
                    active.session.body_timer = None;
                }
            }
        }
        self.issue_save();
    }

    /// Issue an `updateNote` write carrying the current local title and
    /// content. If a save is already outstanding the write is deferred
    /// until it completes, so no edits are dropped.
    fn issue_save(&mut self) {
        let (doc_id, updates) = {
            let Some(active) = self.active.as_mut() else {
                return;
            };
            if active.session.save_in_flight {
                active.session.save_queued = true;
                return;
            }
            active.session.save_in_flight = true;
            (
                active.session.doc_id.clone(),
                NoteUpdate {
                    title: active.session.local_title.clone(),
                    content: active.session.local_content.clone(),
                    workspace: active.note.workspace.clone(),
                    updated_at: now_timestamp(),
                },
            )
        };
        self.set_status(SyncStatus::Syncing);

        let remote = Arc::clone(&self.remote);
        let tx = self.msg_tx.clone();
        tokio::spawn(async move {
            let result = remote.update_note(&doc_id, &updates).await;
            let _ = tx.send(EngineMessage::SaveCompleted { doc_id, result });
        });
    }

    fn save_completed(&mut self, doc_id: &str, result: NotesResult<Note>) {
        let queued = {
            let Some(active) = self.active.as_mut() else {
                return;
            };
            // A save that outlived its note completes fire-and-forget; the
            // result must not be applied to the newly active session
            if active.session.doc_id != doc_id {
                debug!(doc_id, "discarding save result for inactive note");
                return;
            }
            active.session.save_in_flight = false;
            std::mem::take(&mut active.session.save_queued)
        };

        match result {
            Ok(note) => {
                if let Some(active) = self.active.as_mut() {
                    // Record the echoed timestamp so the next poll of our own
                    // write is not treated as an external change
                    active.session.last_accepted_update = note.updated_at_time();
                    active.note = note.clone();
                }
                if let Some(entry) = self.notes.iter_mut().find(|n| n.doc_id == doc_id) {
                    *entry = note;
                    self.emit(NoteEvent::NoteListChanged);
                }
                self.set_status(SyncStatus::Synced);
                self.emit(NoteEvent::ActiveNoteChanged {
                    doc_id: Some(doc_id.to_string()),
                });
            }
            Err(err) => {
                warn!(%err, doc_id, "failed to save note");
                self.set_status(SyncStatus::Error(err.to_string()));
            }
        }

        if queued {
            self.issue_save();
        }
    }

    fn peer_state_changed(&mut self, state: PeerConnectionState) {
        let was_loading = self.peer_state.is_peer_loading;
        let became_idle =
            was_loading && !state.is_peer_loading && !state.is_peer_connected;
        self.peer_state = state.clone();
        self.emit(NoteEvent::PeerStateChanged { state });

        // Startup window closed without any connection signal while the
        // store is also unreachable: terminal offline for the session
        if became_idle && self.is_offline {
            self.set_status(SyncStatus::Offline);
        }
    }

    fn set_status(&mut self, status: SyncStatus) {
        if self.sync_status != status {
            self.sync_status = status.clone();
            self.emit(NoteEvent::StatusChanged { status });
        }
    }

    fn emit(&self, event: NoteEvent) {
        // No receivers is fine (e.g. headless tests)
        let _ = self.event_tx.send(event);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Views
    // ═══════════════════════════════════════════════════════════════════════

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn active_note(&self) -> Option<&Note> {
        self.active.as_ref().map(|a| &a.note)
    }

    pub fn active_doc_id(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.session.doc_id.as_str())
    }

    /// Displayed title: the session's local value (reflects in-progress
    /// edits and accepted remote merges)
    pub fn display_title(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.session.local_title.as_str())
    }

    /// Displayed body content, same ownership as [`Self::display_title`]
    pub fn display_content(&self) -> Option<&str> {
        self.active
            .as_ref()
            .map(|a| a.session.local_content.as_str())
    }

    pub fn is_editing(&self) -> bool {
        self.active
            .as_ref()
            .map(|a| a.session.editing_title || a.session.editing_body)
            .unwrap_or(false)
    }

    pub fn sync_status(&self) -> &SyncStatus {
        &self.sync_status
    }

    pub fn is_offline(&self) -> bool {
        self.is_offline
    }

    pub fn peer_state(&self) -> &PeerConnectionState {
        &self.peer_state
    }

    pub fn user(&self) -> &UserIdentity {
        &self.user
    }
}

impl Drop for NotesEngine {
    fn drop(&mut self) {
        self.close_note();
        if let Some(sub) = self.list_subscription.take() {
            sub.cancel();
        }
        self.poller.disconnect();
    }
}
