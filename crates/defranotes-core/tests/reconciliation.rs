//! Reconciliation engine integration tests
//!
//! These tests drive a `NotesEngine` against an in-memory store and verify
//! the merge and save behavior end to end.
//!
//! ## Test Architecture
//!
//! - **Unit tests** (`src/remote/poller.rs`, `src/bridge.rs`): polling loop
//!   and peer-state mechanics in isolation
//! - **Integration tests** (this file): the engine's edit/sync policy with
//!   real timers under paused tokio time
//!
//! ## What These Tests Verify
//!
//! - Increasing-`updatedAt` remote snapshots apply in order
//! - An in-progress edit suppresses remote application entirely
//! - A burst of edits coalesces into exactly one write
//! - Edits landing during an in-flight save trigger a follow-up save
//! - Deliveries for a note that is no longer open are discarded
//! - The echo of the engine's own write is not re-applied
//! - Store failure at startup degrades to offline and recovers on the next
//!   successful list delivery

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time::sleep;

use defranotes_core::bridge::{PeerBridge, PeerBridgeAdapter};
use defranotes_core::engine::{EngineMessage, NotesEngine};
use defranotes_core::error::{NotesError, NotesResult};
use defranotes_core::remote::RemoteStore;
use defranotes_core::types::{
    Commit, Note, NoteFields, NoteUpdate, PeerCommandResult, SyncStatus, DEFAULT_WORKSPACE,
};
use defranotes_core::user::UserIdentity;

/// In-memory store. `update_note` records every write and echoes the
/// document back with the caller's `updatedAt`, like the real store does.
struct MemoryStore {
    notes: Mutex<Vec<Note>>,
    updates: Mutex<Vec<(String, NoteUpdate)>>,
    next_id: AtomicUsize,
    fail_connection: AtomicBool,
    missing_schema: AtomicBool,
    save_delay: Duration,
}

impl MemoryStore {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            notes: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(0),
            fail_connection: AtomicBool::new(false),
            missing_schema: AtomicBool::new(false),
            save_delay: Duration::ZERO,
        })
    }

    fn with_save_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            notes: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(0),
            fail_connection: AtomicBool::new(false),
            missing_schema: AtomicBool::new(false),
            save_delay: delay,
        })
    }

    fn seed(&self, title: &str, content: &str, updated_at: &str) -> Note {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let note = Note {
            doc_id: format!("bae-{:03}", n),
            title: title.to_string(),
            content: content.to_string(),
            workspace: DEFAULT_WORKSPACE.to_string(),
            author_id: "user-seed".to_string(),
            created_at: updated_at.to_string(),
            updated_at: updated_at.to_string(),
            version: Vec::new(),
        };
        self.notes.lock().push(note.clone());
        note
    }

    fn overwrite(&self, doc_id: &str, title: &str, content: &str, updated_at: &str) {
        let mut notes = self.notes.lock();
        if let Some(note) = notes.iter_mut().find(|n| n.doc_id == doc_id) {
            note.title = title.to_string();
            note.content = content.to_string();
            note.updated_at = updated_at.to_string();
        }
    }

    fn recorded_updates(&self) -> Vec<(String, NoteUpdate)> {
        self.updates.lock().clone()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn execute(&self, query: &str, variables: Value) -> NotesResult<Value> {
        if self.fail_connection.load(Ordering::SeqCst) {
            return Err(NotesError::Network("connection refused".to_string()));
        }
        // The poller issues raw queries; answer the two shapes it uses
        let notes = self.notes.lock();
        let selected: Vec<&Note> = if query.contains("docID: $docID") {
            let doc_id = variables
                .get("docID")
                .and_then(Value::as_str)
                .unwrap_or_default();
            notes.iter().filter(|n| n.doc_id == doc_id).collect()
        } else {
            notes.iter().collect()
        };
        Ok(json!({ "Note": selected }))
    }

    async fn check_connection(&self) -> NotesResult<()> {
        if self.fail_connection.load(Ordering::SeqCst) {
            Err(NotesError::Network("connection refused".to_string()))
        } else if self.missing_schema.load(Ordering::SeqCst) {
            Err(NotesError::RemoteSchema("Note schema not found".to_string()))
        } else {
            Ok(())
        }
    }

    async fn fetch_all_notes(&self) -> NotesResult<Vec<Note>> {
        Ok(self.notes.lock().clone())
    }

    async fn fetch_note(&self, doc_id: &str) -> NotesResult<Option<Note>> {
        Ok(self.notes.lock().iter().find(|n| n.doc_id == doc_id).cloned())
    }

    async fn create_note(&self, fields: &NoteFields) -> NotesResult<Note> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let note = Note {
            doc_id: format!("bae-{:03}", n),
            title: fields.title.clone(),
            content: fields.content.clone(),
            workspace: fields.workspace.clone(),
            author_id: fields.author_id.clone(),
            created_at: fields.created_at.clone(),
            updated_at: fields.updated_at.clone(),
            version: Vec::new(),
        };
        self.notes.lock().push(note.clone());
        Ok(note)
    }

    async fn update_note(&self, doc_id: &str, updates: &NoteUpdate) -> NotesResult<Note> {
        if !self.save_delay.is_zero() {
            sleep(self.save_delay).await;
        }
        self.updates
            .lock()
            .push((doc_id.to_string(), updates.clone()));
        let mut notes = self.notes.lock();
        let note = notes
            .iter_mut()
            .find(|n| n.doc_id == doc_id)
            .ok_or_else(|| NotesError::RemoteSchema("update_Note returned no document".into()))?;
        note.title = updates.title.clone();
        note.content = updates.content.clone();
        note.updated_at = updates.updated_at.clone();
        Ok(note.clone())
    }

    async fn fetch_note_version(&self, doc_id: &str) -> NotesResult<Option<Note>> {
        self.fetch_note(doc_id).await
    }

    async fn fetch_latest_commits(&self, _doc_id: &str) -> NotesResult<Vec<Commit>> {
        Ok(Vec::new())
    }
}

/// Bridge whose `create_schema` registers the schema with the test store
struct SchemaBridge {
    store: Arc<MemoryStore>,
}

#[async_trait]
impl PeerBridge for SchemaBridge {
    async fn get_peer_info(&self) -> NotesResult<Option<String>> {
        Ok(None)
    }

    async fn connect_to_peer(&self, peer_id: &str) -> NotesResult<PeerCommandResult> {
        Ok(PeerCommandResult::ok(format!("connected to {}", peer_id)))
    }

    async fn check_peer_connections(&self) -> NotesResult<bool> {
        Ok(false)
    }

    async fn create_schema(&self) -> NotesResult<bool> {
        self.store.missing_schema.store(false, Ordering::SeqCst);
        Ok(true)
    }
}

/// Bridge that reports nothing; peer behavior is covered in `src/bridge.rs`
struct NullBridge;

#[async_trait]
impl PeerBridge for NullBridge {
    async fn get_peer_info(&self) -> NotesResult<Option<String>> {
        Ok(None)
    }

    async fn connect_to_peer(&self, peer_id: &str) -> NotesResult<PeerCommandResult> {
        Ok(PeerCommandResult::ok(format!("connected to {}", peer_id)))
    }

    async fn check_peer_connections(&self) -> NotesResult<bool> {
        Ok(false)
    }

    async fn create_schema(&self) -> NotesResult<bool> {
        Ok(true)
    }
}

fn test_user() -> UserIdentity {
    UserIdentity {
        id: "user-test1234".to_string(),
        name: "User test1234".to_string(),
    }
}

async fn started_engine(
    store: Arc<MemoryStore>,
) -> (NotesEngine, mpsc::UnboundedReceiver<EngineMessage>) {
    let adapter = PeerBridgeAdapter::new(Arc::new(NullBridge));
    let mut engine = NotesEngine::new(store, adapter, test_user());
    let rx = engine
        .take_message_receiver()
        .expect("receiver taken twice");
    engine.initialize().await.expect("initialize failed");
    (engine, rx)
}

/// Apply everything background tasks have posted so far
fn pump(engine: &mut NotesEngine, rx: &mut mpsc::UnboundedReceiver<EngineMessage>) {
    while let Ok(msg) = rx.try_recv() {
        engine.handle_message(msg);
    }
}

fn polled(doc_id: &str, title: &str, content: &str, updated_at: &str) -> EngineMessage {
    EngineMessage::NotePolled {
        doc_id: doc_id.to_string(),
        note: Note {
            doc_id: doc_id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            workspace: DEFAULT_WORKSPACE.to_string(),
            author_id: "user-other".to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: updated_at.to_string(),
            version: Vec::new(),
        },
    }
}

#[tokio::test(start_paused = true)]
async fn test_newer_remote_snapshots_apply_in_order() {
    let store = MemoryStore::new();
    let seeded = store.seed("Plans", "v1", "2026-01-01T00:00:00Z");
    let (mut engine, mut rx) = started_engine(store.clone()).await;

    engine.select_note(&seeded.doc_id).await.unwrap();
    assert_eq!(engine.display_content(), Some("v1"));

    store.overwrite(&seeded.doc_id, "Plans", "v2", "2026-01-01T00:00:05Z");
    sleep(Duration::from_millis(1100)).await;
    pump(&mut engine, &mut rx);
    assert_eq!(engine.display_content(), Some("v2"));

    // An older snapshot arriving late must not regress the view
    engine.handle_message(polled(&seeded.doc_id, "Plans", "v0", "2026-01-01T00:00:01Z"));
    assert_eq!(engine.display_content(), Some("v2"));
}

#[tokio::test(start_paused = true)]
async fn test_equal_timestamp_is_not_applied() {
    let store = MemoryStore::new();
    let seeded = store.seed("Plans", "v1", "2026-01-01T00:00:00Z");
    let (mut engine, mut rx) = started_engine(store.clone()).await;
    engine.select_note(&seeded.doc_id).await.unwrap();
    pump(&mut engine, &mut rx);

    // Same timestamp, different content: must be ignored (strictly newer
    // wins, so our own write's echo never re-renders)
    engine.handle_message(polled(&seeded.doc_id, "Plans", "echo", "2026-01-01T00:00:00Z"));
    assert_eq!(engine.display_content(), Some("v1"));

    engine.handle_message(polled(
        &seeded.doc_id,
        "Plans",
        "newer",
        "2026-01-01T00:00:00.001Z",
    ));
    assert_eq!(engine.display_content(), Some("newer"));
}

#[tokio::test(start_paused = true)]
async fn test_unparseable_remote_timestamp_is_not_newer() {
    let store = MemoryStore::new();
    let seeded = store.seed("Plans", "v1", "2026-01-01T00:00:00Z");
    let (mut engine, mut rx) = started_engine(store.clone()).await;
    engine.select_note(&seeded.doc_id).await.unwrap();
    pump(&mut engine, &mut rx);

    engine.handle_message(polled(&seeded.doc_id, "Plans", "mystery", "not-a-time"));
    assert_eq!(engine.display_content(), Some("v1"));
}

#[tokio::test(start_paused = true)]
async fn test_first_load_applies_without_a_baseline() {
    let store = MemoryStore::new();
    // A document whose updatedAt never parsed leaves no baseline; the first
    // valid remote snapshot must still apply
    let seeded = store.seed("Plans", "v1", "garbage");
    let (mut engine, mut rx) = started_engine(store.clone()).await;
    engine.select_note(&seeded.doc_id).await.unwrap();
    pump(&mut engine, &mut rx);
    assert_eq!(engine.display_content(), Some("v1"));

    engine.handle_message(polled(&seeded.doc_id, "Plans", "v2", "2026-01-01T00:00:00Z"));
    assert_eq!(engine.display_content(), Some("v2"));
}

#[tokio::test(start_paused = true)]
async fn test_editing_suppresses_remote_application() {
    let store = MemoryStore::new();
    let seeded = store.seed("Plans", "v1", "2026-01-01T00:00:00Z");
    let (mut engine, _rx) = started_engine(store.clone()).await;
    engine.select_note(&seeded.doc_id).await.unwrap();

    engine.edit_body("local draft");
    assert!(engine.is_editing());

    // Far-future remote change while the edit is in progress: ignored
    engine.handle_message(polled(&seeded.doc_id, "Plans", "remote", "2030-01-01T00:00:00Z"));
    assert_eq!(engine.display_content(), Some("local draft"));

    // A title edit alone must suppress too
    engine.edit_title("Renamed");
    engine.handle_message(polled(&seeded.doc_id, "Other", "remote", "2030-01-01T00:00:01Z"));
    assert_eq!(engine.display_title(), Some("Renamed"));
    assert_eq!(engine.display_content(), Some("local draft"));
}

#[tokio::test(start_paused = true)]
async fn test_rapid_edits_coalesce_into_one_write() {
    let store = MemoryStore::new();
    let seeded = store.seed("Plans", "v1", "2026-01-01T00:00:00Z");
    let (mut engine, mut rx) = started_engine(store.clone()).await;
    engine.select_note(&seeded.doc_id).await.unwrap();

    for i in 1..=5 {
        engine.edit_body(format!("draft {}", i));
        sleep(Duration::from_millis(200)).await;
    }
    // Quiet period long enough for the last debounce to elapse
    sleep(Duration::from_millis(1100)).await;
    pump(&mut engine, &mut rx);
    sleep(Duration::from_millis(50)).await;
    pump(&mut engine, &mut rx);

    let updates = store.recorded_updates();
    assert_eq!(updates.len(), 1, "expected a single coalesced write");
    assert_eq!(updates[0].0, seeded.doc_id);
    assert_eq!(updates[0].1.content, "draft 5");
    assert_eq!(*engine.sync_status(), SyncStatus::Synced);
    assert!(!engine.is_editing());
}

#[tokio::test(start_paused = true)]
async fn test_edit_during_inflight_save_triggers_followup() {
    let store = MemoryStore::with_save_delay(Duration::from_secs(3));
    let seeded = store.seed("Plans", "v1", "2026-01-01T00:00:00Z");
    let (mut engine, mut rx) = started_engine(store.clone()).await;
    engine.select_note(&seeded.doc_id).await.unwrap();

    engine.edit_body("first");
    sleep(Duration::from_millis(1050)).await;
    pump(&mut engine, &mut rx); // debounce fires, slow save starts

    engine.edit_body("second");
    sleep(Duration::from_millis(1050)).await;
    pump(&mut engine, &mut rx); // second debounce lands while save is in flight

    sleep(Duration::from_millis(2500)).await;
    pump(&mut engine, &mut rx); // first save completes, follow-up issued
    sleep(Duration::from_millis(3100)).await;
    pump(&mut engine, &mut rx); // follow-up completes

    let updates = store.recorded_updates();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].1.content, "first");
    assert_eq!(updates[1].1.content, "second");
    assert_eq!(engine.display_content(), Some("second"));
    assert_eq!(*engine.sync_status(), SyncStatus::Synced);
}

#[tokio::test(start_paused = true)]
async fn test_note_switch_discards_stale_deliveries() {
    let store = MemoryStore::new();
    let first = store.seed("First", "one", "2026-01-01T00:00:00Z");
    let second = store.seed("Second", "two", "2026-01-01T00:00:00Z");
    let (mut engine, mut rx) = started_engine(store.clone()).await;

    engine.select_note(&first.doc_id).await.unwrap();
    engine.select_note(&second.doc_id).await.unwrap();
    pump(&mut engine, &mut rx);
    assert_eq!(engine.active_doc_id(), Some(second.doc_id.as_str()));

    // A poll result for the previously open note arrives late
    engine.handle_message(polled(&first.doc_id, "First", "stale", "2030-01-01T00:00:00Z"));
    assert_eq!(engine.display_title(), Some("Second"));
    assert_eq!(engine.display_content(), Some("two"));

    // So does the completion of a save issued before the switch
    engine.handle_message(EngineMessage::SaveCompleted {
        doc_id: first.doc_id.clone(),
        result: Ok(Note {
            content: "stale save".to_string(),
            ..second.clone()
        }),
    });
    assert_eq!(engine.display_content(), Some("two"));
}

#[tokio::test(start_paused = true)]
async fn test_create_note_activates_and_lists_once() {
    let store = MemoryStore::new();
    let (mut engine, mut rx) = started_engine(store.clone()).await;
    assert!(engine.notes().is_empty());

    let note = engine.create_note("New Note").await.unwrap();
    assert_eq!(engine.active_doc_id(), Some(note.doc_id.as_str()));
    assert_eq!(engine.notes().len(), 1);
    assert_eq!(engine.notes()[0].author_id, "user-test1234");
    assert_eq!(engine.notes()[0].workspace, DEFAULT_WORKSPACE);
    assert_eq!(*engine.sync_status(), SyncStatus::Synced);

    // The list poll delivering the same note must not duplicate it
    sleep(Duration::from_millis(2100)).await;
    pump(&mut engine, &mut rx);
    assert_eq!(engine.notes().len(), 1);
    assert_eq!(engine.active_doc_id(), Some(note.doc_id.as_str()));
}

#[tokio::test(start_paused = true)]
async fn test_save_echo_updates_list_entry() {
    let store = MemoryStore::new();
    let seeded = store.seed("Plans", "v1", "2026-01-01T00:00:00Z");
    let (mut engine, mut rx) = started_engine(store.clone()).await;
    engine.select_note(&seeded.doc_id).await.unwrap();

    engine.edit_title("Renamed Plans");
    sleep(Duration::from_millis(1100)).await;
    pump(&mut engine, &mut rx);
    sleep(Duration::from_millis(50)).await;
    pump(&mut engine, &mut rx);

    assert_eq!(engine.notes()[0].title, "Renamed Plans");
    assert_eq!(engine.display_title(), Some("Renamed Plans"));
    assert_eq!(*engine.sync_status(), SyncStatus::Synced);
}

#[tokio::test(start_paused = true)]
async fn test_startup_failure_degrades_then_recovers() {
    let store = MemoryStore::new();
    store.seed("Plans", "v1", "2026-01-01T00:00:00Z");
    store.fail_connection.store(true, Ordering::SeqCst);

    let adapter = PeerBridgeAdapter::new(Arc::new(NullBridge));
    let (_peer_tx, peer_rx) = mpsc::unbounded_channel();
    adapter.start(peer_rx);
    let mut engine = NotesEngine::new(store.clone(), adapter, test_user());
    let mut rx = engine.take_message_receiver().unwrap();

    assert!(engine.initialize().await.is_err());
    assert!(engine.is_offline());
    assert!(matches!(engine.sync_status(), SyncStatus::Error(_)));

    // Peer startup window closes with no signal: terminal offline. The list
    // poll keeps failing in the background without disturbing the indicator.
    sleep(Duration::from_secs(6)).await;
    pump(&mut engine, &mut rx);
    assert_eq!(*engine.sync_status(), SyncStatus::Offline);
    assert!(engine.notes().is_empty());

    // The store comes back; the next list delivery brings the session back
    // without a restart
    store.fail_connection.store(false, Ordering::SeqCst);
    sleep(Duration::from_millis(2100)).await;
    pump(&mut engine, &mut rx);
    assert!(!engine.is_offline());
    assert_eq!(*engine.sync_status(), SyncStatus::Synced);
    assert_eq!(engine.notes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_schema_is_registered_on_startup() {
    let store = MemoryStore::new();
    store.seed("Plans", "v1", "2026-01-01T00:00:00Z");
    store.missing_schema.store(true, Ordering::SeqCst);

    let adapter = PeerBridgeAdapter::new(Arc::new(SchemaBridge {
        store: Arc::clone(&store),
    }));
    let mut engine = NotesEngine::new(store.clone(), adapter, test_user());
    let _rx = engine.take_message_receiver().unwrap();

    engine.initialize().await.expect("schema bootstrap failed");
    assert!(!store.missing_schema.load(Ordering::SeqCst));
    assert!(!engine.is_offline());
    assert_eq!(*engine.sync_status(), SyncStatus::Synced);
    assert_eq!(engine.notes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_select_missing_note_clears_active() {
    let store = MemoryStore::new();
    let (mut engine, mut _rx) = started_engine(store.clone()).await;

    engine.select_note("bae-does-not-exist").await.unwrap();
    assert_eq!(engine.active_doc_id(), None);
    assert_eq!(engine.display_title(), None);
}

#[tokio::test(start_paused = true)]
async fn test_poll_failure_keeps_session_alive() {
    let store = MemoryStore::new();
    let seeded = store.seed("Plans", "v1", "2026-01-01T00:00:00Z");
    let (mut engine, mut rx) = started_engine(store.clone()).await;
    engine.select_note(&seeded.doc_id).await.unwrap();

    engine.handle_message(EngineMessage::PollFailed {
        message: "connection reset".to_string(),
    });
    assert!(matches!(engine.sync_status(), SyncStatus::Error(_)));

    // The next good list delivery restores the synced indicator
    sleep(Duration::from_millis(2100)).await;
    pump(&mut engine, &mut rx);
    assert_eq!(*engine.sync_status(), SyncStatus::Synced);
    assert_eq!(engine.display_content(), Some("v1"));
}
