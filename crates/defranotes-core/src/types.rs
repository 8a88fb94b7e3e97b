//! Core types for DefraNotes

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Workspace assigned to every note created by this client
pub const DEFAULT_WORKSPACE: &str = "default";

/// Current ISO-8601 timestamp string, as sent to the store on writes
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A note document as returned by the DefraDB query endpoint.
///
/// `doc_id` is store-assigned and immutable for the document's lifetime.
/// `created_at`/`updated_at` are kept as the ISO-8601 strings the store
/// returns; [`Note::updated_at_time`] parses for timestamp comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Store-assigned stable document identifier
    #[serde(rename = "_docID")]
    pub doc_id: String,
    #[serde(default)]
    pub title: String,
    /// Note body, serialized as a single flat string
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub workspace: String,
    #[serde(default, rename = "authorId")]
    pub author_id: String,
    #[serde(default, rename = "createdAt")]
    pub created_at: String,
    #[serde(default, rename = "updatedAt")]
    pub updated_at: String,
    /// Commit history heads from the store, display only
    #[serde(default, rename = "_version", skip_serializing_if = "Vec::is_empty")]
    pub version: Vec<DocVersion>,
}

impl Note {
    /// Parse `updated_at` for ordering comparisons.
    ///
    /// Returns `None` when the field is missing or not valid ISO-8601; the
    /// merge policy treats such values as not-newer.
    pub fn updated_at_time(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.updated_at)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Latest version entry, if the query selected `_version`
    pub fn latest_version(&self) -> Option<&DocVersion> {
        self.version.first()
    }
}

/// Content-addressed version entry from the store's commit history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocVersion {
    /// Content identifier of the snapshot
    pub cid: String,
    /// Monotonically increasing commit height
    pub height: u64,
}

/// A commit from the store's `latestCommits` query. Informational only.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Commit {
    pub cid: String,
    pub height: u64,
    #[serde(default)]
    pub delta: Option<CommitDelta>,
    #[serde(default)]
    pub links: Vec<CommitLink>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommitDelta {
    #[serde(default)]
    pub payload: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommitLink {
    pub cid: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Fields for creating a new note. The store assigns the `docID`.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteFields {
    pub title: String,
    pub content: String,
    pub workspace: String,
    pub author_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl NoteFields {
    /// New-note payload with empty content, the default workspace, and
    /// current timestamps
    pub fn new(title: impl Into<String>, author_id: impl Into<String>) -> Self {
        let now = now_timestamp();
        Self {
            title: title.into(),
            content: String::new(),
            workspace: DEFAULT_WORKSPACE.to_string(),
            author_id: author_id.into(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Partial fields for an update write. Title and content always travel
/// together (document-granularity writes).
#[derive(Debug, Clone, PartialEq)]
pub struct NoteUpdate {
    pub title: String,
    pub content: String,
    pub workspace: String,
    pub updated_at: String,
}

/// Sync-status indicator shown in the UI header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// Waiting for the first successful contact with the store
    Connecting,
    /// Last operation against the store succeeded
    Synced,
    /// A write is in flight
    Syncing,
    /// A poll or write failed; polling continues
    Error(String),
    /// The store was determined unreachable for this session
    Offline,
}

impl Default for SyncStatus {
    fn default() -> Self {
        SyncStatus::Connecting
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Connecting => write!(f, "connecting"),
            SyncStatus::Synced => write!(f, "synced"),
            SyncStatus::Syncing => write!(f, "syncing"),
            SyncStatus::Error(_) => write!(f, "error"),
            SyncStatus::Offline => write!(f, "offline"),
        }
    }
}

/// Peer connection state owned by the bridge adapter
#[derive(Debug, Clone, PartialEq)]
pub struct PeerConnectionState {
    /// Opaque identity blob from the bridge, for display
    pub peer_info: Option<serde_json::Value>,
    /// Whether a peer identity has ever been established this session
    pub is_peer_connected: bool,
    /// Whether a peer session is active right now
    pub has_peer_connections: bool,
    /// Still waiting for the first connection signal
    pub is_peer_loading: bool,
}

impl Default for PeerConnectionState {
    fn default() -> Self {
        Self {
            peer_info: None,
            is_peer_connected: false,
            has_peer_connections: false,
            is_peer_loading: true,
        }
    }
}

/// Outcome of a user-initiated peer command.
///
/// A rejected connection is a non-success result, not an error; errors are
/// reserved for bridge-level malfunction.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerCommandResult {
    pub success: bool,
    pub message: String,
}

impl PeerCommandResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_note(updated_at: &str) -> Note {
        Note {
            doc_id: "bae-123".to_string(),
            title: "Test".to_string(),
            content: "body".to_string(),
            workspace: DEFAULT_WORKSPACE.to_string(),
            author_id: "user-1".to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: updated_at.to_string(),
            version: Vec::new(),
        }
    }

    #[test]
    fn test_note_deserializes_store_field_names() {
        let raw = serde_json::json!({
            "_docID": "bae-abc",
            "title": "Hello",
            "content": "world",
            "workspace": "default",
            "authorId": "user-9",
            "createdAt": "2026-01-01T00:00:00Z",
            "updatedAt": "2026-01-02T00:00:00Z",
            "_version": [{"cid": "bafy123", "height": 4}]
        });
        let note: Note = serde_json::from_value(raw).unwrap();
        assert_eq!(note.doc_id, "bae-abc");
        assert_eq!(note.author_id, "user-9");
        assert_eq!(note.latest_version().unwrap().height, 4);
    }

    #[test]
    fn test_note_updated_at_parses() {
        let note = sample_note("2026-01-02T03:04:05.678Z");
        let t = note.updated_at_time().unwrap();
        assert_eq!(t.timestamp(), 1767323045);
    }

    #[test]
    fn test_note_updated_at_invalid_is_none() {
        assert!(sample_note("").updated_at_time().is_none());
        assert!(sample_note("yesterday").updated_at_time().is_none());
    }

    #[test]
    fn test_note_fields_defaults() {
        let fields = NoteFields::new("New Note", "user-1");
        assert_eq!(fields.workspace, DEFAULT_WORKSPACE);
        assert_eq!(fields.content, "");
        assert_eq!(fields.created_at, fields.updated_at);
    }

    #[test]
    fn test_sync_status_display() {
        assert_eq!(format!("{}", SyncStatus::Connecting), "connecting");
        assert_eq!(format!("{}", SyncStatus::Synced), "synced");
        assert_eq!(format!("{}", SyncStatus::Syncing), "syncing");
        assert_eq!(format!("{}", SyncStatus::Error("x".into())), "error");
        assert_eq!(format!("{}", SyncStatus::Offline), "offline");
    }

    #[test]
    fn test_peer_state_starts_loading() {
        let state = PeerConnectionState::default();
        assert!(state.is_peer_loading);
        assert!(!state.is_peer_connected);
        assert!(!state.has_peer_connections);
    }
}
