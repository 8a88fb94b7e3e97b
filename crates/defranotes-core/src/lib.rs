//! DefraNotes Core Library
//!
//! Client-side reconciliation for DefraDB-backed collaborative notes.
//!
//! ## Overview
//!
//! DefraNotes is a desktop note-taking client whose persistence and
//! replication live entirely in DefraDB, an external peer-to-peer document
//! database reached over a local GraphQL endpoint. This crate holds the
//! client half: the [`engine::NotesEngine`] reconciles local edits with
//! remote changes (debounced saves, polling pseudo-subscriptions, a
//! strictly-newer last-writer-wins merge gate), the [`remote`] module talks
//! GraphQL to the store, and the [`bridge`] module drives the `defradb` CLI
//! for peer discovery and replication setup.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use defranotes_core::{
//!     bridge::{DefraCliBridge, PeerBridgeAdapter},
//!     engine::NotesEngine,
//!     remote::{DefraClient, DEFAULT_ENDPOINT},
//!     user::UserIdentity,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let user = UserIdentity::load_or_create("~/.defranotes")?;
//!     let remote = Arc::new(DefraClient::new(DEFAULT_ENDPOINT));
//!     let bridge = Arc::new(DefraCliBridge::new("defradb"));
//!
//!     let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel();
//!     bridge.spawn_peer_info_watcher(events_tx);
//!     let adapter = PeerBridgeAdapter::new(bridge);
//!     adapter.start(events_rx);
//!
//!     let mut engine = NotesEngine::new(remote, adapter, user);
//!     engine.initialize().await?;
//!
//!     let note = engine.create_note("Untitled Note").await?;
//!     engine.edit_body("First line of the note");
//!     println!("created {}", note.doc_id);
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod engine;
pub mod error;
pub mod remote;
pub mod types;
pub mod user;

// Re-exports
pub use bridge::{DefraCliBridge, PeerBridge, PeerBridgeAdapter};
pub use engine::{EditField, EngineMessage, NoteEvent, NotesEngine, DEBOUNCE_INTERVAL};
pub use error::{NotesError, NotesResult};
pub use remote::{DefraClient, PollHandle, Poller, RemoteStore, DEFAULT_ENDPOINT};
pub use types::*;
pub use user::UserIdentity;
