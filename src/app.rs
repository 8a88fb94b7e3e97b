use std::sync::Arc;

use dioxus::prelude::*;
use tokio::sync::{mpsc, RwLock};

use defranotes_core::bridge::{DefraCliBridge, PeerBridge, PeerBridgeAdapter};
use defranotes_core::engine::NotesEngine;
use defranotes_core::remote::DefraClient;
use defranotes_core::types::{Note, PeerConnectionState, SyncStatus};
use defranotes_core::user::UserIdentity;

use crate::components::{Editor, Header, PeerDialog, Sidebar};
use crate::context::{
    get_data_dir, get_defradb_bin, get_endpoint, RefreshTick, SharedEngine,
};
use crate::theme::GLOBAL_STYLES;

/// One coherent view of the engine, taken under the read lock.
///
/// Components render from this snapshot instead of touching the engine, so
/// a render never blocks on in-flight engine work.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewSnapshot {
    pub notes: Vec<Note>,
    pub active_doc_id: Option<String>,
    pub title: String,
    pub content: String,
    pub status: SyncStatus,
    pub offline: bool,
    pub peer: PeerConnectionState,
    pub user_name: String,
}

impl ViewSnapshot {
    fn capture(engine: &NotesEngine) -> Self {
        Self {
            notes: engine.notes().to_vec(),
            active_doc_id: engine.active_doc_id().map(str::to_string),
            title: engine.display_title().unwrap_or_default().to_string(),
            content: engine.display_content().unwrap_or_default().to_string(),
            status: engine.sync_status().clone(),
            offline: engine.is_offline(),
            peer: engine.peer_state().clone(),
            user_name: engine.user().name.clone(),
        }
    }
}

/// Root application component.
///
/// Provides global styles and engine context, runs the startup sequence,
/// and pumps engine messages and events.
#[component]
pub fn App() -> Element {
    let engine: Signal<SharedEngine> = use_signal(|| Arc::new(RwLock::new(None)));
    let mut engine_ready: Signal<bool> = use_signal(|| false);
    let mut refresh: Signal<RefreshTick> = use_signal(RefreshTick::default);

    use_context_provider(|| engine);
    use_context_provider(|| engine_ready);
    use_context_provider(|| refresh);

    // Startup: identity, store client, peer bridge, then the engine
    use_effect(move || {
        spawn(async move {
            let data_dir = get_data_dir();
            let user = match UserIdentity::load_or_create(&data_dir) {
                Ok(user) => user,
                Err(e) => {
                    tracing::error!("Failed to load user identity: {}", e);
                    return;
                }
            };

            let remote = Arc::new(DefraClient::new(get_endpoint()));
            let bridge = Arc::new(DefraCliBridge::new(get_defradb_bin()));
            let (peer_tx, peer_rx) = mpsc::unbounded_channel();
            bridge.spawn_peer_info_watcher(peer_tx);
            let adapter = PeerBridgeAdapter::new(Arc::clone(&bridge) as Arc<dyn PeerBridge>);
            adapter.start(peer_rx);

            let mut eng = NotesEngine::new(remote, adapter, user);
            let msg_rx = eng.take_message_receiver();
            let mut events = eng.subscribe();

            if let Err(e) = eng.initialize().await {
                // The engine carries the offline state; the UI still opens
                tracing::error!("Starting without a store connection: {}", e);
            }

            // Open the first note automatically, matching a returning
            // user's expectation
            if let Some(doc_id) = eng.notes().first().map(|n| n.doc_id.clone()) {
                if let Err(e) = eng.select_note(&doc_id).await {
                    tracing::warn!("Could not open first note: {}", e);
                }
            }

            let shared = engine();
            *shared.write().await = Some(eng);
            engine_ready.set(true);
            tracing::info!("NotesEngine initialized");

            // Message pump: background results apply on this single path
            if let Some(mut msg_rx) = msg_rx {
                let shared = engine();
                spawn(async move {
                    while let Some(msg) = msg_rx.recv().await {
                        let mut guard = shared.write().await;
                        if let Some(eng) = guard.as_mut() {
                            eng.handle_message(msg);
                        }
                    }
                });
            }

            // Event loop: every engine event invalidates the view snapshot
            spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(_) => refresh.with_mut(|tick| tick.0 += 1),
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            });
        });
    });

    rsx! {
        style { {GLOBAL_STYLES} }
        Workspace {}
    }
}

/// Main workspace: header, note sidebar, and editor
#[component]
fn Workspace() -> Element {
    let engine = crate::context::use_engine();
    let ready = crate::context::use_engine_ready();
    let refresh = crate::context::use_refresh();
    let mut show_peer_dialog = use_signal(|| false);

    let snapshot = use_resource(move || async move {
        let _tick = refresh();
        if !ready() {
            return None;
        }
        let shared = engine();
        let guard = shared.read().await;
        guard.as_ref().map(ViewSnapshot::capture)
    });

    let on_select = move |doc_id: String| {
        spawn(async move {
            let shared = engine();
            let mut guard = shared.write().await;
            if let Some(eng) = guard.as_mut() {
                if let Err(e) = eng.select_note(&doc_id).await {
                    tracing::error!("Failed to open note: {}", e);
                }
            }
        });
    };

    let on_create = move |_| {
        spawn(async move {
            let shared = engine();
            let mut guard = shared.write().await;
            if let Some(eng) = guard.as_mut() {
                if let Err(e) = eng.create_note("New Note").await {
                    tracing::error!("Failed to create note: {}", e);
                }
            }
        });
    };

    let on_title = move |value: String| {
        spawn(async move {
            let shared = engine();
            let mut guard = shared.write().await;
            if let Some(eng) = guard.as_mut() {
                eng.edit_title(value);
            }
        });
    };

    let on_body = move |value: String| {
        spawn(async move {
            let shared = engine();
            let mut guard = shared.write().await;
            if let Some(eng) = guard.as_mut() {
                eng.edit_body(value);
            }
        });
    };

    let view = snapshot.read_unchecked().clone().flatten();
    match view {
        Some(view) => rsx! {
            div { class: "workspace",
                Header {
                    status: view.status.clone(),
                    offline: view.offline,
                    peer: view.peer.clone(),
                    user_name: view.user_name.clone(),
                    on_peer_dialog: move |_| show_peer_dialog.set(true),
                }
                div { class: "workspace-body",
                    Sidebar {
                        notes: view.notes.clone(),
                        active_doc_id: view.active_doc_id.clone(),
                        on_select: on_select,
                        on_create: on_create,
                    }
                    Editor {
                        active_doc_id: view.active_doc_id.clone(),
                        title: view.title.clone(),
                        content: view.content.clone(),
                        on_title: on_title,
                        on_body: on_body,
                    }
                }
                if show_peer_dialog() {
                    PeerDialog {
                        peer: view.peer.clone(),
                        on_close: move |_| show_peer_dialog.set(false),
                    }
                }
            }
        },
        None => rsx! {
            div { class: "startup-screen",
                p { class: "startup-message", "Connecting to DefraDB..." }
            }
        },
    }
}
