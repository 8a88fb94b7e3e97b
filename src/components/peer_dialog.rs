//! Peer connection dialog: shows this node's identity and connects to
//! other peers by identifier.

use dioxus::prelude::*;

use defranotes_core::types::PeerConnectionState;

use crate::context::use_engine;

/// Modal dialog for peer operations.
///
/// # Props
///
/// * `peer` - Current peer connection state (identity blob included)
/// * `on_close` - Called when the dialog should close
#[component]
pub fn PeerDialog(peer: PeerConnectionState, on_close: EventHandler<()>) -> Element {
    let engine = use_engine();
    let mut peer_input = use_signal(String::new);
    let mut result_message: Signal<Option<(bool, String)>> = use_signal(|| None);

    let peer_info = peer
        .peer_info
        .as_ref()
        .map(|info| serde_json::to_string_pretty(info).unwrap_or_else(|_| info.to_string()));

    let connect = move |_| {
        let peer_id = peer_input.read().trim().to_string();
        spawn(async move {
            let shared = engine();
            let guard = shared.read().await;
            let Some(eng) = guard.as_ref() else { return };
            match eng.connect_to_peer(&peer_id).await {
                Ok(result) => result_message.set(Some((result.success, result.message))),
                Err(e) => result_message.set(Some((false, e.to_string()))),
            }
        });
    };

    rsx! {
        div { class: "modal-overlay", onclick: move |_| on_close.call(()),
            div { class: "modal", onclick: move |e| e.stop_propagation(),
                div { class: "modal-header",
                    h2 { "Peers" }
                    button {
                        class: "modal-close",
                        onclick: move |_| on_close.call(()),
                        "aria-label": "Close",
                        "\u{00D7}"
                    }
                }

                section { class: "modal-section",
                    h3 { "Your Peer Info" }
                    if let Some(info) = peer_info {
                        pre { class: "peer-info-block", "{info}" }
                    } else if peer.is_peer_loading {
                        p { class: "peer-info-pending", "Waiting for the node to report its identity..." }
                    } else {
                        p { class: "peer-info-pending", "Peer identity unavailable. Is the DefraDB node running?" }
                    }
                }

                section { class: "modal-section",
                    h3 { "Connect to Peer" }
                    div { class: "connect-row",
                        input {
                            class: "input-field",
                            placeholder: "Enter peer ID",
                            value: "{peer_input}",
                            oninput: move |e| peer_input.set(e.value()),
                        }
                        button { class: "btn-primary", onclick: connect, "Connect" }
                    }
                    if let Some((success, message)) = result_message() {
                        p {
                            class: if success { "connect-result success" } else { "connect-result failure" },
                            "{message}"
                        }
                    }
                }
            }
        }
    }
}
