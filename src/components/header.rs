//! Workspace header with the sync-status badge and peer controls.

use dioxus::prelude::*;

use defranotes_core::types::{PeerConnectionState, SyncStatus};

/// CSS class and label for the status badge
fn status_badge(status: &SyncStatus, offline: bool) -> (&'static str, String) {
    if offline && !matches!(status, SyncStatus::Offline) {
        return ("status-badge error", "Store unreachable".to_string());
    }
    match status {
        SyncStatus::Connecting => ("status-badge connecting", "Connecting...".to_string()),
        SyncStatus::Synced => ("status-badge synced", "Synced".to_string()),
        SyncStatus::Syncing => ("status-badge syncing", "Syncing...".to_string()),
        SyncStatus::Error(msg) => ("status-badge error", format!("Error: {}", msg)),
        SyncStatus::Offline => ("status-badge offline", "Offline".to_string()),
    }
}

/// Peer indicator: loading, active replication, identity only, or nothing
fn peer_indicator(peer: &PeerConnectionState) -> (&'static str, &'static str) {
    if peer.is_peer_loading {
        ("peer-dot loading", "Looking for peers...")
    } else if peer.has_peer_connections {
        ("peer-dot active", "Replicating")
    } else if peer.is_peer_connected {
        ("peer-dot idle", "Node online")
    } else {
        ("peer-dot offline", "No peers")
    }
}

/// Top bar: app name, sync status, peer indicator, user name.
///
/// # Props
///
/// * `status` - Current sync status from the engine
/// * `offline` - Whether the store was determined unreachable
/// * `peer` - Peer connection state from the bridge
/// * `user_name` - Display name of the local user
/// * `on_peer_dialog` - Called when the peers button is clicked
#[component]
pub fn Header(
    status: SyncStatus,
    offline: bool,
    peer: PeerConnectionState,
    user_name: String,
    on_peer_dialog: EventHandler<()>,
) -> Element {
    let (badge_class, badge_label) = status_badge(&status, offline);
    let (dot_class, dot_label) = peer_indicator(&peer);

    rsx! {
        header { class: "app-header",
            h1 { class: "app-title", "DefraNotes" }
            div { class: "header-status",
                span { class: "{badge_class}", title: "{badge_label}", "{badge_label}" }
                button {
                    class: "peer-button",
                    onclick: move |_| on_peer_dialog.call(()),
                    span { class: "{dot_class}" }
                    "{dot_label}"
                }
                span { class: "user-name", "{user_name}" }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_badge_classes() {
        let (class, label) = status_badge(&SyncStatus::Synced, false);
        assert_eq!(class, "status-badge synced");
        assert_eq!(label, "Synced");

        let (class, _) = status_badge(&SyncStatus::Error("boom".into()), false);
        assert_eq!(class, "status-badge error");

        // Degraded session shows unreachable even while a poll retries
        let (class, label) = status_badge(&SyncStatus::Syncing, true);
        assert_eq!(class, "status-badge error");
        assert_eq!(label, "Store unreachable");
    }

    #[test]
    fn test_peer_indicator_precedence() {
        let mut peer = PeerConnectionState::default();
        assert_eq!(peer_indicator(&peer).0, "peer-dot loading");

        peer.is_peer_loading = false;
        assert_eq!(peer_indicator(&peer).0, "peer-dot offline");

        peer.is_peer_connected = true;
        assert_eq!(peer_indicator(&peer).0, "peer-dot idle");

        peer.has_peer_connections = true;
        assert_eq!(peer_indicator(&peer).0, "peer-dot active");
    }
}
