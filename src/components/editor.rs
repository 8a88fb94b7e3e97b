//! Note editor: title input, body textarea, and commit history footer.

use dioxus::prelude::*;

use crate::context::use_engine;

/// Editor pane for the open note.
///
/// Title and content come from the engine's display state, so accepted
/// remote merges flow in while the user's own keystrokes go out through
/// the edit handlers.
///
/// # Props
///
/// * `active_doc_id` - docID of the open note; renders a placeholder when `None`
/// * `title` - Displayed title
/// * `content` - Displayed body content
/// * `on_title` - Called with the full title on every keystroke
/// * `on_body` - Called with the full body on every keystroke
#[component]
pub fn Editor(
    active_doc_id: Option<String>,
    title: String,
    content: String,
    on_title: EventHandler<String>,
    on_body: EventHandler<String>,
) -> Element {
    let Some(doc_id) = active_doc_id else {
        return rsx! {
            main { class: "editor editor-empty",
                p { class: "empty-state", "No note selected" }
            }
        };
    };

    rsx! {
        main { class: "editor",
            input {
                class: "editor-title",
                value: "{title}",
                placeholder: "Untitled",
                oninput: move |e| on_title.call(e.value()),
            }
            textarea {
                class: "editor-body",
                value: "{content}",
                placeholder: "Start writing...",
                oninput: move |e| on_body.call(e.value()),
            }
            NoteHistory { doc_id: doc_id }
        }
    }
}

/// Latest commits for the open note, from the store's history.
///
/// Refetches whenever the open note changes. Failures render nothing; the
/// history is informational.
#[component]
pub fn NoteHistory(doc_id: String) -> Element {
    let engine = use_engine();

    let history = use_resource(use_reactive!(|(doc_id,)| async move {
        let shared = engine();
        let guard = shared.read().await;
        let Some(eng) = guard.as_ref() else {
            return (None, Vec::new());
        };
        let height = eng
            .fetch_version(&doc_id)
            .await
            .ok()
            .flatten()
            .and_then(|note| note.latest_version().map(|v| v.height));
        let commits = eng.fetch_commits(&doc_id).await.unwrap_or_default();
        (height, commits)
    }));

    let (height, commits) = history.read_unchecked().clone().unwrap_or_default();
    if height.is_none() && commits.is_empty() {
        return rsx! {};
    }

    rsx! {
        footer { class: "note-history",
            span { class: "note-history-label", "History" }
            if let Some(height) = height {
                span { class: "note-history-entry", "v{height}" }
            }
            for commit in commits.iter().take(3) {
                span {
                    class: "note-history-entry",
                    title: "{commit.cid}",
                    "h{commit.height} {truncate_cid(&commit.cid)}"
                }
            }
        }
    }
}

fn truncate_cid(cid: &str) -> String {
    if cid.len() <= 12 {
        cid.to_string()
    } else {
        format!("{}\u{2026}", &cid[..12])
    }
}
