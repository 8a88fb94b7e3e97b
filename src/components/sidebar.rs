//! Note list sidebar.

use dioxus::prelude::*;

use defranotes_core::types::Note;

/// Compact date shown under each note title; falls back to the raw string
/// when the store hands back something unparseable
fn short_date(iso: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(iso)
        .map(|t| t.format("%b %e, %H:%M").to_string())
        .unwrap_or_else(|_| iso.to_string())
}

/// One row in the note list.
///
/// # Props
///
/// * `note` - The note to display
/// * `active` - Whether this note is currently open
/// * `on_select` - Called with the docID when clicked
#[component]
pub fn NoteRow(note: Note, active: bool, on_select: EventHandler<String>) -> Element {
    let doc_id = note.doc_id.clone();
    let row_class = if active { "note-row active" } else { "note-row" };
    let title = if note.title.trim().is_empty() {
        "Untitled".to_string()
    } else {
        note.title.clone()
    };

    rsx! {
        button {
            class: "{row_class}",
            onclick: move |_| on_select.call(doc_id.clone()),
            span { class: "note-row-title", "{title}" }
            span { class: "note-row-date", "{short_date(&note.updated_at)}" }
        }
    }
}

/// Sidebar listing every note with a create button.
///
/// # Props
///
/// * `notes` - Notes in store arrival order
/// * `active_doc_id` - docID of the open note, if any
/// * `on_select` - Called with the docID of a clicked note
/// * `on_create` - Called when the new-note button is clicked
#[component]
pub fn Sidebar(
    notes: Vec<Note>,
    active_doc_id: Option<String>,
    on_select: EventHandler<String>,
    on_create: EventHandler<()>,
) -> Element {
    rsx! {
        aside { class: "sidebar",
            div { class: "sidebar-header",
                h2 { class: "sidebar-title", "Notes" }
                button {
                    class: "btn-primary",
                    onclick: move |_| on_create.call(()),
                    "+ New Note"
                }
            }
            div { class: "note-list",
                if notes.is_empty() {
                    p { class: "empty-state", "No notes yet. Create your first note." }
                } else {
                    for note in notes {
                        NoteRow {
                            key: "{note.doc_id}",
                            active: active_doc_id.as_deref() == Some(note.doc_id.as_str()),
                            note: note.clone(),
                            on_select: on_select,
                        }
                    }
                }
            }
        }
    }
}
