//! UI components for DefraNotes.

mod editor;
mod header;
mod peer_dialog;
mod sidebar;

pub use editor::{Editor, NoteHistory};
pub use header::Header;
pub use peer_dialog::PeerDialog;
pub use sidebar::Sidebar;
