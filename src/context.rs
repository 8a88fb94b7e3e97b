//! Engine context provider for DefraNotes.
//!
//! Provides the NotesEngine instance to all components via use_context.
//!
//! ## Usage
//!
//! ```ignore
//! // In child components
//! let engine = use_engine();
//! let refresh = use_refresh();
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use dioxus::prelude::*;
use defranotes_core::NotesEngine;
use tokio::sync::RwLock;

/// Shared engine type for context.
///
/// The engine is wrapped in Arc<RwLock<>> to allow:
/// - Multiple components to read concurrently
/// - Safe mutation from event handlers and the message pump
pub type SharedEngine = Arc<RwLock<Option<NotesEngine>>>;

/// Render-invalidation counter, bumped whenever the engine emits an event.
///
/// Components that snapshot engine state read this inside their
/// `use_resource` closure so the snapshot recomputes on every engine event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshTick(pub u64);

/// Get the data directory for the application.
/// Uses the global data dir set from command line args.
pub fn get_data_dir() -> PathBuf {
    crate::get_data_dir()
}

/// Get the DefraDB query endpoint set from command line args
pub fn get_endpoint() -> String {
    crate::get_endpoint()
}

/// Get the defradb binary path set from command line args
pub fn get_defradb_bin() -> PathBuf {
    crate::get_defradb_bin()
}

/// Hook to access the NotesEngine from context.
///
/// Returns a Signal containing the shared engine state.
///
/// # Example
///
/// ```ignore
/// let engine = use_engine();
///
/// // Read engine state
/// if let Some(ref eng) = *engine.read().await {
///     let notes = eng.notes();
/// }
/// ```
pub fn use_engine() -> Signal<SharedEngine> {
    use_context::<Signal<SharedEngine>>()
}

/// Hook to check if the engine finished its startup sequence.
///
/// True once initialization completed, whether or not the store was
/// reachable; the engine itself carries the offline state.
pub fn use_engine_ready() -> Signal<bool> {
    use_context::<Signal<bool>>()
}

/// Hook to observe the engine event counter
pub fn use_refresh() -> Signal<RefreshTick> {
    use_context::<Signal<RefreshTick>>()
}
