//! Remote Access Layer: request/response and polling-based
//! pseudo-subscription operations against the DefraDB query endpoint.

pub mod client;
pub mod poller;

pub use client::{DefraClient, RemoteStore, DEFAULT_ENDPOINT};
pub use poller::{PollHandle, Poller, LIST_POLL_INTERVAL, NOTE_POLL_INTERVAL};
