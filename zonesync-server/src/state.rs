//! Shared application state for the master API.

use zonesync_core::RecordStore;

/// Handed to every request handler. Cloning is cheap: the store is a pool
/// handle, and each request checks a connection out for its duration only.
#[derive(Clone)]
pub struct AppState {
    pub store: RecordStore,
    /// TTL applied to writes that do not carry one.
    pub default_ttl: i64,
}

impl AppState {
    pub fn new(store: RecordStore, default_ttl: i64) -> Self {
        Self { store, default_ttl }
    }
}
