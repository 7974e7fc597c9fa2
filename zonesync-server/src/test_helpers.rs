//! Test helpers for zonesync-server unit tests.

use tempfile::TempDir;

use zonesync_core::RecordStore;

use crate::state::AppState;

/// Create a minimal `AppState` backed by a throwaway SQLite file.
///
/// Returns `(AppState, TempDir)` — keep `TempDir` alive for the test duration.
pub async fn test_app_state() -> (AppState, TempDir) {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let store = RecordStore::connect(&temp_dir.path().join("records.sqlite"))
        .await
        .expect("failed to open test store");

    (AppState::new(store, 3600), temp_dir)
}
