use std::sync::Arc;

use voxline_core::{OauthBridge, RecordingStore};

/// Process-wide shell state. The two components share nothing and never
/// call each other; they only live side by side here.
pub struct AppState {
    pub recordings: RecordingStore,
    pub oauth: Arc<OauthBridge>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            recordings: RecordingStore::open_default(),
            oauth: Arc::new(OauthBridge::new()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
