pub mod error;
pub mod oauth;
pub mod recordings;

pub use error::{Error, Result};
pub use oauth::{AuthBroker, AuthWindow, OauthBridge, listener};
pub use recordings::{DataUrl, DeleteOutcome, RecordingStore, mime_for};
