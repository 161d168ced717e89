//! Tauri command handlers, organized by domain.
//!
//! These are thin request/response adapters over `voxline-core`; every
//! failure surfaces to the UI as a rejected invocation carrying the core
//! error's message.

mod oauth;
mod recordings;
mod system;

pub use oauth::*;
pub use recordings::*;
pub use system::*;
