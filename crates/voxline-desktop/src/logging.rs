//! Tracing setup for the shell.
//!
//! Logs go to stderr; the level is controlled by `RUST_LOG` and defaults to
//! `info`. Console output from the hosted UI is forwarded by the webview
//! itself and is not routed through here.

use tracing_subscriber::EnvFilter;

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
