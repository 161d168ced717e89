//! Closed error taxonomy shared by the recording store and the OAuth bridge.
//!
//! Every operation in this crate reports one of these kinds; the desktop
//! shell maps them to rejected IPC invocations with the display message.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The named recording does not exist in the store.
    #[error("recording not found: {0}")]
    NotFound(String),

    /// Disk read/write/delete failure (permissions, full disk, ...).
    #[error("recording storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Caller-supplied input was rejected before touching the filesystem.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The user closed the authorization window before a token was captured.
    #[error("authorization window closed by user")]
    UserCancelled,

    /// The authorization request outlived its deadline.
    #[error("authorization timed out waiting for the provider redirect")]
    TimedOut,

    /// The fixed loopback port is already bound. Usually a prior instance of
    /// this process is serving the callback page; if it is anything else,
    /// OAuth will not work until that listener goes away.
    #[error("loopback callback port {0} is already in use")]
    PortInUse(u16),

    /// The callback listener failed for a reason other than the port being
    /// taken, or a pending request was dropped without a verdict.
    #[error("oauth callback listener error: {0}")]
    Listener(String),
}

pub type Result<T> = std::result::Result<T, Error>;
