//! OAuth bridge for the provider's implicit flow.
//!
//! The provider returns the access token in the URL fragment of a redirect
//! page, and fragments are visible only to script running inside that page's
//! own window. The bridge therefore serves the redirect target from a
//! loopback listener (see [`listener`]), opens one secondary window per
//! authorization request, and extracts the token through on-demand script
//! evaluation in that window.
//!
//! Flow per request:
//! 1. the shell opens a secondary window at the caller-supplied URL and
//!    registers it here, keyed by request id;
//! 2. the callback page, once loaded, acknowledges readiness to the
//!    listener, which broadcasts to every pending request;
//! 3. each pending request asks its own window to report the token it stored
//!    in per-window session storage; delivery comes back through the
//!    listener keyed by request id, so concurrent flows never cross;
//! 4. the first non-empty token resolves the request exactly once: the
//!    window is closed, the registration removed, and the caller unblocked.
//!
//! Closing the window before capture cancels the request; a per-request
//! deadline bounds how long an unresponsive provider can hold it.

pub mod listener;

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::OnceCell;
use tokio::sync::oneshot;

use crate::error::{Error, Result};

/// Default deadline for a pending authorization request.
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(300);

/// Host-side handle to a secondary authorization window.
///
/// The broker owns one per pending request. It never reads the window
/// directly; it can only fire a token-report script into it (delivery comes
/// back through the loopback listener) and close it.
pub trait AuthWindow: Send + Sync {
    /// Ask the window to report its captured token, tagged with the request
    /// id. Before the redirect has happened this evaluates against the
    /// provider's page, where the report hook does not exist, and is a no-op.
    ///
    /// Called with the broker's pending list locked: implementations must
    /// hand the report off (script evaluation, channel send) rather than
    /// call back into the broker synchronously.
    fn request_token_report(&self, request_id: u64);

    /// Close the window once the request reaches a terminal state.
    fn close(&self);
}

/// One outstanding authorization request. Presence in the broker's pending
/// list is what "unresolved" means; removal is the exactly-once transition
/// to a terminal state.
struct PendingAuthorization {
    id: u64,
    window: Arc<dyn AuthWindow>,
    verdict: oneshot::Sender<Result<String>>,
}

/// Observer registry for pending authorization requests, keyed by request
/// id. Shared process-wide state with process lifetime.
pub struct AuthBroker {
    pending: Mutex<Vec<PendingAuthorization>>,
    next_id: AtomicU64,
    timeout: Duration,
}

impl AuthBroker {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_AUTH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            timeout,
        }
    }

    /// Reserve a request id. Ids are allocated before registration so the
    /// shell can label the secondary window with the id it will register.
    pub fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Register a secondary window under a previously allocated id and get
    /// the receiver for the request's verdict. Callers should pass the
    /// receiver to [`AuthBroker::wait`].
    pub fn register(
        &self,
        id: u64,
        window: Arc<dyn AuthWindow>,
    ) -> oneshot::Receiver<Result<String>> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().push(PendingAuthorization {
            id,
            window,
            verdict: tx,
        });
        tracing::debug!(request_id = id, "registered pending authorization");
        rx
    }

    /// Block until the request resolves or its deadline expires.
    pub async fn wait(&self, id: u64, rx: oneshot::Receiver<Result<String>>) -> Result<String> {
        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(_)) => Err(Error::Listener(
                "pending authorization dropped without a verdict".into(),
            )),
            Err(_) => {
                self.expire(id);
                Err(Error::TimedOut)
            }
        }
    }

    /// Broadcast fired when a callback page acknowledges it has loaded.
    ///
    /// Every pending request asks its own window for the token; the listener
    /// carries no per-request state, so the broadcast is purely a trigger
    /// and safe to fire any number of times.
    pub fn notify_callback_ready(&self) {
        let pending = self.pending.lock().unwrap();
        tracing::debug!(pending = pending.len(), "callback page ready, polling windows");
        for entry in pending.iter() {
            entry.window.request_token_report(entry.id);
        }
    }

    /// Deliver a token reported by a window. The first non-empty token for a
    /// still-pending id resolves it; everything else is a no-op. Returns
    /// whether this delivery resolved the request.
    pub fn deliver_token(&self, id: u64, token: &str) -> bool {
        if token.is_empty() {
            // The window was asked before its redirect stored anything.
            return false;
        }
        let Some(entry) = self.remove(id) else {
            return false;
        };
        entry.window.close();
        let _ = entry.verdict.send(Ok(token.to_string()));
        tracing::info!(request_id = id, "authorization resolved");
        true
    }

    /// The user closed the secondary window before a token was captured.
    /// Deregisters the request so a later broadcast cannot touch it.
    pub fn cancel(&self, id: u64) {
        if let Some(entry) = self.remove(id) {
            let _ = entry.verdict.send(Err(Error::UserCancelled));
            tracing::info!(request_id = id, "authorization cancelled by user");
        }
    }

    /// Deadline expiry: close the abandoned window and deregister.
    fn expire(&self, id: u64) {
        if let Some(entry) = self.remove(id) {
            entry.window.close();
            tracing::warn!(request_id = id, "authorization timed out");
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    fn remove(&self, id: u64) -> Option<PendingAuthorization> {
        let mut pending = self.pending.lock().unwrap();
        let index = pending.iter().position(|entry| entry.id == id)?;
        Some(pending.remove(index))
    }
}

impl Default for AuthBroker {
    fn default() -> Self {
        Self::new()
    }
}

/// How this process relates to the loopback listener.
enum ListenerMode {
    /// We bound the port and hold the shutdown handle.
    Owned(Mutex<Option<oneshot::Sender<()>>>),
    /// The port was already bound, presumably by a prior instance of this
    /// process serving the same callback page. Tolerated with a diagnostic;
    /// if the occupant is anything else, OAuth is broken until it goes away.
    Shared,
}

/// The OAuth bridge: the broker plus the lazily started, at-most-once
/// loopback listener and its shutdown handle.
pub struct OauthBridge {
    broker: Arc<AuthBroker>,
    port: u16,
    listener: OnceCell<ListenerMode>,
}

impl OauthBridge {
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_AUTH_TIMEOUT, listener::CALLBACK_PORT)
    }

    pub fn with_settings(timeout: Duration, port: u16) -> Self {
        Self {
            broker: Arc::new(AuthBroker::with_timeout(timeout)),
            port,
            listener: OnceCell::new(),
        }
    }

    pub fn broker(&self) -> &Arc<AuthBroker> {
        &self.broker
    }

    /// The URL the authorization provider must redirect to.
    pub fn callback_url(&self) -> String {
        format!("http://127.0.0.1:{}{}", self.port, listener::CALLBACK_PATH)
    }

    /// Start the loopback listener if this process has not already done so.
    /// A port owned by someone else is tolerated (see [`ListenerMode`]);
    /// any other bind failure is fatal to the OAuth request.
    pub async fn ensure_listener(&self) -> Result<()> {
        self.listener
            .get_or_try_init(|| async {
                match listener::start(self.broker.clone(), self.port).await {
                    Ok(handle) => Ok(ListenerMode::Owned(Mutex::new(Some(handle.shutdown)))),
                    Err(Error::PortInUse(port)) => {
                        tracing::warn!(
                            port,
                            "callback port already bound; assuming a prior instance serves it"
                        );
                        Ok(ListenerMode::Shared)
                    }
                    Err(e) => Err(e),
                }
            })
            .await?;
        Ok(())
    }

    /// Stop the listener at process teardown. No-op if we never bound it.
    pub fn shutdown(&self) {
        if let Some(ListenerMode::Owned(slot)) = self.listener.get()
            && let Some(tx) = slot.lock().unwrap().take()
        {
            let _ = tx.send(());
        }
    }
}

impl Default for OauthBridge {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeWindow;
    use super::*;

    fn begin(broker: &AuthBroker) -> (u64, Arc<FakeWindow>, oneshot::Receiver<Result<String>>) {
        let id = broker.allocate_id();
        let window = Arc::new(FakeWindow::default());
        let rx = broker.register(id, window.clone());
        (id, window, rx)
    }

    #[tokio::test]
    async fn test_token_delivered_exactly_once() {
        let broker = AuthBroker::new();
        let (id, window, rx) = begin(&broker);

        // Two broadcasts before any token is stored: each polls the window.
        broker.notify_callback_ready();
        broker.notify_callback_ready();
        assert_eq!(*window.report_requests.lock().unwrap(), vec![id, id]);

        assert!(broker.deliver_token(id, "tok-123"));
        assert!(!broker.deliver_token(id, "tok-123"), "second delivery is a no-op");
        assert!(window.is_closed());
        assert_eq!(broker.pending_count(), 0);
        assert_eq!(rx.await.unwrap().unwrap(), "tok-123");
    }

    #[tokio::test]
    async fn test_empty_token_leaves_request_pending() {
        let broker = AuthBroker::new();
        let (id, window, _rx) = begin(&broker);

        assert!(!broker.deliver_token(id, ""));
        assert_eq!(broker.pending_count(), 1);
        assert!(!window.is_closed());
    }

    #[tokio::test]
    async fn test_cancel_beats_later_signal() {
        let broker = AuthBroker::new();
        let (id, window, rx) = begin(&broker);

        broker.cancel(id);
        assert!(matches!(rx.await.unwrap(), Err(Error::UserCancelled)));

        // A broadcast after cancellation must not touch the dead window.
        broker.notify_callback_ready();
        assert!(window.report_requests.lock().unwrap().is_empty());
        assert!(!broker.deliver_token(id, "late"));
    }

    #[tokio::test]
    async fn test_concurrent_requests_resolve_independently() {
        let broker = AuthBroker::new();
        let (id_a, win_a, rx_a) = begin(&broker);
        let (id_b, win_b, rx_b) = begin(&broker);

        broker.notify_callback_ready();
        assert_eq!(*win_a.report_requests.lock().unwrap(), vec![id_a]);
        assert_eq!(*win_b.report_requests.lock().unwrap(), vec![id_b]);

        assert!(broker.deliver_token(id_b, "token-b"));
        assert!(broker.deliver_token(id_a, "token-a"));

        assert_eq!(rx_a.await.unwrap().unwrap(), "token-a");
        assert_eq!(rx_b.await.unwrap().unwrap(), "token-b");
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expires_pending_request() {
        let broker = AuthBroker::with_timeout(Duration::from_secs(5));
        let (id, window, rx) = begin(&broker);

        let verdict = broker.wait(id, rx).await;
        assert!(matches!(verdict, Err(Error::TimedOut)));
        assert!(window.is_closed());
        assert_eq!(broker.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_wait_returns_delivered_token() {
        let broker = Arc::new(AuthBroker::new());
        let (id, _window, rx) = begin(&broker);

        let deliverer = broker.clone();
        tokio::spawn(async move {
            deliverer.notify_callback_ready();
            deliverer.deliver_token(id, "tok");
        });

        assert_eq!(broker.wait(id, rx).await.unwrap(), "tok");
    }
}
