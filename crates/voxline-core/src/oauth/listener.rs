//! Loopback HTTP listener for the OAuth callback page.
//!
//! Bound only to 127.0.0.1 on a fixed port, started lazily at most once per
//! process. Serves a single static success page at the callback path; the
//! page's own script is the only thing that can see the URL fragment, so it
//! parses the token out, stashes it in per-window session storage, and
//! acknowledges readiness back to this listener. Everything else is 404.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use super::AuthBroker;
use crate::error::{Error, Result};

/// Fixed local port the provider's redirect URI is registered against.
pub const CALLBACK_PORT: u16 = 17895;

/// Redirect target served with the success page.
pub const CALLBACK_PATH: &str = "/oauth2callback";

/// Positive acknowledgment from a loaded callback page. Replaces the old
/// fixed settle delay: the page tells us when its script has run instead of
/// us guessing.
pub const READY_PATH: &str = "/oauth2ready";

/// Token reports from windows answering a broadcast, keyed by request id.
pub const TOKEN_PATH: &str = "/oauth2token";

/// Session-storage key the success page stores the extracted token under.
/// Per-window and non-persisted, so concurrent flows stay isolated.
pub const TOKEN_STORAGE_KEY: &str = "voxline.oauth.token";

const SUCCESS_PAGE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>Voxline sign-in complete</title>
</head>
<body>
<p>Sign-in complete. You can close this window.</p>
<script>
(function () {
  "use strict";
  var params = new URLSearchParams(window.location.hash.replace(/^#/, ""));
  var token = params.get("access_token") || "";
  if (token) {
    sessionStorage.setItem("voxline.oauth.token", token);
  }
  fetch("/oauth2ready", { method: "POST" });
  window.__voxlineReportToken = function (requestId) {
    fetch("/oauth2token", {
      method: "POST",
      headers: { "content-type": "application/json" },
      body: JSON.stringify({
        requestId: requestId,
        token: sessionStorage.getItem("voxline.oauth.token") || ""
      })
    });
  };
})();
</script>
</body>
</html>
"#;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenReport {
    request_id: u64,
    #[serde(default)]
    token: String,
}

/// The callback routes over a shared broker. The listener carries no
/// per-request state of its own.
pub fn router(broker: Arc<AuthBroker>) -> Router {
    Router::new()
        .route(CALLBACK_PATH, get(success_page))
        .route(READY_PATH, post(callback_ready))
        .route(TOKEN_PATH, post(report_token))
        .fallback(not_found)
        .with_state(broker)
}

async fn success_page() -> Html<&'static str> {
    Html(SUCCESS_PAGE)
}

async fn callback_ready(State(broker): State<Arc<AuthBroker>>) -> StatusCode {
    broker.notify_callback_ready();
    StatusCode::NO_CONTENT
}

async fn report_token(
    State(broker): State<Arc<AuthBroker>>,
    Json(report): Json<TokenReport>,
) -> StatusCode {
    broker.deliver_token(report.request_id, &report.token);
    StatusCode::NO_CONTENT
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Handle to a listener this process bound. Dropping the sender, or sending
/// on it, stops the serve loop.
pub struct ListenerHandle {
    pub(crate) shutdown: oneshot::Sender<()>,
}

/// Bind the loopback port and serve the callback routes in the background.
/// `AddrInUse` is distinguished as [`Error::PortInUse`] so the bridge can
/// decide whether to tolerate it.
pub async fn start(broker: Arc<AuthBroker>, port: u16) -> Result<ListenerHandle> {
    let listener = TcpListener::bind(("127.0.0.1", port))
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AddrInUse => Error::PortInUse(port),
            _ => Error::Listener(format!("failed to bind callback port {port}: {e}")),
        })?;
    tracing::info!(port, "oauth callback listener bound");

    let (tx, rx) = oneshot::channel::<()>();
    let app = router(broker);
    tokio::spawn(async move {
        let serve = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = rx.await;
        });
        if let Err(e) = serve.await {
            tracing::error!(error = %e, "oauth callback listener failed");
        }
    });

    Ok(ListenerHandle { shutdown: tx })
}
