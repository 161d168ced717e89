//! OAuth window command.
//!
//! Opens one secondary window per authorization request and drives it
//! through the core broker. The window is pointed at the caller-supplied
//! authorization URL, which this shell treats as opaque.

use std::sync::Arc;

use tauri::{AppHandle, State, WebviewUrl, WebviewWindow, WebviewWindowBuilder};
use voxline_core::AuthWindow;

use crate::state::AppState;

/// Secondary-window handle the broker drives. Script evaluation is fire and
/// forget; the callback page reports the token back through the loopback
/// listener, tagged with the request id.
struct OauthWindow {
    window: WebviewWindow,
}

impl AuthWindow for OauthWindow {
    fn request_token_report(&self, request_id: u64) {
        // Before the provider redirects, the report hook does not exist in
        // the window and this evaluates to nothing.
        let script =
            format!("window.__voxlineReportToken && window.__voxlineReportToken({request_id});");
        if let Err(e) = self.window.eval(&script) {
            tracing::warn!(request_id, error = %e, "token report evaluation failed");
        }
    }

    fn close(&self) {
        let _ = self.window.close();
    }
}

/// Open a secondary authorization window and resolve with the captured
/// access token. Rejects when the user closes the window without signing
/// in, or when the request outlives its deadline.
#[tauri::command]
pub async fn open_oauth_window(
    app: AppHandle,
    state: State<'_, AppState>,
    auth_url: String,
) -> Result<String, String> {
    let bridge = state.oauth.clone();
    bridge.ensure_listener().await.map_err(|e| e.to_string())?;

    let url: tauri::Url = auth_url
        .parse()
        .map_err(|e| format!("invalid authorization URL: {e}"))?;

    let broker = bridge.broker().clone();
    let id = broker.allocate_id();

    let window = WebviewWindowBuilder::new(&app, format!("oauth-{id}"), WebviewUrl::External(url))
        .title("Sign in")
        .inner_size(480.0, 720.0)
        .incognito(true)
        .build()
        .map_err(|e| e.to_string())?;

    let rx = broker.register(
        id,
        Arc::new(OauthWindow {
            window: window.clone(),
        }),
    );

    let close_broker = broker.clone();
    window.on_window_event(move |event| {
        if matches!(event, tauri::WindowEvent::Destroyed) {
            // No-op when the request already resolved and the broker closed
            // the window itself; otherwise the user closed it early.
            close_broker.cancel(id);
        }
    });

    tracing::info!(request_id = id, "authorization window opened");
    broker.wait(id, rx).await.map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_report_script_guards_missing_hook() {
        let script = format!("window.__voxlineReportToken && window.__voxlineReportToken({});", 7);
        assert_eq!(
            script,
            "window.__voxlineReportToken && window.__voxlineReportToken(7);"
        );
    }
}
