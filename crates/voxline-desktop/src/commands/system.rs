//! Shell-level delegations to the host OS.

use tauri::{AppHandle, State};
use tauri_plugin_opener::OpenerExt;

use crate::state::AppState;

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenExternalResponse {
    pub success: bool,
}

/// Open a URL in the user's default browser.
#[tauri::command]
pub async fn open_external(app: AppHandle, url: String) -> Result<OpenExternalResponse, String> {
    app.opener()
        .open_url(url, None::<&str>)
        .map_err(|e| e.to_string())?;
    Ok(OpenExternalResponse { success: true })
}

/// The canonical recordings directory, for the UI to display and for
/// external tooling to browse.
#[tauri::command]
pub fn get_downloads_path(state: State<'_, AppState>) -> String {
    state.recordings.root().to_string_lossy().to_string()
}
