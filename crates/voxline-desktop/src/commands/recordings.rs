//! Recording store commands.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tauri::{AppHandle, State};
use tauri_plugin_opener::OpenerExt;
use voxline_core::DeleteOutcome;

use crate::state::AppState;

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingFileResponse {
    pub success: bool,
    pub file_path: String,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingUrlResponse {
    pub success: bool,
    pub url: String,
    pub file_path: String,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRecordingResponse {
    pub success: bool,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn decode_content(content: &str) -> Result<Vec<u8>, String> {
    BASE64
        .decode(content.as_bytes())
        .map_err(|e| format!("invalid base64 recording content: {e}"))
}

/// Persist a base64-encoded recording blob under a caller-chosen filename.
///
/// The UI supplies a MIME type for symmetry with the web recorder API, but
/// it is not persisted; playback type is re-inferred from the extension.
/// Saving an existing filename overwrites it silently.
#[allow(unused_variables)]
#[tauri::command]
pub async fn save_recording(
    state: State<'_, AppState>,
    filename: String,
    content: String,
    mime_type: Option<String>,
) -> Result<RecordingFileResponse, String> {
    let bytes = decode_content(&content)?;
    let store = state.recordings.clone();
    let path = tauri::async_runtime::spawn_blocking(move || store.save(&filename, &bytes))
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| e.to_string())?;

    Ok(RecordingFileResponse {
        success: true,
        file_path: path.to_string_lossy().to_string(),
    })
}

/// Hand a stored recording to the host OS default file-association handler.
/// This is a delegation, not in-app playback.
#[tauri::command]
pub async fn play_recording(
    app: AppHandle,
    state: State<'_, AppState>,
    filename: String,
) -> Result<RecordingFileResponse, String> {
    let path = state.recordings.resolve(&filename).map_err(|e| e.to_string())?;
    let path_str = path.to_string_lossy().to_string();
    app.opener()
        .open_path(path_str.clone(), None::<&str>)
        .map_err(|e| e.to_string())?;

    Ok(RecordingFileResponse {
        success: true,
        file_path: path_str,
    })
}

/// Render a stored recording as a self-contained `data:` URI the UI can use
/// directly as a playback source.
#[tauri::command]
pub async fn get_recording_file_url(
    state: State<'_, AppState>,
    filename: String,
) -> Result<RecordingUrlResponse, String> {
    let store = state.recordings.clone();
    let data = tauri::async_runtime::spawn_blocking(move || store.data_url(&filename))
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| e.to_string())?;

    Ok(RecordingUrlResponse {
        success: true,
        url: data.url,
        file_path: data.path.to_string_lossy().to_string(),
    })
}

/// Delete a recording. Deleting an absent file succeeds with an
/// informational message rather than rejecting.
#[tauri::command]
pub async fn delete_recording_file(
    state: State<'_, AppState>,
    filename: String,
) -> Result<DeleteRecordingResponse, String> {
    let outcome = state.recordings.delete(&filename).map_err(|e| e.to_string())?;
    let file_path = state
        .recordings
        .root()
        .join(&filename)
        .to_string_lossy()
        .to_string();

    Ok(DeleteRecordingResponse {
        success: true,
        file_path,
        message: match outcome {
            DeleteOutcome::Removed => None,
            DeleteOutcome::AlreadyAbsent => Some("recording already absent".to_string()),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_content_rejects_invalid_base64() {
        assert!(decode_content("not-valid-base64!!!").is_err());
        assert_eq!(decode_content("aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn test_responses_serialize_camel_case() {
        let value = serde_json::to_value(RecordingFileResponse {
            success: true,
            file_path: "/tmp/a.wav".into(),
        })
        .unwrap();
        assert!(value.get("filePath").is_some());

        let value = serde_json::to_value(DeleteRecordingResponse {
            success: true,
            file_path: "/tmp/a.wav".into(),
            message: None,
        })
        .unwrap();
        assert!(value.get("message").is_none(), "absent message is omitted");

        let value = serde_json::to_value(RecordingUrlResponse {
            success: true,
            url: "data:audio/wav;base64,".into(),
            file_path: "/tmp/a.wav".into(),
        })
        .unwrap();
        assert_eq!(value["filePath"], "/tmp/a.wav");
    }
}
