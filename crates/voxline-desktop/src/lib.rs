//! Voxline desktop shell.
//!
//! Hosts the browser-based softphone UI and exposes the recording store and
//! OAuth bridge from `voxline-core` as Tauri commands. Window creation and
//! styling stay in the static config; everything with real semantics lives
//! in the core crate.

mod commands;
mod logging;
mod state;

pub use state::AppState;

use tauri::Manager;

pub fn run() {
    logging::init();

    tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|app, _args, _cwd| {
            if let Some(window) = app.get_webview_window("main") {
                let _ = window.show();
                let _ = window.set_focus();
            }
        }))
        .plugin(tauri_plugin_opener::init())
        .manage(AppState::new())
        .invoke_handler(tauri::generate_handler![
            commands::save_recording,
            commands::play_recording,
            commands::get_recording_file_url,
            commands::get_downloads_path,
            commands::delete_recording_file,
            commands::open_external,
            commands::open_oauth_window,
        ])
        .on_window_event(|window, event| {
            if window.label() == "main" && matches!(event, tauri::WindowEvent::Destroyed) {
                // Main window teardown stops the loopback listener if this
                // process owns it.
                window.app_handle().state::<AppState>().oauth.shutdown();
            }
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
