//! Tauri window, menu and IPC commands around a [`Workspace`].

pub mod commands;
pub mod menu;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use tauri::{Emitter, Manager, RunEvent};

use crate::content::{read_payload, LoadTicket};
use crate::error::NoteError;
use crate::filesystem::AppPaths;
use crate::preferences::PreferenceStore;
use crate::tree::build_tree_async;
use crate::workspace::{TreeTicket, Workspace};

/// Event telling the webview to re-read the workspace views.
pub const WORKSPACE_CHANGED: &str = "workspace-changed";

/// Managed state shared by every command.
///
/// The workspace lock is never held across an await: directory scans and
/// file reads run unlocked and their results are applied afterwards.
pub struct AppState {
    workspace: Mutex<Workspace>,
    preferences: Arc<PreferenceStore>,
}

impl AppState {
    pub fn new(preferences: Arc<PreferenceStore>) -> Self {
        Self {
            workspace: Mutex::new(Workspace::new(preferences.clone())),
            preferences,
        }
    }

    pub fn workspace(&self) -> MutexGuard<'_, Workspace> {
        self.workspace
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Scans `root` off the async threads and makes it the open folder.
    pub async fn load_folder(&self, root: PathBuf) -> Result<(), NoteError> {
        let ticket = self.workspace().begin_open(root);
        self.build_tree(ticket).await
    }

    pub async fn reload(&self) -> Result<(), NoteError> {
        let ticket = self.workspace().begin_reload()?;
        self.build_tree(ticket).await
    }

    /// A build overtaken by a newer one is dropped without error.
    async fn build_tree(&self, ticket: TreeTicket) -> Result<(), NoteError> {
        let result = build_tree_async(ticket.root().to_path_buf()).await;
        let applied = self.workspace().apply_tree(ticket, result);
        self.preferences.schedule_save().await;
        applied.map(|_| ())
    }

    /// Performs the read for `ticket` and hands the result back.
    pub async fn load_content(&self, ticket: Option<LoadTicket>) {
        let Some(ticket) = ticket else {
            return;
        };
        let file = ticket.file().clone();
        let outcome = tokio::spawn(async move { read_payload(&file).await })
            .await
            .map_err(|e| e.to_string());
        self.workspace().complete_load(ticket, outcome);
    }

    pub async fn save_preferences(&self) {
        self.preferences.schedule_save().await;
    }
}

/// Tells the webview something changed outside of a command it issued.
pub fn notify_changed<R: tauri::Runtime>(app: &tauri::AppHandle<R>) {
    if let Err(e) = app.emit(WORKSPACE_CHANGED, ()) {
        log::error!("Failed to emit {}: {}", WORKSPACE_CHANGED, e);
    }
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|app, _args, _cwd| {
            // Focus the main window when a second instance is launched
            if let Some(window) = app.get_webview_window("main") {
                let _ = window.set_focus();
                let _ = window.unminimize();
            }
        }))
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            let paths = AppPaths::new()?;
            paths.ensure_directories()?;
            let preferences = Arc::new(PreferenceStore::new(paths.preferences_file)?);
            let state = AppState::new(preferences);
            let remembered = state.workspace().remembered_folder();
            app.manage(state);

            menu::setup_menu(app.handle())?;

            if let Some(root) = remembered {
                let handle = app.handle().clone();
                tauri::async_runtime::spawn(async move {
                    let state = handle.state::<AppState>();
                    match state.load_folder(root).await {
                        Ok(()) => notify_changed(&handle),
                        Err(e) => log::warn!("Could not restore last folder: {}", e),
                    }
                });
            }
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::open_folder,
            commands::load_folder,
            commands::reload_folder,
            commands::get_tree,
            commands::toggle_folder,
            commands::select_file,
            commands::clear_selection,
            commands::get_content,
            commands::update_content,
            commands::save_file,
            commands::create_file,
            commands::rename_file,
            commands::toggle_preview,
            commands::set_preview,
            commands::toggle_sidebar,
            commands::adjust_font_size,
            commands::get_preferences,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(|app, event| {
        if let RunEvent::Exit = event {
            let state = app.state::<AppState>();
            if let Err(e) = state.preferences.save_sync() {
                log::error!("Failed to save preferences on exit: {}", e);
            }
        }
    });
}
