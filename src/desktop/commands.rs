use std::path::PathBuf;

use tauri::{AppHandle, Runtime, State};
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};

use super::AppState;
use crate::content::ContentView;
use crate::error::NoteError;
use crate::models::{ApiResult, PreferencesView, TreeView};

/// Shows a modal error and waits for it to be dismissed.
pub fn show_error<R: Runtime>(app: &AppHandle<R>, title: &str, error: &NoteError) {
    app.dialog()
        .message(error.to_string())
        .title(title)
        .kind(MessageDialogKind::Error)
        .blocking_show();
}

/// Asks for a folder with the native chooser. `None` when cancelled.
pub async fn pick_folder<R: Runtime>(app: &AppHandle<R>) -> Result<Option<PathBuf>, String> {
    let (tx, rx) = tokio::sync::oneshot::channel();
    app.dialog()
        .file()
        .set_title("Open Folder")
        .pick_folder(move |folder| {
            let _ = tx.send(folder);
        });

    match rx.await.ok().flatten() {
        Some(folder) => folder.into_path().map(Some).map_err(|e| e.to_string()),
        None => Ok(None),
    }
}

/// Lets the user choose a folder and opens it.
///
/// Cancelling the chooser is reported as `cancelled`, not as an error.
#[tauri::command]
pub async fn open_folder(app: AppHandle, state: State<'_, AppState>) -> Result<ApiResult, String> {
    let Some(root) = pick_folder(&app).await? else {
        return Ok(ApiResult::cancelled());
    };
    let path = root.to_string_lossy().into_owned();
    match state.load_folder(root).await {
        Ok(()) => Ok(ApiResult::with_path(path)),
        Err(e) => Ok(ApiResult::error(e.to_string())),
    }
}

/// Opens a folder by path, e.g. one remembered by the webview.
///
/// # Arguments
/// * `path` - Absolute path of the folder
#[tauri::command]
pub async fn load_folder(path: String, state: State<'_, AppState>) -> Result<ApiResult, String> {
    match state.load_folder(PathBuf::from(&path)).await {
        Ok(()) => Ok(ApiResult::with_path(path)),
        Err(e) => Ok(ApiResult::error(e.to_string())),
    }
}

/// Re-scans the open folder, keeping expansion and selection where the
/// paths still exist.
#[tauri::command]
pub async fn reload_folder(state: State<'_, AppState>) -> Result<ApiResult, String> {
    match state.reload().await {
        Ok(()) => Ok(ApiResult::success()),
        Err(e) => Ok(ApiResult::error(e.to_string())),
    }
}

#[tauri::command]
pub async fn get_tree(state: State<'_, AppState>) -> Result<TreeView, String> {
    Ok(state.workspace().tree_view())
}

/// Expands or collapses a folder in the sidebar.
///
/// # Arguments
/// * `path` - Path of the folder node
#[tauri::command]
pub async fn toggle_folder(path: String, state: State<'_, AppState>) -> Result<TreeView, String> {
    let mut workspace = state.workspace();
    workspace.toggle_folder(&path).map_err(|e| e.to_string())?;
    Ok(workspace.tree_view())
}

/// Selects a file and loads its content.
///
/// Returns the content view once the load has been applied. If another
/// selection overtook this one the view reflects that newer selection.
///
/// # Arguments
/// * `path` - Path of the file node
#[tauri::command]
pub async fn select_file(path: String, state: State<'_, AppState>) -> Result<ContentView, String> {
    let ticket = state
        .workspace()
        .select_file(&path)
        .map_err(|e| e.to_string())?;
    state.load_content(ticket).await;
    Ok(state.workspace().content_view())
}

#[tauri::command]
pub async fn clear_selection(state: State<'_, AppState>) -> Result<ContentView, String> {
    let mut workspace = state.workspace();
    workspace.clear_selection();
    Ok(workspace.content_view())
}

#[tauri::command]
pub async fn get_content(state: State<'_, AppState>) -> Result<ContentView, String> {
    Ok(state.workspace().content_view())
}

/// Records an edit of the text being shown.
///
/// # Arguments
/// * `content` - The full new text
#[tauri::command]
pub async fn update_content(content: String, state: State<'_, AppState>) -> Result<ApiResult, String> {
    match state.workspace().edit(content) {
        Ok(()) => Ok(ApiResult::success()),
        Err(e) => Ok(ApiResult::error(e.to_string())),
    }
}

/// Writes the edited text to disk. A failed write is also shown to the user
/// in a modal dialog.
#[tauri::command]
pub async fn save_file(app: AppHandle, state: State<'_, AppState>) -> Result<ApiResult, String> {
    let saved = state.workspace().save();
    match saved {
        Ok(()) => Ok(ApiResult::success()),
        Err(e) => {
            show_error(&app, "Save failed", &e);
            Ok(ApiResult::error(e.to_string()))
        }
    }
}

/// Creates `Untitled.md` (or `Untitled N.md`) at the top of the open folder
/// and rescans. A failed creation is also shown in a modal dialog.
#[tauri::command]
pub async fn create_file(app: AppHandle, state: State<'_, AppState>) -> Result<ApiResult, String> {
    let created = state.workspace().create_file();
    let path = match created {
        Ok(path) => path,
        Err(e) => {
            show_error(&app, "Could not create file", &e);
            return Ok(ApiResult::error(e.to_string()));
        }
    };
    match state.reload().await {
        Ok(()) => Ok(ApiResult::with_path(path)),
        Err(e) => Ok(ApiResult::error(e.to_string())),
    }
}

/// Renames a file in place.
///
/// # Arguments
/// * `path` - Current path of the file node
/// * `new_name` - New file name, including its extension
#[tauri::command]
pub async fn rename_file(
    path: String,
    new_name: String,
    state: State<'_, AppState>,
) -> Result<ApiResult, String> {
    let renamed = state.workspace().rename_file(&path, &new_name);
    match renamed {
        Ok((new_path, ticket)) => {
            let reloaded = state.reload().await;
            state.load_content(ticket).await;
            match reloaded {
                Ok(()) => Ok(ApiResult::with_path(new_path)),
                Err(e) => Ok(ApiResult::error(e.to_string())),
            }
        }
        Err(e) => Ok(ApiResult::error(e.to_string())),
    }
}

#[tauri::command]
pub async fn toggle_preview(state: State<'_, AppState>) -> Result<PreferencesView, String> {
    let view = {
        let mut workspace = state.workspace();
        workspace.toggle_preview();
        workspace.preferences_view()
    };
    state.save_preferences().await;
    Ok(view)
}

/// # Arguments
/// * `is_preview` - `true` for the rendered view, `false` for the editor
#[tauri::command]
pub async fn set_preview(is_preview: bool, state: State<'_, AppState>) -> Result<PreferencesView, String> {
    let view = {
        let mut workspace = state.workspace();
        workspace.set_preview(is_preview);
        workspace.preferences_view()
    };
    state.save_preferences().await;
    Ok(view)
}

#[tauri::command]
pub async fn toggle_sidebar(state: State<'_, AppState>) -> Result<PreferencesView, String> {
    let view = {
        let mut workspace = state.workspace();
        workspace.toggle_sidebar();
        workspace.preferences_view()
    };
    state.save_preferences().await;
    Ok(view)
}

/// # Arguments
/// * `delta` - Points to add to the editor font size (negative shrinks)
#[tauri::command]
pub async fn adjust_font_size(delta: i32, state: State<'_, AppState>) -> Result<PreferencesView, String> {
    let view = {
        let mut workspace = state.workspace();
        workspace.adjust_font_size(delta);
        workspace.preferences_view()
    };
    state.save_preferences().await;
    Ok(view)
}

#[tauri::command]
pub async fn get_preferences(state: State<'_, AppState>) -> Result<PreferencesView, String> {
    Ok(state.workspace().preferences_view())
}
