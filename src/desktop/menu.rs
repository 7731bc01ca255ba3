use tauri::{
    menu::{Menu, MenuItem, PredefinedMenuItem, Submenu},
    AppHandle, Manager, Runtime,
};

use super::commands::{pick_folder, show_error};
use super::{notify_changed, AppState};

const OPEN_FOLDER: &str = "open-folder";
const NEW_FILE: &str = "new-file";
const SAVE: &str = "save";
const RELOAD: &str = "reload";
const TOGGLE_PREVIEW: &str = "toggle-preview";
const TOGGLE_SIDEBAR: &str = "toggle-sidebar";
const FONT_LARGER: &str = "font-larger";
const FONT_SMALLER: &str = "font-smaller";

/// Points added or removed by one font size menu action.
const FONT_STEP: i32 = 1;

/// Installs the File / Edit / View application menu.
pub fn setup_menu<R: Runtime>(app: &AppHandle<R>) -> tauri::Result<()> {
    let file_menu = Submenu::with_items(
        app,
        "File",
        true,
        &[
            &MenuItem::with_id(app, OPEN_FOLDER, "Open Folder…", true, Some("CmdOrCtrl+Shift+O"))?,
            &MenuItem::with_id(app, NEW_FILE, "New", true, Some("CmdOrCtrl+N"))?,
            &MenuItem::with_id(app, SAVE, "Save", true, Some("CmdOrCtrl+S"))?,
            &MenuItem::with_id(app, RELOAD, "Reload", true, Some("CmdOrCtrl+R"))?,
            &PredefinedMenuItem::separator(app)?,
            &PredefinedMenuItem::quit(app, None)?,
        ],
    )?;

    // Undo and redo act on the webview's editor directly
    let edit_menu = Submenu::with_items(
        app,
        "Edit",
        true,
        &[
            &PredefinedMenuItem::undo(app, None)?,
            &PredefinedMenuItem::redo(app, None)?,
            &PredefinedMenuItem::separator(app)?,
            &PredefinedMenuItem::cut(app, None)?,
            &PredefinedMenuItem::copy(app, None)?,
            &PredefinedMenuItem::paste(app, None)?,
            &PredefinedMenuItem::select_all(app, None)?,
        ],
    )?;

    let view_menu = Submenu::with_items(
        app,
        "View",
        true,
        &[
            &MenuItem::with_id(app, TOGGLE_PREVIEW, "Toggle Preview", true, Some("CmdOrCtrl+E"))?,
            &MenuItem::with_id(app, TOGGLE_SIDEBAR, "Toggle Sidebar", true, Some("CmdOrCtrl+B"))?,
            &PredefinedMenuItem::separator(app)?,
            &MenuItem::with_id(app, FONT_LARGER, "Increase Font Size", true, Some("CmdOrCtrl+1"))?,
            &MenuItem::with_id(app, FONT_SMALLER, "Decrease Font Size", true, Some("CmdOrCtrl+-"))?,
        ],
    )?;

    let menu = Menu::with_items(app, &[&file_menu, &edit_menu, &view_menu])?;
    app.set_menu(menu)?;
    app.on_menu_event(|app, event| {
        handle_menu_event(app, &event.id.0);
    });
    Ok(())
}

/// Runs the action behind a menu item and tells the webview to refresh.
fn handle_menu_event<R: Runtime>(app: &AppHandle<R>, menu_id: &str) {
    let app = app.clone();
    let menu_id = menu_id.to_string();

    tauri::async_runtime::spawn(async move {
        let state = app.state::<AppState>();
        match menu_id.as_str() {
            OPEN_FOLDER => match pick_folder(&app).await {
                Ok(Some(root)) => {
                    if let Err(e) = state.load_folder(root).await {
                        show_error(&app, "Could not open folder", &e);
                    }
                }
                Ok(None) => return,
                Err(e) => log::error!("Folder chooser failed: {}", e),
            },
            NEW_FILE => {
                let created = state.workspace().create_file();
                match created {
                    Ok(_) => {
                        if let Err(e) = state.reload().await {
                            log::warn!("Reload failed: {}", e);
                        }
                    }
                    Err(e) => show_error(&app, "Could not create file", &e),
                }
            }
            SAVE => {
                let saved = state.workspace().save();
                if let Err(e) = saved {
                    show_error(&app, "Save failed", &e);
                }
            }
            RELOAD => {
                if let Err(e) = state.reload().await {
                    log::warn!("Reload failed: {}", e);
                }
            }
            TOGGLE_PREVIEW => {
                state.workspace().toggle_preview();
            }
            TOGGLE_SIDEBAR => {
                state.workspace().toggle_sidebar();
            }
            FONT_LARGER => {
                state.workspace().adjust_font_size(FONT_STEP);
            }
            FONT_SMALLER => {
                state.workspace().adjust_font_size(-FONT_STEP);
            }
            _ => return,
        }
        state.save_preferences().await;
        notify_changed(&app);
    });
}
