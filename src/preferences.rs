use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::error::NoteError;
use crate::models::PreferencesView;

/// Last opened notes folder.
pub const FOLDER_KEY: &str = "marklee-folder";
/// Edit/preview mode, `"true"` for preview.
pub const PREVIEW_KEY: &str = "marklee-preview";
pub const SIDEBAR_KEY: &str = "marklee-sidebar";
pub const FONT_SIZE_KEY: &str = "marklee-font-size";

pub const DEFAULT_FONT_SIZE: u32 = 14;
pub const MIN_FONT_SIZE: u32 = 10;
pub const MAX_FONT_SIZE: u32 = 32;

/// Debounce delay for preference saves (1 second)
const SAVE_DEBOUNCE_MS: u64 = 1000;

/// String key-value store for user preferences.
pub trait PreferenceBackend: Send + Sync {
    fn load(&self, key: &str) -> Option<String>;
    fn persist(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

pub fn bool_value(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Reads a boolean stored as `"true"`/`"false"`; anything else is `default`.
pub fn load_bool(backend: &dyn PreferenceBackend, key: &str, default: bool) -> bool {
    match backend.load(key).as_deref() {
        Some("true") => true,
        Some("false") => false,
        _ => default,
    }
}

pub fn clamp_font_size(size: u32) -> u32 {
    size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
}

impl PreferencesView {
    /// Typed view of the stored scalars, defaults filled in.
    pub fn load(backend: &dyn PreferenceBackend) -> Self {
        let font_size = backend
            .load(FONT_SIZE_KEY)
            .and_then(|v| v.parse::<u32>().ok())
            .map(clamp_font_size)
            .unwrap_or(DEFAULT_FONT_SIZE);

        Self {
            is_preview: load_bool(backend, PREVIEW_KEY, false),
            sidebar_visible: load_bool(backend, SIDEBAR_KEY, true),
            font_size,
        }
    }
}

/// Preferences held only in memory.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: RwLock<BTreeMap<String, String>>,
}

impl PreferenceBackend for MemoryPreferences {
    fn load(&self, key: &str) -> Option<String> {
        read_values(&self.values).get(key).cloned()
    }

    fn persist(&self, key: &str, value: &str) {
        write_values(&self.values).insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        write_values(&self.values).remove(key);
    }
}

/// PreferenceStore keeps preferences in a JSON object of string values.
///
/// Writes go to memory immediately; [`PreferenceStore::schedule_save`]
/// persists them after a quiet period and [`PreferenceStore::save_sync`]
/// persists them right away (used on exit).
pub struct PreferenceStore {
    /// Shared with the debounced save task
    values: Arc<RwLock<BTreeMap<String, String>>>,
    path: Arc<PathBuf>,
    /// Handle to the debounced save task
    save_handle: Mutex<Option<JoinHandle<()>>>,
    debounce: Duration,
}

impl PreferenceStore {
    /// Opens the store at `path`, loading whatever is already saved there.
    pub fn new(path: PathBuf) -> Result<Self, NoteError> {
        Self::with_debounce(path, Duration::from_millis(SAVE_DEBOUNCE_MS))
    }

    pub fn with_debounce(path: PathBuf, debounce: Duration) -> Result<Self, NoteError> {
        let values = Self::load_from_file(&path)?;
        Ok(Self {
            values: Arc::new(RwLock::new(values)),
            path: Arc::new(path),
            save_handle: Mutex::new(None),
            debounce,
        })
    }

    /// A missing file is an empty store. A file that is not a JSON object is
    /// ignored with a warning rather than blocking startup.
    fn load_from_file(path: &Path) -> Result<BTreeMap<String, String>, NoteError> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| NoteError::io("Failed to read preferences file", e))?;

        match merge_preferences(&content) {
            Ok(values) => Ok(values),
            Err(e) => {
                log::warn!("Ignoring preferences at {}: {}", path.display(), e);
                Ok(BTreeMap::new())
            }
        }
    }

    /// Gets a copy of every stored value.
    pub fn values(&self) -> BTreeMap<String, String> {
        read_values(&self.values).clone()
    }

    /// Schedules a debounced save. A save already waiting is cancelled.
    pub async fn schedule_save(&self) {
        let mut handle_guard = self.save_handle.lock().await;

        if let Some(handle) = handle_guard.take() {
            handle.abort();
        }

        let values_ref = Arc::clone(&self.values);
        let path_ref = Arc::clone(&self.path);
        let debounce = self.debounce;

        let handle = tokio::spawn(async move {
            sleep(debounce).await;

            let values = read_values(&values_ref).clone();
            let content = match serde_json::to_string_pretty(&values) {
                Ok(content) => content,
                Err(e) => {
                    log::error!("Failed to serialize preferences: {}", e);
                    return;
                }
            };
            if let Some(parent) = path_ref.parent() {
                let _ = tokio::fs::create_dir_all(parent).await;
            }
            if let Err(e) = tokio::fs::write(path_ref.as_ref(), content).await {
                log::error!("Failed to write preferences: {}", e);
            }
        });

        *handle_guard = Some(handle);
    }

    /// Saves the preferences to disk immediately.
    pub fn save_sync(&self) -> Result<(), NoteError> {
        let content = serde_json::to_string_pretty(&self.values())
            .map_err(|e| NoteError::io("Failed to serialize preferences", e.into()))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| NoteError::io("Failed to create preferences directory", e))?;
        }
        fs::write(self.path.as_ref(), content)
            .map_err(|e| NoteError::io("Failed to write preferences file", e))
    }
}

impl PreferenceBackend for PreferenceStore {
    fn load(&self, key: &str) -> Option<String> {
        read_values(&self.values).get(key).cloned()
    }

    fn persist(&self, key: &str, value: &str) {
        write_values(&self.values).insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        write_values(&self.values).remove(key);
    }
}

/// Parses saved preferences, keeping only string values.
///
/// A standalone function so the merge rules can be tested without disk.
pub fn merge_preferences(json: &str) -> Result<BTreeMap<String, String>, String> {
    if json.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let json_value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| format!("Failed to parse preferences: {}", e))?;

    let obj = json_value
        .as_object()
        .ok_or_else(|| "Preferences must be a JSON object".to_string())?;

    Ok(obj
        .iter()
        .filter_map(|(key, value)| value.as_str().map(|v| (key.clone(), v.to_string())))
        .collect())
}

fn read_values(
    values: &RwLock<BTreeMap<String, String>>,
) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, String>> {
    values.read().unwrap_or_else(|e| e.into_inner())
}

fn write_values(
    values: &RwLock<BTreeMap<String, String>>,
) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, String>> {
    values.write().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn test_store_new_no_file() {
        let temp_dir = tempdir().unwrap();
        let store = PreferenceStore::new(temp_dir.path().join("preferences.json")).unwrap();

        assert!(store.values().is_empty());
        assert!(store.load(FOLDER_KEY).is_none());
        assert_eq!(
            PreferencesView::load(&store),
            PreferencesView {
                is_preview: false,
                sidebar_visible: true,
                font_size: DEFAULT_FONT_SIZE,
            }
        );
    }

    #[test]
    fn test_store_load_existing() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("preferences.json");
        fs::write(
            &path,
            r#"{"marklee-folder": "/home/me/notes", "marklee-preview": "true", "stray": 3}"#,
        )
        .unwrap();

        let store = PreferenceStore::new(path).unwrap();
        assert_eq!(store.load(FOLDER_KEY).as_deref(), Some("/home/me/notes"));
        assert!(load_bool(&store, PREVIEW_KEY, false));
        assert!(store.load("stray").is_none());
    }

    #[test]
    fn test_store_corrupt_file_starts_empty() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("preferences.json");
        fs::write(&path, "not json").unwrap();

        let store = PreferenceStore::new(path).unwrap();
        assert!(store.values().is_empty());
    }

    #[test]
    fn test_store_persist_and_remove() {
        let temp_dir = tempdir().unwrap();
        let store = PreferenceStore::new(temp_dir.path().join("preferences.json")).unwrap();

        store.persist(FOLDER_KEY, "/notes");
        assert_eq!(store.load(FOLDER_KEY).as_deref(), Some("/notes"));

        store.remove(FOLDER_KEY);
        assert!(store.load(FOLDER_KEY).is_none());
    }

    #[test]
    fn test_store_save_sync_creates_parent() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("marklee").join("preferences.json");
        let store = PreferenceStore::new(path.clone()).unwrap();

        store.persist(SIDEBAR_KEY, bool_value(false));
        store.save_sync().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("marklee-sidebar"));
        let reloaded = PreferenceStore::new(path).unwrap();
        assert!(!load_bool(&reloaded, SIDEBAR_KEY, true));
    }

    #[tokio::test]
    async fn test_schedule_save_writes_latest_values() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("preferences.json");
        let store = PreferenceStore::with_debounce(path.clone(), Duration::from_millis(20)).unwrap();

        store.persist(FONT_SIZE_KEY, "16");
        store.schedule_save().await;
        store.persist(FONT_SIZE_KEY, "18");
        store.schedule_save().await;

        sleep(Duration::from_millis(300)).await;

        let saved = merge_preferences(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved.get(FONT_SIZE_KEY).map(String::as_str), Some("18"));
    }

    #[test]
    fn test_load_bool_ignores_garbage() {
        let prefs = MemoryPreferences::default();
        prefs.persist(PREVIEW_KEY, "yes");
        assert!(!load_bool(&prefs, PREVIEW_KEY, false));
        assert!(load_bool(&prefs, PREVIEW_KEY, true));
    }

    #[test]
    fn test_font_size_is_clamped_on_load() {
        let prefs = MemoryPreferences::default();
        prefs.persist(FONT_SIZE_KEY, "99");
        assert_eq!(PreferencesView::load(&prefs).font_size, MAX_FONT_SIZE);

        prefs.persist(FONT_SIZE_KEY, "abc");
        assert_eq!(PreferencesView::load(&prefs).font_size, DEFAULT_FONT_SIZE);
    }

    #[test]
    fn test_merge_preferences_empty() {
        assert!(merge_preferences("").unwrap().is_empty());
        assert!(merge_preferences("[1, 2]").is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Any folder path written to the store comes back after a save and reload.
        #[test]
        fn prop_folder_persistence_round_trip(folder in "/[a-zA-Z0-9 _./-]{0,40}") {
            let temp_dir = tempdir().unwrap();
            let path = temp_dir.path().join("preferences.json");

            let store = PreferenceStore::new(path.clone()).unwrap();
            store.persist(FOLDER_KEY, &folder);
            store.save_sync().unwrap();

            let reloaded = PreferenceStore::new(path).unwrap();
            prop_assert_eq!(reloaded.load(FOLDER_KEY), Some(folder));
        }
    }
}
