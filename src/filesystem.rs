use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::NoteError;
use crate::tree::is_supported_file;

/// Name given to files created from the New action.
pub const NEW_FILE_STEM: &str = "Untitled";
pub const NEW_FILE_EXTENSION: &str = "md";

/// Upper bound on `Untitled N.md` probing before giving up.
const MAX_NEW_FILE_ATTEMPTS: u32 = 1000;

/// Validates a single file name and resolves it inside `dir`.
///
/// Rejects names that contain:
/// - ".." (parent directory traversal)
/// - "/" or "\\" (path separators)
/// - nothing but whitespace
pub fn validate_name(dir: &Path, name: &str) -> Result<PathBuf, NoteError> {
    if name.trim().is_empty() {
        return Err(NoteError::InvalidName("Name cannot be empty".to_string()));
    }

    if name.contains("..") {
        return Err(NoteError::InvalidName(
            "Name contains invalid traversal pattern '..'".to_string(),
        ));
    }

    if name.contains('/') {
        return Err(NoteError::InvalidName(
            "Name contains invalid separator '/'".to_string(),
        ));
    }

    if name.contains('\\') {
        return Err(NoteError::InvalidName(
            "Name contains invalid separator '\\'".to_string(),
        ));
    }

    Ok(dir.join(name))
}

/// AppPaths locates the application's own data.
///
/// The structure is:
/// - `{data_dir}/preferences.json` - Persisted user preferences
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Base data directory for the application
    pub base_dir: PathBuf,
    /// Path to the preferences file (preferences.json)
    pub preferences_file: PathBuf,
}

impl AppPaths {
    /// Uses the platform data directory.
    ///
    /// On Linux: ~/.local/share/marklee/
    /// On macOS: ~/Library/Application Support/marklee/
    /// On Windows: C:\Users\{user}\AppData\Roaming\marklee\
    pub fn new() -> Result<Self, NoteError> {
        let base_dir = dirs::data_dir()
            .ok_or_else(|| {
                NoteError::io(
                    "Could not determine data directory",
                    io::Error::new(io::ErrorKind::NotFound, "no data directory"),
                )
            })?
            .join("marklee");

        Ok(Self::new_with_base(&base_dir))
    }

    /// Roots everything at `base_dir`. Useful for testing.
    pub fn new_with_base(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            preferences_file: base_dir.join("preferences.json"),
        }
    }

    pub fn ensure_directories(&self) -> Result<(), NoteError> {
        fs::create_dir_all(&self.base_dir)
            .map_err(|e| NoteError::io("Failed to create data directory", e))
    }
}

/// Writes `content` to an existing note.
pub fn write_text(path: &Path, content: &str) -> Result<(), NoteError> {
    fs::write(path, content)
        .map_err(|e| NoteError::io(format!("Failed to save {}", path.display()), e))
}

/// Creates an empty markdown file in `dir` named `Untitled.md`, or
/// `Untitled 2.md`, `Untitled 3.md`... when taken. Never overwrites.
pub fn create_untitled(dir: &Path) -> Result<PathBuf, NoteError> {
    for attempt in 1..=MAX_NEW_FILE_ATTEMPTS {
        let name = if attempt == 1 {
            format!("{}.{}", NEW_FILE_STEM, NEW_FILE_EXTENSION)
        } else {
            format!("{} {}.{}", NEW_FILE_STEM, attempt, NEW_FILE_EXTENSION)
        };
        let path = dir.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => return Ok(path),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(NoteError::io(
                    format!("Failed to create file in {}", dir.display()),
                    e,
                ))
            }
        }
    }

    Err(NoteError::io(
        "Failed to create file",
        io::Error::new(io::ErrorKind::AlreadyExists, "too many untitled files"),
    ))
}

/// Renames the file at `path` to `new_name` within the same directory.
///
/// The new name must pass [`validate_name`], keep a supported extension, and
/// not collide with an existing entry.
pub fn rename_file(path: &Path, new_name: &str) -> Result<PathBuf, NoteError> {
    let dir = path
        .parent()
        .ok_or_else(|| NoteError::InvalidName("File has no parent directory".to_string()))?;
    let target = validate_name(dir, new_name)?;

    if !is_supported_file(new_name) {
        return Err(NoteError::InvalidName(format!(
            "'{}' does not have a supported extension",
            new_name
        )));
    }

    if target == path {
        return Ok(target);
    }

    if target.exists() {
        return Err(NoteError::InvalidName(format!("'{}' already exists", new_name)));
    }

    fs::rename(path, &target)
        .map_err(|e| NoteError::io(format!("Failed to rename {}", path.display()), e))?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn test_validate_name_rejects_double_dot() {
        let temp_dir = tempdir().unwrap();
        let err = validate_name(temp_dir.path(), "..").unwrap_err();
        assert!(err.to_string().contains(".."));
    }

    #[test]
    fn test_validate_name_rejects_separators() {
        let temp_dir = tempdir().unwrap();
        assert!(validate_name(temp_dir.path(), "foo/bar.md").is_err());
        assert!(validate_name(temp_dir.path(), "foo\\bar.md").is_err());
        assert!(validate_name(temp_dir.path(), "   ").is_err());
    }

    #[test]
    fn test_validate_name_accepts_dotted_names() {
        let temp_dir = tempdir().unwrap();
        let path = validate_name(temp_dir.path(), "file.name.md").unwrap();
        assert_eq!(path, temp_dir.path().join("file.name.md"));
    }

    #[test]
    fn test_app_paths_new_with_base() {
        let temp_dir = tempdir().unwrap();
        let paths = AppPaths::new_with_base(temp_dir.path());

        assert_eq!(paths.base_dir, temp_dir.path());
        assert_eq!(
            paths.preferences_file,
            temp_dir.path().join("preferences.json")
        );
    }

    #[test]
    fn test_app_paths_ensure_directories_idempotent() {
        let temp_dir = tempdir().unwrap();
        let paths = AppPaths::new_with_base(&temp_dir.path().join("data"));

        paths.ensure_directories().unwrap();
        paths.ensure_directories().unwrap();
        assert!(paths.base_dir.is_dir());
    }

    #[test]
    fn test_write_text_replaces_content() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("note.md");
        fs::write(&path, "old").unwrap();

        write_text(&path, "new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_write_text_into_missing_dir_fails() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("missing").join("note.md");
        assert!(matches!(write_text(&path, "x"), Err(NoteError::Io { .. })));
    }

    #[test]
    fn test_create_untitled_never_overwrites() {
        let temp_dir = tempdir().unwrap();
        fs::write(temp_dir.path().join("Untitled.md"), "keep me").unwrap();

        let created = create_untitled(temp_dir.path()).unwrap();
        assert_eq!(created, temp_dir.path().join("Untitled 2.md"));
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("Untitled.md")).unwrap(),
            "keep me"
        );

        let third = create_untitled(temp_dir.path()).unwrap();
        assert_eq!(third, temp_dir.path().join("Untitled 3.md"));
    }

    #[test]
    fn test_create_untitled_in_missing_dir_fails() {
        let temp_dir = tempdir().unwrap();
        let result = create_untitled(&temp_dir.path().join("nope"));
        assert!(matches!(result, Err(NoteError::Io { .. })));
    }

    #[test]
    fn test_rename_file() {
        let temp_dir = tempdir().unwrap();
        let old = temp_dir.path().join("a.md");
        fs::write(&old, "body").unwrap();

        let renamed = rename_file(&old, "b.txt").unwrap();
        assert_eq!(renamed, temp_dir.path().join("b.txt"));
        assert!(!old.exists());
        assert_eq!(fs::read_to_string(renamed).unwrap(), "body");
    }

    #[test]
    fn test_rename_file_rejects_collision_and_unsupported() {
        let temp_dir = tempdir().unwrap();
        let old = temp_dir.path().join("a.md");
        fs::write(&old, "a").unwrap();
        fs::write(temp_dir.path().join("b.md"), "b").unwrap();

        assert!(matches!(
            rename_file(&old, "b.md"),
            Err(NoteError::InvalidName(_))
        ));
        assert!(matches!(
            rename_file(&old, "a.docx"),
            Err(NoteError::InvalidName(_))
        ));
        assert!(old.exists());
    }

    fn name_with_separator() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-zA-Z0-9_-]{0,10}".prop_map(|s| format!("{}..{}.md", s, s)),
            "[a-zA-Z0-9_-]{1,10}".prop_map(|s| format!("{}/{}.md", s, s)),
            "[a-zA-Z0-9_-]{1,10}".prop_map(|s| format!("{}\\{}.md", s, s)),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// A name that could escape its directory is never accepted.
        #[test]
        fn prop_traversal_names_rejected(name in name_with_separator()) {
            let temp_dir = tempdir().unwrap();
            let result = validate_name(temp_dir.path(), &name);
            prop_assert!(result.is_err(), "Name '{}' should be rejected but was accepted", name);
        }
    }
}
