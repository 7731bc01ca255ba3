use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the workspace and its collaborators.
///
/// Failures that are absorbed locally (an unreadable subdirectory, a text
/// file that cannot be read) never reach this type; they degrade the tree or
/// the payload instead.
#[derive(Debug, Error)]
pub enum NoteError {
    /// The root folder itself could not be listed.
    #[error("folder unreadable: {}: {source}", path.display())]
    FolderUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("no folder is open")]
    NoFolder,
    #[error("no text file is selected")]
    NoTextSelection,
    #[error("file content was not loaded and cannot be saved")]
    NotSaveable,
    #[error("background task failed: {0}")]
    Task(String),
}

impl NoteError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// True when the error means the open folder is gone and should be forgotten.
    pub fn is_folder_unreadable(&self) -> bool {
        matches!(self, Self::FolderUnreadable { .. })
    }
}
