use serde::{Deserialize, Serialize};

/// A folder in the notes tree. Only materialised when its subtree holds at
/// least one supported file.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FolderNode {
    pub name: String,
    pub path: String,
    pub children: Vec<Node>,
    /// Number of files anywhere below this folder, shown as a sidebar badge.
    pub file_count: usize,
}

impl FolderNode {
    pub fn new(name: String, path: String, children: Vec<Node>) -> Self {
        let file_count = children
            .iter()
            .map(|child| match child {
                Node::Folder(folder) => folder.file_count,
                Node::File(_) => 1,
            })
            .sum();
        Self {
            name,
            path,
            children,
            file_count,
        }
    }
}

/// A supported file in the notes tree.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FileNode {
    pub name: String,
    pub path: String,
    /// Lowercased text after the last `.` of `name`.
    pub extension: String,
}

impl FileNode {
    pub fn kind(&self) -> FileKind {
        FileKind::from_extension(&self.extension)
    }
}

/// Entry of the notes tree. The `path` of a node is its identity.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    Folder(FolderNode),
    File(FileNode),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Folder(folder) => &folder.name,
            Node::File(file) => &file.name,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Node::Folder(_))
    }
}

/// What a file is, as far as display goes.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Markdown,
    Text,
    Csv,
    Image,
}

impl FileKind {
    /// Anything that is not a known image extension is read as text.
    pub fn from_extension(extension: &str) -> Self {
        match extension {
            "png" | "jpg" | "jpeg" => FileKind::Image,
            "md" => FileKind::Markdown,
            "csv" => FileKind::Csv,
            _ => FileKind::Text,
        }
    }

    pub fn is_image(self) -> bool {
        self == FileKind::Image
    }
}

/// Generic API result for IPC commands
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled: Option<bool>,
}

impl ApiResult {
    /// Create a successful result
    pub fn success() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Create a success result carrying the path that was created or opened
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            success: true,
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// The user dismissed a dialog. Not a failure.
    pub fn cancelled() -> Self {
        Self {
            success: true,
            cancelled: Some(true),
            ..Default::default()
        }
    }
}

/// Snapshot of the sidebar state sent to the webview.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TreeView {
    pub folder: Option<String>,
    pub folder_name: Option<String>,
    pub nodes: Vec<Node>,
    pub expanded: Vec<String>,
    pub selected: Option<String>,
}

/// Persisted view preferences.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesView {
    pub is_preview: bool,
    pub sidebar_visible: bool,
    pub font_size: u32,
}
