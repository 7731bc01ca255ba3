//! Walks a notes folder into the tree shown in the sidebar.
//!
//! Only supported files are surfaced, folders without any supported file
//! below them are pruned, and siblings are ordered folders first, then
//! case-insensitively by name.

use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::NoteError;
use crate::models::{FileNode, FolderNode, Node};

/// Extensions surfaced in the tree. Everything else is dropped.
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["md", "txt", "csv", "png", "jpg", "jpeg"];

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    pub is_directory: bool,
    pub is_file: bool,
}

impl DirEntryInfo {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_directory: false,
            is_file: true,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_directory: true,
            is_file: false,
        }
    }
}

/// Directory listing primitive the builder walks with.
pub trait DirectoryLister {
    /// Lists the entries of `path`. Order is not significant.
    fn list_directory(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>>;

    /// Stable identity of the directory at `path`, used to detect link cycles.
    /// `None` disables the cycle check for that directory.
    fn directory_identity(&self, path: &Path) -> Option<PathBuf> {
        Some(path.to_path_buf())
    }
}

/// Lister backed by `std::fs`. Symbolic links are followed.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdLister;

impl DirectoryLister for StdLister {
    fn list_directory(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            // A dangling link is neither a file nor a directory.
            let (is_directory, is_file) = match fs::metadata(entry.path()) {
                Ok(meta) => (meta.is_dir(), meta.is_file()),
                Err(_) => (false, false),
            };
            entries.push(DirEntryInfo {
                name,
                is_directory,
                is_file,
            });
        }
        Ok(entries)
    }

    fn directory_identity(&self, path: &Path) -> Option<PathBuf> {
        fs::canonicalize(path).ok()
    }
}

/// Lowercased text after the last `.` of `name`, if there is one.
pub fn file_extension(name: &str) -> Option<String> {
    name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
}

/// Extension of `name` when it is one the tree shows.
pub fn supported_extension(name: &str) -> Option<String> {
    file_extension(name).filter(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_supported_file(name: &str) -> bool {
    supported_extension(name).is_some()
}

/// Builds the tree below `root`. The root itself is not wrapped in a node.
///
/// Failing to list `root` is fatal and reported as
/// [`NoteError::FolderUnreadable`]. Failing to list anything below it only
/// empties that subtree.
pub fn build_tree<L>(lister: &L, root: &Path) -> Result<Vec<Node>, NoteError>
where
    L: DirectoryLister + ?Sized,
{
    let entries = lister
        .list_directory(root)
        .map_err(|source| NoteError::FolderUnreadable {
            path: root.to_path_buf(),
            source,
        })?;

    let mut ancestors: Vec<PathBuf> = lister.directory_identity(root).into_iter().collect();
    let nodes = collect_nodes(lister, root, entries, &mut ancestors);

    log::debug!(
        "Built tree for {}: {} top-level entries",
        root.display(),
        nodes.len()
    );
    Ok(nodes)
}

/// Runs [`build_tree`] with [`StdLister`] on the blocking pool.
pub async fn build_tree_async(root: PathBuf) -> Result<Vec<Node>, NoteError> {
    tokio::task::spawn_blocking(move || build_tree(&StdLister, &root))
        .await
        .map_err(|e| NoteError::Task(e.to_string()))?
}

fn read_children<L>(lister: &L, dir: &Path, ancestors: &mut Vec<PathBuf>) -> Vec<Node>
where
    L: DirectoryLister + ?Sized,
{
    let identity = lister.directory_identity(dir);
    if let Some(id) = &identity {
        if ancestors.contains(id) {
            log::warn!("Skipping {}: directory link cycle", dir.display());
            return Vec::new();
        }
    }

    let entries = match lister.list_directory(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Error reading directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let pushed = match identity {
        Some(id) => {
            ancestors.push(id);
            true
        }
        None => false,
    };
    let nodes = collect_nodes(lister, dir, entries, ancestors);
    if pushed {
        ancestors.pop();
    }
    nodes
}

fn collect_nodes<L>(
    lister: &L,
    dir: &Path,
    entries: Vec<DirEntryInfo>,
    ancestors: &mut Vec<PathBuf>,
) -> Vec<Node>
where
    L: DirectoryLister + ?Sized,
{
    let mut nodes = Vec::with_capacity(entries.len());

    for entry in entries {
        let full_path = dir.join(&entry.name);

        if entry.is_directory {
            let children = read_children(lister, &full_path, ancestors);
            if !children.is_empty() {
                nodes.push(Node::Folder(FolderNode::new(
                    entry.name,
                    path_string(&full_path),
                    children,
                )));
            }
        } else if entry.is_file {
            if let Some(extension) = supported_extension(&entry.name) {
                nodes.push(Node::File(FileNode {
                    name: entry.name,
                    path: path_string(&full_path),
                    extension,
                }));
            }
        }
    }

    sort_nodes(&mut nodes);
    nodes
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Folders before files, then case-insensitive by name. Names that only
/// differ in case fall back to their exact order.
pub fn compare_nodes(a: &Node, b: &Node) -> Ordering {
    b.is_folder()
        .cmp(&a.is_folder())
        .then_with(|| a.name().to_lowercase().cmp(&b.name().to_lowercase()))
        .then_with(|| a.name().cmp(b.name()))
}

pub fn sort_nodes(nodes: &mut [Node]) {
    nodes.sort_by(compare_nodes);
}

/// Finds the file with `path` anywhere in the tree.
pub fn find_file<'a>(nodes: &'a [Node], path: &str) -> Option<&'a FileNode> {
    nodes.iter().find_map(|node| match node {
        Node::File(file) if file.path == path => Some(file),
        Node::File(_) => None,
        Node::Folder(folder) => find_file(&folder.children, path),
    })
}

pub fn contains_folder(nodes: &[Node], path: &str) -> bool {
    nodes.iter().any(|node| match node {
        Node::Folder(folder) => folder.path == path || contains_folder(&folder.children, path),
        Node::File(_) => false,
    })
}
