//! The open notes folder and everything the user has done to it.
//!
//! [`Workspace`] is the single owner of UI state: the tree snapshot, which
//! folders are expanded, which file is selected, the content controller and
//! the preference scalars. The desktop shell only ever reads views of it and
//! calls the operations below.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::content::{ContentController, ContentView, LoadOutcome, LoadTicket};
use crate::error::NoteError;
use crate::filesystem;
use crate::models::{FileNode, Node, PreferencesView, TreeView};
use crate::preferences::{
    bool_value, clamp_font_size, PreferenceBackend, FOLDER_KEY, FONT_SIZE_KEY, PREVIEW_KEY,
    SIDEBAR_KEY,
};
use crate::tree::{contains_folder, file_extension, find_file};

/// Handle for one issued tree build. Only the latest one is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeTicket {
    generation: u64,
    root: PathBuf,
}

impl TreeTicket {
    pub fn root(&self) -> &Path {
        &self.root
    }
}

pub struct Workspace {
    root: Option<PathBuf>,
    tree_generation: u64,
    tree: Vec<Node>,
    /// Folder paths shown expanded. Survives rebuilds while the paths exist.
    expanded: BTreeSet<String>,
    selection: Option<FileNode>,
    content: ContentController,
    sidebar_visible: bool,
    font_size: u32,
    prefs: Arc<dyn PreferenceBackend>,
}

impl Workspace {
    /// Starts with no folder open and view settings restored from `prefs`.
    pub fn new(prefs: Arc<dyn PreferenceBackend>) -> Self {
        let view = PreferencesView::load(prefs.as_ref());
        Self {
            root: None,
            tree_generation: 0,
            tree: Vec::new(),
            expanded: BTreeSet::new(),
            selection: None,
            content: ContentController::new(view.is_preview),
            sidebar_visible: view.sidebar_visible,
            font_size: view.font_size,
            prefs,
        }
    }

    /// Folder opened in a previous session, if any.
    pub fn remembered_folder(&self) -> Option<PathBuf> {
        self.prefs.load(FOLDER_KEY).map(PathBuf::from)
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn tree(&self) -> &[Node] {
        &self.tree
    }

    pub fn selection(&self) -> Option<&FileNode> {
        self.selection.as_ref()
    }

    pub fn content(&self) -> &ContentController {
        &self.content
    }

    /// Starts a build of `root`. Any build still in flight becomes stale.
    pub fn begin_open(&mut self, root: PathBuf) -> TreeTicket {
        self.tree_generation += 1;
        TreeTicket {
            generation: self.tree_generation,
            root,
        }
    }

    /// Starts a rescan of the open folder.
    pub fn begin_reload(&mut self) -> Result<TreeTicket, NoteError> {
        let root = self.root.clone().ok_or(NoteError::NoFolder)?;
        Ok(self.begin_open(root))
    }

    /// Installs the result of the build for `ticket`, wherever it ran.
    /// Returns whether it was applied; results of superseded builds are
    /// dropped, errors included.
    ///
    /// Expansion and selection are reconciled against the new tree. When the
    /// root could not be read the folder is forgotten, including the
    /// remembered path, so the next start does not try it again.
    pub fn apply_tree(
        &mut self,
        ticket: TreeTicket,
        result: Result<Vec<Node>, NoteError>,
    ) -> Result<bool, NoteError> {
        let root = ticket.root;
        if ticket.generation != self.tree_generation {
            log::debug!(
                "Discarding stale build of {} (generation {}, current {})",
                root.display(),
                ticket.generation,
                self.tree_generation
            );
            return Ok(false);
        }

        match result {
            Ok(tree) => {
                log::info!("Loaded folder {}", root.display());
                self.prefs.persist(FOLDER_KEY, &root.to_string_lossy());
                self.root = Some(root);
                self.tree = tree;
                self.reconcile();
                Ok(true)
            }
            Err(e) => {
                log::error!("Error loading folder {}: {}", root.display(), e);
                if e.is_folder_unreadable() {
                    self.forget_folder();
                }
                Err(e)
            }
        }
    }

    fn reconcile(&mut self) {
        let tree = &self.tree;
        self.expanded.retain(|path| contains_folder(tree, path));

        let selection_survives = self
            .selection
            .as_ref()
            .is_some_and(|selected| find_file(tree, &selected.path).is_some());
        if !selection_survives {
            if let Some(gone) = self.selection.take() {
                log::info!("Selected file {} no longer exists", gone.path);
                self.content.reset();
            }
        }
    }

    fn forget_folder(&mut self) {
        self.prefs.remove(FOLDER_KEY);
        self.root = None;
        self.tree.clear();
        self.expanded.clear();
        self.selection = None;
        self.content.reset();
    }

    /// Expands or collapses the folder at `path`. Returns whether it is now
    /// expanded.
    pub fn toggle_folder(&mut self, path: &str) -> Result<bool, NoteError> {
        if !contains_folder(&self.tree, path) {
            return Err(NoteError::NotFound(path.to_string()));
        }
        if self.expanded.remove(path) {
            Ok(false)
        } else {
            self.expanded.insert(path.to_string());
            Ok(true)
        }
    }

    pub fn is_expanded(&self, path: &str) -> bool {
        self.expanded.contains(path)
    }

    /// Selects the file at `path`. Returns the read to perform, or `None`
    /// when the file is already on screen.
    ///
    /// Selecting the current file again only reloads it if its last load
    /// failed.
    pub fn select_file(&mut self, path: &str) -> Result<Option<LoadTicket>, NoteError> {
        let file = find_file(&self.tree, path)
            .cloned()
            .ok_or_else(|| NoteError::NotFound(path.to_string()))?;

        let already_selected = self
            .selection
            .as_ref()
            .is_some_and(|selected| selected.path == file.path);
        if already_selected && !self.content.has_failed() {
            return Ok(None);
        }

        self.selection = Some(file.clone());
        Ok(self.content.select(Some(file)))
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
        self.content.reset();
    }

    /// Hands a finished read back. Returns whether it was applied.
    pub fn complete_load(&mut self, ticket: LoadTicket, outcome: LoadOutcome) -> bool {
        self.content.complete(ticket, outcome)
    }

    /// Keyboard accelerator: flips edit/preview when a text file is showing.
    pub fn toggle_preview(&mut self) -> bool {
        let changed = self.content.toggle_preview();
        if changed {
            self.persist_preview();
        }
        changed
    }

    pub fn set_preview(&mut self, is_preview: bool) {
        if self.content.set_preview(is_preview) {
            self.persist_preview();
        }
    }

    fn persist_preview(&self) {
        self.prefs
            .persist(PREVIEW_KEY, bool_value(self.content.is_preview()));
    }

    pub fn edit(&mut self, content: String) -> Result<(), NoteError> {
        self.content.edit(content)
    }

    /// Writes the text being edited back to its file.
    pub fn save(&mut self) -> Result<(), NoteError> {
        let (file, text) = self.content.text_to_save()?;
        filesystem::write_text(Path::new(&file.path), text)?;
        log::info!("Saved {}", file.path);
        self.content.mark_saved();
        Ok(())
    }

    /// Creates an untitled markdown file at the top of the open folder. The
    /// selection and what is on screen stay as they are; the new file shows
    /// up with the next rescan.
    pub fn create_file(&self) -> Result<String, NoteError> {
        let root = self.root.as_deref().ok_or(NoteError::NoFolder)?;
        let created = filesystem::create_untitled(root)?;
        log::info!("Created {}", created.display());
        Ok(created.to_string_lossy().into_owned())
    }

    /// Renames the file at `path`. A selected file stays selected under its
    /// new path; a ticket is returned if its content has to be read again.
    /// The tree picks up the new name with the next rescan.
    pub fn rename_file(
        &mut self,
        path: &str,
        new_name: &str,
    ) -> Result<(String, Option<LoadTicket>), NoteError> {
        let file = find_file(&self.tree, path)
            .cloned()
            .ok_or_else(|| NoteError::NotFound(path.to_string()))?;
        let target = filesystem::rename_file(Path::new(&file.path), new_name)?;
        let new_path = target.to_string_lossy().into_owned();

        let mut ticket = None;
        if self.selection.as_ref().is_some_and(|s| s.path == file.path) {
            let renamed = FileNode {
                name: new_name.to_string(),
                path: new_path.clone(),
                extension: file_extension(new_name).unwrap_or_default(),
            };
            ticket = if renamed.kind().is_image() == file.kind().is_image() {
                self.content.retarget(renamed.clone())
            } else {
                self.content.select(Some(renamed.clone()))
            };
            self.selection = Some(renamed);
        }

        Ok((new_path, ticket))
    }

    pub fn toggle_sidebar(&mut self) -> bool {
        self.sidebar_visible = !self.sidebar_visible;
        self.prefs
            .persist(SIDEBAR_KEY, bool_value(self.sidebar_visible));
        self.sidebar_visible
    }

    /// Grows or shrinks the editor font. Returns the new size.
    pub fn adjust_font_size(&mut self, delta: i32) -> u32 {
        let size = (self.font_size as i64 + delta as i64).max(0) as u32;
        self.font_size = clamp_font_size(size);
        self.prefs
            .persist(FONT_SIZE_KEY, &self.font_size.to_string());
        self.font_size
    }

    pub fn tree_view(&self) -> TreeView {
        TreeView {
            folder: self.root.as_ref().map(|p| p.to_string_lossy().into_owned()),
            folder_name: self
                .root
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|name| name.to_string_lossy().into_owned()),
            nodes: self.tree.clone(),
            expanded: self.expanded.iter().cloned().collect(),
            selected: self.selection.as_ref().map(|s| s.path.clone()),
        }
    }

    pub fn content_view(&self) -> ContentView {
        self.content.view()
    }

    pub fn preferences_view(&self) -> PreferencesView {
        PreferencesView {
            is_preview: self.content.is_preview(),
            sidebar_visible: self.sidebar_visible,
            font_size: self.font_size,
        }
    }
}
