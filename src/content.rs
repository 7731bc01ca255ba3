//! Loading and presenting the content of the selected file.
//!
//! A selection produces a [`LoadTicket`]. The read itself happens outside the
//! controller (so no lock is held across it) and its outcome is handed back
//! with [`ContentController::complete`]. Outcomes for anything but the latest
//! ticket are discarded.

use std::fmt::Display;

use base64::Engine;
use serde::Serialize;

use crate::error::NoteError;
use crate::markdown::render_markdown;
use crate::models::{FileKind, FileNode};

/// Prefix of the text shown in place of a file that could not be read.
pub const LOAD_ERROR_PREFIX: &str = "Error loading file: ";

/// Text content plus what was last written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPayload {
    content: String,
    saved: String,
    dirty: bool,
    load_failed: bool,
}

impl TextPayload {
    pub fn loaded(content: String) -> Self {
        Self {
            saved: content.clone(),
            content,
            dirty: false,
            load_failed: false,
        }
    }

    /// Payload standing in for a file that could not be read. The reason is
    /// shown as the content.
    pub fn failed(reason: impl Display) -> Self {
        Self {
            content: format!("{}{}", LOAD_ERROR_PREFIX, reason),
            saved: String::new(),
            dirty: false,
            load_failed: true,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn load_failed(&self) -> bool {
        self.load_failed
    }

    fn edit(&mut self, content: String) {
        self.dirty = content != self.saved;
        self.content = content;
    }

    fn mark_saved(&mut self) {
        self.saved = self.content.clone();
        self.dirty = false;
        self.load_failed = false;
    }
}

/// Image content as a data URI. `None` means the bytes could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub data_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(TextPayload),
    Image(ImagePayload),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Empty,
    Loading,
    Ready,
    Errored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentState {
    Empty,
    Loading { file: FileNode },
    Ready { file: FileNode, payload: Payload },
    Errored { file: FileNode, message: String },
}

/// Handle for one issued read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    file: FileNode,
}

impl LoadTicket {
    pub fn file(&self) -> &FileNode {
        &self.file
    }
}

/// `Err` only when the read could not run at all. Read failures are
/// already folded into the payload by [`read_payload`].
pub type LoadOutcome = Result<Payload, String>;

/// What the content pane renders.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentView {
    pub status: ContentStatus,
    pub file: Option<FileNode>,
    pub kind: Option<FileKind>,
    pub text: Option<String>,
    pub html: Option<String>,
    pub image_data: Option<String>,
    pub unable_to_display: bool,
    pub dirty: bool,
    pub is_preview: bool,
    pub error: Option<String>,
}

/// State machine for the selected file's content.
#[derive(Debug)]
pub struct ContentController {
    state: ContentState,
    generation: u64,
    is_preview: bool,
    loads_issued: u64,
}

impl ContentController {
    pub fn new(is_preview: bool) -> Self {
        Self {
            state: ContentState::Empty,
            generation: 0,
            is_preview,
            loads_issued: 0,
        }
    }

    pub fn status(&self) -> ContentStatus {
        match self.state {
            ContentState::Empty => ContentStatus::Empty,
            ContentState::Loading { .. } => ContentStatus::Loading,
            ContentState::Ready { .. } => ContentStatus::Ready,
            ContentState::Errored { .. } => ContentStatus::Errored,
        }
    }

    pub fn current_file(&self) -> Option<&FileNode> {
        match &self.state {
            ContentState::Empty => None,
            ContentState::Loading { file }
            | ContentState::Ready { file, .. }
            | ContentState::Errored { file, .. } => Some(file),
        }
    }

    pub fn is_preview(&self) -> bool {
        self.is_preview
    }

    /// Number of reads issued since creation.
    pub fn loads_issued(&self) -> u64 {
        self.loads_issued
    }

    /// Switches to `file` (or to nothing). Any outstanding ticket becomes stale.
    pub fn select(&mut self, file: Option<FileNode>) -> Option<LoadTicket> {
        self.generation += 1;
        match file {
            None => {
                self.state = ContentState::Empty;
                None
            }
            Some(file) => {
                self.loads_issued += 1;
                self.state = ContentState::Loading { file: file.clone() };
                Some(LoadTicket {
                    generation: self.generation,
                    file,
                })
            }
        }
    }

    pub fn reset(&mut self) {
        self.select(None);
    }

    /// Applies the outcome of `ticket` if it is still the latest load.
    /// Returns whether it was applied.
    pub fn complete(&mut self, ticket: LoadTicket, outcome: LoadOutcome) -> bool {
        let awaiting = matches!(
            &self.state,
            ContentState::Loading { file } if file.path == ticket.file.path
        );
        if ticket.generation != self.generation || !awaiting {
            log::debug!(
                "Discarding stale load of {} (generation {}, current {})",
                ticket.file.path,
                ticket.generation,
                self.generation
            );
            return false;
        }

        self.state = match outcome {
            Ok(payload) => ContentState::Ready {
                file: ticket.file,
                payload,
            },
            Err(message) => {
                log::error!("Loading {} failed: {}", ticket.file.path, message);
                ContentState::Errored {
                    file: ticket.file,
                    message,
                }
            }
        };
        true
    }

    fn text_payload(&self) -> Option<&TextPayload> {
        match &self.state {
            ContentState::Ready {
                payload: Payload::Text(text),
                ..
            } => Some(text),
            _ => None,
        }
    }

    fn text_payload_mut(&mut self) -> Option<&mut TextPayload> {
        match &mut self.state {
            ContentState::Ready {
                payload: Payload::Text(text),
                ..
            } => Some(text),
            _ => None,
        }
    }

    pub fn has_text_ready(&self) -> bool {
        self.text_payload().is_some()
    }

    /// Whether the last load for the current file failed in any way.
    pub fn has_failed(&self) -> bool {
        match &self.state {
            ContentState::Errored { .. } => true,
            ContentState::Ready {
                payload: Payload::Text(text),
                ..
            } => text.load_failed,
            ContentState::Ready {
                payload: Payload::Image(image),
                ..
            } => image.data_uri.is_none(),
            ContentState::Empty | ContentState::Loading { .. } => false,
        }
    }

    /// Flips edit/preview. Only a ready text file can be toggled; otherwise
    /// nothing happens. Returns whether the mode changed.
    pub fn toggle_preview(&mut self) -> bool {
        if !self.has_text_ready() {
            return false;
        }
        self.is_preview = !self.is_preview;
        true
    }

    /// Sets the mode directly. Returns whether it changed.
    pub fn set_preview(&mut self, is_preview: bool) -> bool {
        let changed = self.is_preview != is_preview;
        self.is_preview = is_preview;
        changed
    }

    /// Replaces the text being edited.
    pub fn edit(&mut self, content: String) -> Result<(), NoteError> {
        let text = self.text_payload_mut().ok_or(NoteError::NoTextSelection)?;
        text.edit(content);
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.text_payload().is_some_and(TextPayload::is_dirty)
    }

    /// The file and text a save should write.
    pub fn text_to_save(&self) -> Result<(&FileNode, &str), NoteError> {
        match &self.state {
            ContentState::Ready {
                file,
                payload: Payload::Text(text),
            } => {
                if text.load_failed && !text.dirty {
                    return Err(NoteError::NotSaveable);
                }
                Ok((file, text.content()))
            }
            _ => Err(NoteError::NoTextSelection),
        }
    }

    pub fn mark_saved(&mut self) {
        if let Some(text) = self.text_payload_mut() {
            text.mark_saved();
        }
    }

    /// Follows a rename of the current file. A payload already on screen is
    /// kept; a load still in flight is reissued for the new path.
    pub fn retarget(&mut self, renamed: FileNode) -> Option<LoadTicket> {
        if matches!(self.state, ContentState::Loading { .. }) {
            return self.select(Some(renamed));
        }
        if let ContentState::Ready { file, .. } | ContentState::Errored { file, .. } =
            &mut self.state
        {
            *file = renamed;
        }
        None
    }

    pub fn view(&self) -> ContentView {
        let mut view = ContentView {
            status: self.status(),
            file: self.current_file().cloned(),
            kind: self.current_file().map(FileNode::kind),
            text: None,
            html: None,
            image_data: None,
            unable_to_display: false,
            dirty: false,
            is_preview: self.is_preview,
            error: None,
        };

        match &self.state {
            ContentState::Ready {
                payload: Payload::Text(text),
                ..
            } => {
                view.dirty = text.dirty;
                if self.is_preview {
                    view.html = Some(render_markdown(text.content()));
                }
                view.text = Some(text.content.clone());
            }
            ContentState::Ready {
                payload: Payload::Image(image),
                ..
            } => {
                view.image_data = image.data_uri.clone();
                view.unable_to_display = image.data_uri.is_none();
            }
            ContentState::Errored { message, .. } => view.error = Some(message.clone()),
            ContentState::Empty | ContentState::Loading { .. } => {}
        }
        view
    }
}

/// MIME type for an image extension. `jpg` maps to `image/jpeg`.
pub fn image_mime(extension: &str) -> String {
    match extension {
        "jpg" => "image/jpeg".to_string(),
        other => format!("image/{}", other),
    }
}

pub fn image_data_uri(extension: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        image_mime(extension),
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Reads `file` from disk into a payload. Read failures are folded in:
/// text files get the error as their content, images get no data.
pub async fn read_payload(file: &FileNode) -> Payload {
    if file.kind().is_image() {
        match tokio::fs::read(&file.path).await {
            Ok(bytes) => Payload::Image(ImagePayload {
                data_uri: Some(image_data_uri(&file.extension, &bytes)),
            }),
            Err(e) => {
                log::warn!("Unable to display image {}: {}", file.path, e);
                Payload::Image(ImagePayload { data_uri: None })
            }
        }
    } else {
        // Bytes that are not UTF-8 show as replacement characters
        match tokio::fs::read(&file.path).await {
            Ok(bytes) => Payload::Text(TextPayload::loaded(
                String::from_utf8_lossy(&bytes).into_owned(),
            )),
            Err(e) => {
                log::error!("Error loading file {}: {}", file.path, e);
                Payload::Text(TextPayload::failed(e))
            }
        }
    }
}
