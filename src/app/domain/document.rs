use std::path::{Path, PathBuf};

use url::Url;

use super::settings::AppSettings;
use super::signals::{DocumentSignal, SignalHub, Subscription};
use crate::app::services::text_ops::extract_filename;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Unix,
    Mac,
    Dos,
}

impl LineEnding {
    pub const ALL: [LineEnding; 3] = [LineEnding::Unix, LineEnding::Mac, LineEnding::Dos];

    /// Name of the radio action mirroring this line ending.
    pub fn action_name(self) -> &'static str {
        match self {
            LineEnding::Unix => "unix",
            LineEnding::Mac => "mac",
            LineEnding::Dos => "dos",
        }
    }

    pub fn from_action_name(name: &str) -> Option<LineEnding> {
        LineEnding::ALL.into_iter().find(|le| le.action_name() == name)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Unix => "\n",
            LineEnding::Mac => "\r",
            LineEnding::Dos => "\r\n",
        }
    }

    /// Detect the line ending of the first line break in `text`.
    pub fn detect(text: &str) -> LineEnding {
        match text.find(['\r', '\n']) {
            Some(i) if text[i..].starts_with("\r\n") => LineEnding::Dos,
            Some(i) if text.as_bytes()[i] == b'\r' => LineEnding::Mac,
            _ => LineEnding::Unix,
        }
    }
}

/// Kind of the current selection in the text view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionKind {
    #[default]
    None,
    Normal,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorPosition {
    pub line: usize,
    pub column: usize,
    /// Length of the selection, in characters.
    pub selection: usize,
    /// Byte offset of the insert mark in the text.
    pub offset: usize,
}

/// On-disk identity of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentFile {
    pub path: Option<PathBuf>,
    pub encoding: String,
    pub line_ending: LineEnding,
    pub read_only: bool,
    /// The file started with a byte order mark, written back on save.
    pub bom: bool,
}

pub const DEFAULT_ENCODING: &str = "UTF-8";

impl Default for DocumentFile {
    fn default() -> Self {
        Self {
            path: None,
            encoding: DEFAULT_ENCODING.to_string(),
            line_ending: LineEnding::default(),
            read_only: false,
            bom: false,
        }
    }
}

impl DocumentFile {
    pub fn uri(&self) -> Option<String> {
        let path = self.path.as_ref()?;
        Url::from_file_path(path).ok().map(|u| u.to_string())
    }
}

/// Content and metadata returned by the file engine.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedFile {
    pub text: String,
    pub encoding: String,
    pub line_ending: LineEnding,
    pub read_only: bool,
    pub bom: bool,
}

pub struct Document {
    pub id: DocumentId,
    pub file: DocumentFile,
    pub display_name: String,
    text: String,
    modified: bool,
    selection: SelectionKind,
    cursor: CursorPosition,
    overwrite: bool,
    pub word_wrap: bool,
    pub line_numbers: bool,
    pub auto_indent: bool,
    pub tab_size: u32,
    pub insert_spaces: bool,
    can_undo: bool,
    can_redo: bool,
    undo_lock: u32,
    signals: SignalHub,
}

impl Document {
    pub fn new_untitled(id: DocumentId, counter: u32, settings: &AppSettings) -> Self {
        let display_name = if counter <= 1 {
            "Untitled".to_string()
        } else {
            format!("Untitled {}", counter)
        };

        Self {
            id,
            file: DocumentFile::default(),
            display_name,
            text: String::new(),
            modified: false,
            selection: SelectionKind::None,
            cursor: CursorPosition::default(),
            overwrite: false,
            word_wrap: settings.word_wrap_enabled,
            line_numbers: settings.line_numbers_enabled,
            auto_indent: settings.auto_indent_enabled,
            tab_size: settings.tab_size,
            insert_spaces: settings.insert_spaces,
            can_undo: false,
            can_redo: false,
            undo_lock: 0,
            signals: SignalHub::default(),
        }
    }

    /// Empty document bound to `path`, ready for `load`.
    pub fn for_file(id: DocumentId, path: PathBuf, settings: &AppSettings) -> Self {
        let mut doc = Self::new_untitled(id, 0, settings);
        doc.set_path(path);
        doc
    }

    /// Point the document at a file. The content is not loaded.
    pub fn set_path(&mut self, path: PathBuf) {
        self.file.path = Some(path);
        self.update_display_name();
    }

    pub fn path(&self) -> Option<&Path> {
        self.file.path.as_deref()
    }

    pub fn is_untitled(&self) -> bool {
        self.file.path.is_none()
    }

    /// Untitled and unmodified: superseded when a real file is opened next to it.
    pub fn is_placeholder(&self) -> bool {
        self.is_untitled() && !self.modified
    }

    /// Replace the content with freshly loaded file data. Does not mark the
    /// document modified and does not record undo history.
    pub fn load(&mut self, loaded: LoadedFile) {
        self.lock_undo();
        self.set_text(&loaded.text);
        self.file.encoding = loaded.encoding;
        self.file.line_ending = loaded.line_ending;
        self.file.read_only = loaded.read_only;
        self.file.bom = loaded.bom;
        self.cursor = CursorPosition::default();
        self.unlock_undo();
        self.set_modified(false);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the whole buffer. Counts as an edit unless undo is locked.
    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        if self.cursor.offset > self.text.len() {
            self.cursor.offset = self.text.len();
        }
        if self.undo_lock == 0 {
            self.set_modified(true);
        }
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn set_modified(&mut self, modified: bool) {
        if self.modified != modified {
            self.modified = modified;
            self.emit(DocumentSignal::ModifiedChanged(modified));
        }
    }

    /// Store the save state in the undo engine.
    pub fn mark_save_point(&mut self) {
        self.set_modified(false);
    }

    pub fn lock_undo(&mut self) {
        self.undo_lock += 1;
    }

    pub fn unlock_undo(&mut self) {
        self.undo_lock = self.undo_lock.saturating_sub(1);
    }

    pub fn selection(&self) -> SelectionKind {
        self.selection
    }

    pub fn set_selection(&mut self, kind: SelectionKind) {
        if self.selection != kind {
            self.selection = kind;
            self.emit(DocumentSignal::SelectionChanged(kind));
        }
    }

    pub fn cursor(&self) -> CursorPosition {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: CursorPosition) {
        if self.cursor != cursor {
            self.cursor = cursor;
            self.emit(DocumentSignal::CursorChanged {
                line: cursor.line,
                column: cursor.column,
                selection: cursor.selection,
            });
        }
    }

    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    pub fn set_overwrite(&mut self, overwrite: bool) {
        if self.overwrite != overwrite {
            self.overwrite = overwrite;
            self.emit(DocumentSignal::OverwriteChanged(overwrite));
        }
    }

    pub fn can_undo(&self) -> bool {
        self.can_undo
    }

    pub fn can_redo(&self) -> bool {
        self.can_redo
    }

    pub fn set_can_undo(&mut self, can_undo: bool) {
        if self.can_undo != can_undo {
            self.can_undo = can_undo;
            self.emit(DocumentSignal::CanUndo(can_undo));
        }
    }

    pub fn set_can_redo(&mut self, can_redo: bool) {
        if self.can_redo != can_redo {
            self.can_redo = can_redo;
            self.emit(DocumentSignal::CanRedo(can_redo));
        }
    }

    /// Forwarded from the close button on the tab label.
    pub fn request_close(&self) {
        self.emit(DocumentSignal::CloseTab);
    }

    pub fn connect(&self, handler: impl Fn(DocumentId, &DocumentSignal) + 'static) -> Subscription {
        self.signals.connect(handler)
    }

    pub fn listener_count(&self) -> usize {
        self.signals.handler_count()
    }

    fn emit(&self, signal: DocumentSignal) {
        self.signals.emit(self.id, &signal);
    }

    pub fn update_display_name(&mut self) {
        if let Some(ref path) = self.file.path {
            self.display_name = extract_filename(&path.to_string_lossy());
        }
    }

    /// Full path for tooltips and the title bar, falling back to the display name.
    pub fn filename(&self) -> String {
        self.file
            .path
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|| self.display_name.clone())
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("path", &self.file.path)
            .field("modified", &self.modified)
            .finish_non_exhaustive()
    }
}
