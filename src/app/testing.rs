//! Scripted collaborators for unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use encoding_rs::Encoding;

use crate::app::context::{AppContext, Collaborators};
use crate::app::domain::document::{DocumentFile, LineEnding, LoadedFile};
use crate::app::domain::{AppSettings, DocumentId, ViewCommand};
use crate::app::infrastructure::collaborators::{
    Clipboard, Dialogs, FileEngine, RevertResponse, SaveChangesResponse, TextView,
};
use crate::app::infrastructure::error::{AppError, Result};
use crate::app::services::recent::{MemoryRecencyStore, RecencyStore};
use crate::app::state::WindowState;

/// Dialogs answering from queues. An empty queue cancels.
#[derive(Default)]
pub struct ScriptedDialogs {
    pub save_changes: RefCell<VecDeque<SaveChangesResponse>>,
    pub revert: RefCell<VecDeque<RevertResponse>>,
    pub save_as: RefCell<VecDeque<PathBuf>>,
    pub open: RefCell<Vec<PathBuf>>,
    pub encodings: RefCell<VecDeque<String>>,
    pub tab_size: Cell<Option<u32>>,
    pub confirm_clear: Cell<bool>,
    pub errors: RefCell<Vec<(String, Option<String>)>>,
    pub prompts: Cell<usize>,
}

impl ScriptedDialogs {
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.borrow().iter().map(|(m, _)| m.clone()).collect()
    }
}

impl Dialogs for ScriptedDialogs {
    fn save_changes(&self, _name: &str, _read_only: bool) -> SaveChangesResponse {
        self.prompts.set(self.prompts.get() + 1);
        self.save_changes
            .borrow_mut()
            .pop_front()
            .unwrap_or(SaveChangesResponse::Cancel)
    }

    fn revert(&self, _name: &str) -> RevertResponse {
        self.prompts.set(self.prompts.get() + 1);
        self.revert.borrow_mut().pop_front().unwrap_or(RevertResponse::Cancel)
    }

    fn save_as_path(&self, _suggested_name: &str, _current: Option<&Path>) -> Option<PathBuf> {
        self.save_as.borrow_mut().pop_front()
    }

    fn open_paths(&self, _current: Option<&Path>) -> Vec<PathBuf> {
        std::mem::take(&mut *self.open.borrow_mut())
    }

    fn choose_encoding(&self, _path: &Path, _failed: &str) -> Option<String> {
        self.encodings.borrow_mut().pop_front()
    }

    fn other_tab_size(&self, _current: u32) -> Option<u32> {
        self.tab_size.get()
    }

    fn confirm_clear_recent(&self) -> bool {
        self.confirm_clear.get()
    }

    fn show_error(&self, message: &str, detail: Option<&str>) {
        self.errors
            .borrow_mut()
            .push((message.to_string(), detail.map(str::to_string)));
    }
}

/// In-memory file system with failure injection.
#[derive(Default)]
pub struct MemoryFiles {
    pub files: RefCell<HashMap<PathBuf, Vec<u8>>>,
    pub read_only: RefCell<HashSet<PathBuf>>,
    pub failing_writes: RefCell<HashSet<PathBuf>>,
    pub writes: RefCell<Vec<PathBuf>>,
}

impl MemoryFiles {
    pub fn insert(&self, path: &str, contents: impl Into<Vec<u8>>) -> PathBuf {
        let path = PathBuf::from(path);
        self.files.borrow_mut().insert(path.clone(), contents.into());
        path
    }

    pub fn remove(&self, path: &Path) {
        self.files.borrow_mut().remove(path);
    }

    pub fn contents(&self, path: &Path) -> Option<String> {
        self.files
            .borrow()
            .get(path)
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    pub fn fail_writes_to(&self, path: &Path) {
        self.failing_writes.borrow_mut().insert(path.to_path_buf());
    }
}

impl FileEngine for MemoryFiles {
    fn read(&self, path: &Path, encoding: &str) -> Result<LoadedFile> {
        let bytes = self
            .files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "No such file"))?;
        let encoding = Encoding::for_label(encoding.as_bytes())
            .ok_or_else(|| AppError::Encoding(format!("Unknown encoding \"{}\"", encoding)))?;
        let text = encoding
            .decode_without_bom_handling_and_without_replacement(&bytes)
            .ok_or_else(|| AppError::Encoding(format!("Invalid byte sequence for {}", encoding.name())))?
            .into_owned();
        Ok(LoadedFile {
            line_ending: LineEnding::detect(&text),
            text,
            encoding: encoding.name().to_string(),
            read_only: self.read_only.borrow().contains(path),
            bom: false,
        })
    }

    fn write(&self, path: &Path, _file: &DocumentFile, text: &str) -> Result<()> {
        if self.failing_writes.borrow().contains(path) {
            return Err(std::io::Error::other("No space left on device").into());
        }
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), text.as_bytes().to_vec());
        self.writes.borrow_mut().push(path.to_path_buf());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.borrow().contains_key(path)
    }

    fn is_regular_file(&self, path: &Path) -> bool {
        self.exists(path)
    }
}

#[derive(Default)]
pub struct MockClipboard {
    text: RefCell<Option<String>>,
}

impl MockClipboard {
    pub fn set(&self, text: Option<&str>) {
        *self.text.borrow_mut() = text.map(str::to_string);
    }
}

impl Clipboard for MockClipboard {
    fn text(&self) -> Option<String> {
        self.text.borrow().clone()
    }
}

/// Records commands. Cut and copy put `next_copy` on the clipboard.
pub struct MockView {
    pub commands: RefCell<Vec<(DocumentId, ViewCommand)>>,
    pub next_copy: RefCell<Option<String>>,
    clipboard: Rc<MockClipboard>,
}

impl MockView {
    pub fn last(&self) -> Option<ViewCommand> {
        self.commands.borrow().last().map(|(_, c)| c.clone())
    }
}

impl TextView for MockView {
    fn execute(&self, doc: DocumentId, command: &ViewCommand) {
        if matches!(command, ViewCommand::Cut | ViewCommand::Copy)
            && let Some(text) = self.next_copy.borrow_mut().take()
        {
            self.clipboard.set(Some(&text));
        }
        self.commands.borrow_mut().push((doc, command.clone()));
    }
}

pub struct Harness {
    pub ctx: Rc<AppContext>,
    pub dialogs: Rc<ScriptedDialogs>,
    pub files: Rc<MemoryFiles>,
    pub clipboard: Rc<MockClipboard>,
    pub view: Rc<MockView>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(AppSettings::default())
    }

    pub fn with_settings(settings: AppSettings) -> Self {
        Self::build(settings, None, Box::new(MemoryRecencyStore::new()))
    }

    pub fn persisting(settings: AppSettings, path: PathBuf) -> Self {
        Self::build(settings, Some(path), Box::new(MemoryRecencyStore::new()))
    }

    pub fn with_store(store: Box<dyn RecencyStore>) -> Self {
        Self::build(AppSettings::default(), None, store)
    }

    fn build(settings: AppSettings, settings_path: Option<PathBuf>, store: Box<dyn RecencyStore>) -> Self {
        let dialogs = Rc::new(ScriptedDialogs::default());
        let files = Rc::new(MemoryFiles::default());
        let clipboard = Rc::new(MockClipboard::default());
        let view = Rc::new(MockView {
            commands: RefCell::new(Vec::new()),
            next_copy: RefCell::new(None),
            clipboard: Rc::clone(&clipboard),
        });
        let collab = Collaborators {
            files: files.clone(),
            dialogs: dialogs.clone(),
            clipboard: clipboard.clone(),
            view: view.clone(),
        };
        let mut ctx = AppContext::new(collab, settings, store);
        if let Some(path) = settings_path {
            ctx = ctx.persist_settings_to(path);
        }
        Self {
            ctx: Rc::new(ctx),
            dialogs,
            files,
            clipboard,
            view,
        }
    }

    pub fn window(&self) -> WindowState {
        WindowState::new(Rc::clone(&self.ctx))
    }
}
