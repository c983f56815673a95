//! Per-window controller.
//!
//! A `WindowState` owns the documents of one window, its action table and
//! the messages it posts for the frontend. Everything a window can do goes
//! through here: opening, saving and closing documents, moving tabs, the
//! menu actions, the idle menu rebuilds and the statusbar.

use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;

use super::context::AppContext;
use super::controllers::actions::{
    default_actions, derive_action_states, selection_sensitivity, Action, ActionInputs, ActionKind, ActionSet,
    ActionUpdate, NAVIGATION_GROUP, NAVIGATION_PREFIX, TAB_SIZE_OTHER, TAB_SIZE_PREFIX,
};
use super::controllers::idle::{RebuildTarget, WindowId};
use super::controllers::tabs::DocumentRegistry;
use super::controllers::transfer::{can_detach, drop_index, parse_uri_list, resolve_location, TabExtent};
use super::domain::document::{CursorPosition, Document, DocumentId, LineEnding, DEFAULT_ENCODING};
use super::domain::messages::{Message, ViewCommand};
use super::domain::settings::MAX_TAB_SIZE;
use super::domain::signals::{DocumentSignal, Subscription};
use super::infrastructure::collaborators::{RevertResponse, SaveChangesResponse};
use super::infrastructure::error::{AppError, Result};
use super::services::clipboard::PasteMenuRow;
use super::services::geometry::{GeometryTracker, WindowFlags};
use super::services::recent::{encoding_from_description, RecentMenuItem, RECENT_ACTION_PREFIX};
use super::services::text_ops::{self, SearchOptions};

pub const PACKAGE_NAME: &str = "QuillPad";

/// How a save that may involve a dialog ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Cancelled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusbarState {
    pub visible: bool,
    pub line: usize,
    pub column: usize,
    pub selection: usize,
    pub overwrite: bool,
}

type Inbox = Rc<std::cell::RefCell<Vec<(DocumentId, DocumentSignal)>>>;

pub struct WindowState {
    id: WindowId,
    ctx: Rc<AppContext>,
    registry: DocumentRegistry,
    subscriptions: HashMap<DocumentId, Subscription>,
    actions: ActionSet,
    inbox: Inbox,
    outbox: Vec<Message>,
    statusbar: StatusbarState,
    tabs_visible: bool,
    title: String,
    geometry: GeometryTracker,
    /// Go-to-tab action of each document, filled by the tab menu rebuild.
    navigation: HashMap<DocumentId, String>,
    recent_items: Vec<RecentMenuItem>,
    last_search: Option<(String, SearchOptions)>,
    last_match: Option<(DocumentId, Range<usize>)>,
    tab_menu_rebuilds: usize,
    recent_menu_rebuilds: usize,
    torn_down: bool,
}

impl WindowState {
    pub fn new(ctx: Rc<AppContext>) -> Self {
        let id = ctx.attach_window();
        let (actions, statusbar_visible) = {
            let settings = ctx.settings();
            (default_actions(&settings), settings.statusbar_visible)
        };

        let mut window = Self {
            id,
            ctx,
            registry: DocumentRegistry::new(),
            subscriptions: HashMap::new(),
            actions,
            inbox: Inbox::default(),
            outbox: Vec::new(),
            statusbar: StatusbarState {
                visible: statusbar_visible,
                ..StatusbarState::default()
            },
            tabs_visible: false,
            title: String::new(),
            geometry: GeometryTracker::new(),
            navigation: HashMap::new(),
            recent_items: Vec::new(),
            last_search: None,
            last_match: None,
            tab_menu_rebuilds: 0,
            recent_menu_rebuilds: 0,
            torn_down: false,
        };
        window.outbox.push(Message::StatusbarVisible(statusbar_visible));
        window.schedule(RebuildTarget::RecentMenu);
        tracing::debug!(window = id.0, "window created");
        window
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn registry(&self) -> &DocumentRegistry {
        &self.registry
    }

    pub fn actions(&self) -> &ActionSet {
        &self.actions
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn statusbar(&self) -> &StatusbarState {
        &self.statusbar
    }

    pub fn tabs_visible(&self) -> bool {
        self.tabs_visible
    }

    pub fn recent_items(&self) -> &[RecentMenuItem] {
        &self.recent_items
    }

    /// The registry became empty and the window must be destroyed.
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn tab_menu_rebuilds(&self) -> usize {
        self.tab_menu_rebuilds
    }

    pub fn recent_menu_rebuilds(&self) -> usize {
        self.recent_menu_rebuilds
    }

    /// Take every message posted since the last call.
    pub fn drain_messages(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.outbox)
    }

    pub fn schedule(&self, target: RebuildTarget) -> bool {
        if self.torn_down {
            return false;
        }
        self.ctx.schedule(self.id, target)
    }

    // --- Registry ---

    fn connect(&mut self, doc: &Document) {
        let inbox = Rc::clone(&self.inbox);
        let subscription = doc.connect(move |id, signal| inbox.borrow_mut().push((id, signal.clone())));
        self.subscriptions.insert(doc.id, subscription);
    }

    fn forget(&mut self, id: DocumentId) {
        self.subscriptions.remove(&id);
        self.navigation.remove(&id);
        if self.last_match.as_ref().is_some_and(|(doc, _)| *doc == id) {
            self.last_match = None;
        }
    }

    /// Add a document after the active tab and activate it. An active
    /// untitled, unmodified document is superseded by a document with a path.
    pub fn add(&mut self, doc: Document) {
        self.connect(&doc);
        let id = doc.id;
        let outcome = self.registry.add_document(doc, true);
        if let Some(replaced) = outcome.replaced {
            self.forget(replaced.id);
        }
        tracing::debug!(window = self.id.0, document = id.0, index = outcome.index, "document added");
        self.after_insert();
    }

    fn after_insert(&mut self) {
        self.schedule(RebuildTarget::TabMenu);
        self.update_tab_visibility();
        self.on_active_changed();
    }

    /// Take a document out of the window. The last removal tears the window down.
    pub fn remove_document(&mut self, id: DocumentId) -> Option<Document> {
        let was_active = self.registry.active_id() == Some(id);
        let doc = self.registry.remove_document(id)?;
        self.forget(id);
        tracing::debug!(window = self.id.0, document = id.0, "document removed");

        if self.registry.is_empty() {
            self.tear_down();
        } else {
            self.schedule(RebuildTarget::TabMenu);
            self.update_tab_visibility();
            if was_active {
                self.on_active_changed();
            } else {
                self.update_actions();
            }
        }
        Some(doc)
    }

    fn tear_down(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.ctx.cancel_idle(self.id);
        self.geometry.cancel();
        self.outbox.push(Message::WindowEmpty);
        tracing::debug!(window = self.id.0, "window empty");
    }

    pub fn set_active(&mut self, id: DocumentId) -> bool {
        if !self.registry.set_active(id) {
            return false;
        }
        self.on_active_changed();
        true
    }

    fn on_active_changed(&mut self) {
        let Some(id) = self.registry.active_id() else {
            return;
        };
        self.last_match = None;
        self.outbox.push(Message::ShowDocument(id));
        self.refresh_title();
        self.update_actions();
        self.refresh_statusbar();
    }

    fn update_tab_visibility(&mut self) {
        let visible = self.ctx.settings().always_show_tabs || self.registry.count() > 1;
        if visible != self.tabs_visible {
            self.tabs_visible = visible;
            self.outbox.push(Message::ShowTabs(visible));
        }
    }

    /// Run `f` on a member and then handle the notifications it caused.
    pub fn with_document<R>(&mut self, id: DocumentId, f: impl FnOnce(&mut Document) -> R) -> Option<R> {
        let result = self.registry.doc_by_id_mut(id).map(f);
        self.process_signals();
        result
    }

    fn with_active_document(&mut self, f: impl FnOnce(&mut Document)) {
        if let Some(id) = self.registry.active_id() {
            self.with_document(id, f);
        }
    }

    // --- Document notifications ---

    pub fn process_signals(&mut self) {
        loop {
            let pending = std::mem::take(&mut *self.inbox.borrow_mut());
            if pending.is_empty() {
                break;
            }
            for (id, signal) in pending {
                if self.registry.contains(id) {
                    self.on_document_signal(id, signal);
                }
            }
        }
    }

    fn on_document_signal(&mut self, id: DocumentId, signal: DocumentSignal) {
        if signal == DocumentSignal::CloseTab {
            self.close_document(id);
            return;
        }
        if self.registry.active_id() != Some(id) {
            return;
        }

        match signal {
            DocumentSignal::CursorChanged { line, column, selection } => {
                self.statusbar.line = line;
                self.statusbar.column = column;
                self.statusbar.selection = selection;
                self.outbox.push(Message::StatusbarCursor { line, column, selection });
            }
            DocumentSignal::OverwriteChanged(overwrite) => {
                self.statusbar.overwrite = overwrite;
                self.outbox.push(Message::StatusbarOverwrite(overwrite));
            }
            DocumentSignal::SelectionChanged(kind) => {
                let _lock = self.ctx.lock_menu_updates();
                let updates: Vec<ActionUpdate> = selection_sensitivity(kind)
                    .into_iter()
                    .map(|(name, sensitive)| ActionUpdate::Sensitive(name, sensitive))
                    .collect();
                self.actions.apply(&updates);
            }
            DocumentSignal::ModifiedChanged(_) => self.refresh_title(),
            DocumentSignal::CanUndo(can_undo) => {
                self.actions.set_sensitive("undo", can_undo);
            }
            DocumentSignal::CanRedo(can_redo) => {
                self.actions.set_sensitive("redo", can_redo);
            }
            DocumentSignal::CloseTab => {}
        }
    }

    fn refresh_title(&mut self) {
        let Some(doc) = self.registry.active_doc() else {
            return;
        };
        let name = if self.ctx.settings().path_in_title {
            doc.filename()
        } else {
            doc.display_name.clone()
        };
        let title = if doc.file.read_only {
            format!("{} [Read Only] - {}", name, PACKAGE_NAME)
        } else if doc.is_modified() {
            format!("*{} - {}", name, PACKAGE_NAME)
        } else {
            format!("{} - {}", name, PACKAGE_NAME)
        };
        if title != self.title {
            self.title = title.clone();
            self.outbox.push(Message::SetTitle(title));
        }
    }

    fn refresh_statusbar(&mut self) {
        let Some(doc) = self.registry.active_doc() else {
            return;
        };
        let cursor = doc.cursor();
        let overwrite = doc.overwrite();
        self.statusbar.line = cursor.line;
        self.statusbar.column = cursor.column;
        self.statusbar.selection = cursor.selection;
        self.statusbar.overwrite = overwrite;
        self.outbox.push(Message::StatusbarCursor {
            line: cursor.line,
            column: cursor.column,
            selection: cursor.selection,
        });
        self.outbox.push(Message::StatusbarOverwrite(overwrite));
    }

    fn set_statusbar_visible(&mut self, visible: bool) {
        if self.statusbar.visible != visible {
            self.statusbar.visible = visible;
            self.outbox.push(Message::StatusbarVisible(visible));
        }
    }

    // --- Action state ---

    /// Bring every document-dependent action in line with the active document.
    pub fn update_actions(&mut self) {
        let Some(index) = self.registry.active_index() else {
            return;
        };
        let _lock = self.ctx.lock_menu_updates();

        let inputs = {
            let Some(doc) = self.registry.active_doc() else {
                return;
            };
            let settings = self.ctx.settings();
            let mut inputs = ActionInputs::new(doc, index, self.registry.count(), &settings, &self.actions);
            inputs.navigation_action = self.navigation.get(&doc.id).cloned();
            inputs
        };

        for name in self.actions.apply(&derive_action_states(&inputs)) {
            self.on_action_toggled(&name);
        }
    }

    /// Trigger an action as the user would. Returns false when the action
    /// is unknown, hidden or insensitive.
    pub fn activate(&mut self, name: &str) -> bool {
        let Some(action) = self.actions.get(name) else {
            tracing::debug!(action = name, "unknown action");
            return false;
        };
        if !action.sensitive || !action.visible {
            return false;
        }

        match action.kind.clone() {
            ActionKind::Toggle { active } => {
                self.actions.set_active(name, !active);
                self.on_action_toggled(name);
                return true;
            }
            ActionKind::Radio { .. } => {
                if self.actions.set_active(name, true) || name == TAB_SIZE_OTHER {
                    self.on_action_toggled(name);
                }
                return true;
            }
            ActionKind::Simple => {}
        }

        if let Some(command) = ViewCommand::for_action(name) {
            self.execute_view(command);
            return true;
        }

        if name.starts_with(RECENT_ACTION_PREFIX) {
            let uri = self
                .recent_items
                .iter()
                .find(|item| item.action_name == name)
                .map(|item| item.uri.clone());
            if let Some(uri) = uri {
                self.open_recent(&uri);
            }
            return true;
        }

        match name {
            "new" => self.new_document(),
            "new-window" => self.outbox.push(Message::NewWindow),
            "open" => {
                self.open_dialog();
            }
            "clear-recent" => self.clear_recent(),
            "save" => {
                self.save();
            }
            "save-as" => {
                self.save_as();
            }
            "save-all" => {
                self.save_all();
            }
            "revert" => {
                self.revert();
            }
            "print" => {
                if let Some(id) = self.registry.active_id() {
                    self.outbox.push(Message::Print(id));
                }
            }
            "detach" => {
                self.detach();
            }
            "close" => {
                if let Some(id) = self.registry.active_id() {
                    self.close_document(id);
                }
            }
            "close-window" => {
                self.close_window();
            }
            "paste-history" => {
                let rows = self.paste_history_menu();
                self.outbox.push(Message::ShowPasteHistory(rows));
            }
            "find" => self.outbox.push(Message::ShowSearch { replace: false }),
            "replace" => self.outbox.push(Message::ShowSearch { replace: true }),
            "find-next" | "find-previous" => {
                if let Some((needle, options)) = self.last_search.clone() {
                    self.search_next(&needle, options, name == "find-next");
                }
            }
            "go-to" => self.outbox.push(Message::ShowGoTo),
            "back" => {
                self.previous_tab();
            }
            "forward" => {
                self.next_tab();
            }
            _ => {
                tracing::debug!(action = name, "action without handler");
                return false;
            }
        }
        true
    }

    /// Handler of toggles and radios, run after their checked state changed.
    /// Does nothing while menu updates are locked.
    fn on_action_toggled(&mut self, name: &str) {
        if self.ctx.menu_updates_locked() {
            return;
        }
        let active = self.actions.is_active(name);

        match name {
            "statusbar" => {
                self.ctx.update_settings(|s| s.statusbar_visible = active);
                self.set_statusbar_visible(active);
            }
            "line-numbers" => {
                self.ctx.update_settings(|s| s.line_numbers_enabled = active);
                self.with_active_document(|doc| doc.line_numbers = active);
            }
            "word-wrap" => {
                self.ctx.update_settings(|s| s.word_wrap_enabled = active);
                self.with_active_document(|doc| doc.word_wrap = active);
            }
            "auto-indent" => {
                self.ctx.update_settings(|s| s.auto_indent_enabled = active);
                self.with_active_document(|doc| doc.auto_indent = active);
            }
            "insert-spaces" => {
                self.ctx.update_settings(|s| s.insert_spaces = active);
                self.with_active_document(|doc| doc.insert_spaces = active);
            }
            _ if name == TAB_SIZE_OTHER || name.starts_with(TAB_SIZE_PREFIX) => {
                if active {
                    self.on_tab_size(name);
                }
            }
            _ if name.starts_with(NAVIGATION_PREFIX) => {
                let target = self
                    .navigation
                    .iter()
                    .find(|(_, action)| action.as_str() == name)
                    .map(|(id, _)| *id);
                if let (true, Some(id)) = (active, target) {
                    self.set_active(id);
                }
            }
            _ => {
                if let (true, Some(ending)) = (active, LineEnding::from_action_name(name)) {
                    self.with_active_document(|doc| {
                        doc.file.line_ending = ending;
                        doc.set_modified(true);
                    });
                }
            }
        }
    }

    fn on_tab_size(&mut self, name: &str) {
        let Some(current) = self.registry.active_doc().map(|d| d.tab_size) else {
            return;
        };
        let size = match name.strip_prefix(TAB_SIZE_PREFIX).and_then(|n| n.parse::<u32>().ok()) {
            Some(size) => size,
            None => self.ctx.dialogs().other_tab_size(current).unwrap_or(current),
        }
        .clamp(1, MAX_TAB_SIZE);

        self.ctx.update_settings(|s| s.tab_size = size);
        self.with_active_document(|doc| doc.tab_size = size);
        self.update_actions();
    }

    fn execute_view(&mut self, command: ViewCommand) {
        let Some(id) = self.registry.active_id() else {
            return;
        };
        let copies = matches!(command, ViewCommand::Cut | ViewCommand::Copy);
        self.ctx.view().execute(id, &command);
        if copies {
            self.ctx.record_clipboard();
        }
    }

    // --- Idle menu rebuilds ---

    /// Run this window's pending rebuilds. Returns how many ran.
    pub fn run_idle(&mut self) -> usize {
        let mut ran = 0;
        while let Some(target) = self.ctx.pop_idle(self.id) {
            match target {
                RebuildTarget::TabMenu => self.rebuild_tab_menu(),
                RebuildTarget::RecentMenu => self.rebuild_recent_menu(),
            }
            ran += 1;
        }
        ran
    }

    fn rebuild_tab_menu(&mut self) {
        let _lock = self.ctx.lock_menu_updates();

        self.actions.remove_with_prefix(NAVIGATION_PREFIX);
        self.navigation.clear();

        let active = self.registry.active_id();
        let mut active_action = None;
        for (index, doc) in self.registry.documents().iter().enumerate() {
            let name = format!("{}{}", NAVIGATION_PREFIX, index);
            let mut action = Action::radio(&name, &doc.display_name, NAVIGATION_GROUP, index as i32)
                .with_tooltip(&doc.filename());
            if index < 9 {
                action = action.with_accel(&format!("<Alt>{}", index + 1));
            }
            self.actions.add(action);
            if Some(doc.id) == active {
                active_action = Some(name.clone());
            }
            self.navigation.insert(doc.id, name);
        }

        if let Some(name) = active_action
            && self.actions.set_active(&name, true)
        {
            self.on_action_toggled(&name);
        }

        self.tab_menu_rebuilds += 1;
        tracing::debug!(window = self.id.0, tabs = self.registry.count(), "tab menu rebuilt");
    }

    fn rebuild_recent_menu(&mut self) {
        let _lock = self.ctx.lock_menu_updates();

        self.actions.remove_with_prefix(RECENT_ACTION_PREFIX);

        let ctx = Rc::clone(&self.ctx);
        let limit = ctx.settings().recent_menu_items;
        let items = ctx.recent_mut().build_menu(limit, |path| ctx.files().exists(path));

        for item in &items {
            self.actions
                .add(Action::simple(&item.action_name, &item.label).with_tooltip(&item.tooltip));
        }
        self.actions.set_visible("no-recent-items", items.is_empty());
        self.actions.set_sensitive("clear-recent", !items.is_empty());
        self.recent_items = items;

        self.recent_menu_rebuilds += 1;
        tracing::debug!(window = self.id.0, items = self.recent_items.len(), "recent menu rebuilt");
    }

    // --- Opening ---

    pub fn new_document(&mut self) {
        let doc = self.ctx.new_untitled();
        self.add(doc);
    }

    /// Open `path`, or activate its tab if it is already open here.
    ///
    /// Decoding failures ask for another encoding until the file decodes or
    /// the user gives up. Returns whether the file ended up open.
    pub fn open_file(&mut self, path: &Path, encoding: Option<&str>) -> bool {
        let ctx = Rc::clone(&self.ctx);
        let resolved = ctx.files().resolve(path);
        let path = resolved.as_path();
        if let Some(id) = self.registry.find_by_path(path) {
            tracing::debug!(path = %path.display(), "file already open");
            self.set_active(id);
            return true;
        }

        let mut encoding = encoding.unwrap_or(DEFAULT_ENCODING).to_string();
        let loaded = loop {
            match ctx.files().read(path, &encoding) {
                Ok(loaded) => break loaded,
                Err(e) if e.is_encoding() => {
                    tracing::debug!(path = %path.display(), encoding, error = %e, "decode failed");
                    match ctx.dialogs().choose_encoding(path, &encoding) {
                        Some(next) => encoding = next,
                        None => return false,
                    }
                }
                Err(e) => {
                    ctx.dialogs().show_error("Failed to open file", Some(&e.to_string()));
                    return false;
                }
            }
        };

        let mut doc = ctx.document_for_file(path.to_path_buf());
        doc.load(loaded);
        let encoding = doc.file.encoding.clone();
        tracing::debug!(path = %path.display(), encoding, "file opened");
        self.add(doc);
        self.record_recent(path, &encoding);
        true
    }

    /// Open several files with menu updates locked, then rebuild once.
    pub fn open_files(&mut self, paths: &[PathBuf]) -> usize {
        let mut opened = 0;
        {
            let _lock = self.ctx.lock_menu_updates();
            for path in paths {
                if self.open_file(path, None) {
                    opened += 1;
                }
            }
        }
        self.schedule(RebuildTarget::TabMenu);
        self.schedule(RebuildTarget::RecentMenu);
        opened
    }

    /// Open paths or `file://` uris, relative ones against `working_dir`.
    pub fn open_locations(&mut self, locations: &[String], working_dir: Option<&Path>) -> usize {
        let paths: Vec<PathBuf> = locations
            .iter()
            .filter_map(|location| resolve_location(location, working_dir))
            .collect();
        self.open_files(&paths)
    }

    /// Handle a dropped `text/uri-list`.
    pub fn drop_uris(&mut self, data: &str) -> usize {
        self.open_locations(&parse_uri_list(data), None)
    }

    pub fn open_dialog(&mut self) -> usize {
        let current = self.registry.active_doc().and_then(|d| d.path().map(Path::to_path_buf));
        let paths = self.ctx.dialogs().open_paths(current.as_deref());
        self.open_files(&paths)
    }

    pub fn new_from_template(&mut self, path: &Path) -> bool {
        match self.load_template(path) {
            Ok(doc) => {
                self.add(doc);
                true
            }
            Err(e) => {
                self.ctx
                    .dialogs()
                    .show_error("Failed to open new file from a template", Some(&e.to_string()));
                false
            }
        }
    }

    fn load_template(&self, path: &Path) -> Result<Document> {
        if !self.ctx.files().is_regular_file(path) {
            return Err(AppError::Validation(format!("\"{}\" is not a regular file", path.display())));
        }
        let loaded = self.ctx.files().read(path, DEFAULT_ENCODING).map_err(|e| {
            if e.is_encoding() {
                AppError::Validation("The template is not UTF-8 valid".to_string())
            } else {
                e
            }
        })?;

        let mut doc = self.ctx.new_untitled();
        doc.lock_undo();
        doc.set_text(&loaded.text);
        doc.file.line_ending = loaded.line_ending;
        doc.unlock_undo();
        Ok(doc)
    }

    fn record_recent(&mut self, path: &Path, encoding: &str) {
        if let Err(e) = self.ctx.recent_mut().record(path, encoding) {
            tracing::warn!(path = %path.display(), error = %e, "failed to record recent file");
        }
        self.schedule(RebuildTarget::RecentMenu);
    }

    // --- Recent files ---

    /// Reopen a recent file with the encoding it was last used with.
    pub fn open_recent(&mut self, uri: &str) -> bool {
        let Some(entry) = self.ctx.recent().entry(uri) else {
            return false;
        };
        let encoding = entry
            .description
            .as_deref()
            .and_then(encoding_from_description)
            .map(str::to_string);

        let opened = match entry.path() {
            Some(path) if self.ctx.files().exists(&path) => self.open_file(&path, encoding.as_deref()),
            path => {
                let shown = path.map(|p| p.display().to_string()).unwrap_or_else(|| uri.to_string());
                self.ctx.dialogs().show_error(
                    "Failed to open file",
                    Some(&format!(
                        "Failed to open \"{}\" for reading. It will be removed from the document history",
                        shown
                    )),
                );
                false
            }
        };

        if opened {
            self.ctx.recent_mut().touch(uri);
        } else {
            self.ctx.recent_mut().forget(uri);
        }
        self.schedule(RebuildTarget::RecentMenu);
        opened
    }

    pub fn clear_recent(&mut self) {
        if !self.ctx.dialogs().confirm_clear_recent() {
            return;
        }
        let result = {
            let _lock = self.ctx.lock_menu_updates();
            self.ctx.recent_mut().clear()
        };
        if let Err(e) = result {
            self.ctx
                .dialogs()
                .show_error("Failed to clear the recent history", Some(&e.to_string()));
        }
        self.schedule(RebuildTarget::RecentMenu);
    }

    // --- Saving ---

    fn save_document(&mut self, id: DocumentId) -> Result<SaveOutcome> {
        let Some(doc) = self.registry.doc_by_id(id) else {
            return Ok(SaveOutcome::Cancelled);
        };
        let path = match doc.path() {
            Some(path) if !doc.file.read_only => path.to_path_buf(),
            _ => return self.save_as_document(id),
        };

        self.ctx.files().write(&path, &doc.file, doc.text())?;
        tracing::debug!(document = id.0, path = %path.display(), "document saved");
        self.with_document(id, Document::mark_save_point);
        Ok(SaveOutcome::Saved)
    }

    fn save_as_document(&mut self, id: DocumentId) -> Result<SaveOutcome> {
        let Some(doc) = self.registry.doc_by_id(id) else {
            return Ok(SaveOutcome::Cancelled);
        };
        let Some(path) = self.ctx.dialogs().save_as_path(&doc.display_name, doc.path()) else {
            return Ok(SaveOutcome::Cancelled);
        };

        let mut file = doc.file.clone();
        file.path = Some(path.clone());
        file.read_only = false;
        self.ctx.files().write(&path, &file, doc.text())?;
        tracing::debug!(document = id.0, path = %path.display(), "document saved as");

        let encoding = file.encoding.clone();
        self.with_document(id, |doc| {
            doc.file = file;
            doc.update_display_name();
            doc.mark_save_point();
        });
        self.record_recent(&path, &encoding);
        self.schedule(RebuildTarget::TabMenu);
        self.refresh_title();
        self.update_actions();
        Ok(SaveOutcome::Saved)
    }

    /// Surface an error from a save. True only when the save went through.
    fn report_save(&self, result: Result<SaveOutcome>) -> bool {
        match result {
            Ok(SaveOutcome::Saved) => true,
            Ok(SaveOutcome::Cancelled) => false,
            Err(e) => {
                self.ctx
                    .dialogs()
                    .show_error("Failed to save the document", Some(&e.to_string()));
                false
            }
        }
    }

    pub fn save(&mut self) -> bool {
        let Some(id) = self.registry.active_id() else {
            return false;
        };
        let result = self.save_document(id);
        self.report_save(result)
    }

    pub fn save_as(&mut self) -> bool {
        let Some(id) = self.registry.active_id() else {
            return false;
        };
        let result = self.save_as_document(id);
        self.report_save(result)
    }

    /// Save every modified document. Documents with a path are written
    /// first; a failure stops there and focuses the failing tab. Then the
    /// others go through save-as one by one until one is cancelled.
    pub fn save_all(&mut self) -> bool {
        let Some(original) = self.registry.active_id() else {
            return true;
        };

        let mut unnamed = Vec::new();
        let mut failure = None;
        for id in self.registry.ids() {
            let Some(doc) = self.registry.doc_by_id(id) else {
                continue;
            };
            if !doc.is_modified() {
                continue;
            }
            let Some(path) = doc.path().filter(|_| !doc.file.read_only) else {
                unnamed.push(id);
                continue;
            };
            match self.ctx.files().write(path, &doc.file, doc.text()) {
                Ok(()) => {
                    if let Some(doc) = self.registry.doc_by_id_mut(id) {
                        doc.mark_save_point();
                    }
                }
                Err(e) => {
                    failure = Some((id, e));
                    break;
                }
            }
        }
        self.process_signals();

        if let Some((id, e)) = failure {
            tracing::debug!(document = id.0, error = %e, "save all stopped");
            self.set_active(id);
            self.ctx
                .dialogs()
                .show_error("Failed to save the document", Some(&e.to_string()));
            return false;
        }

        for id in unnamed.into_iter().rev() {
            if !self.registry.contains(id) {
                continue;
            }
            self.set_active(id);
            let result = self.save_as_document(id);
            if !self.report_save(result) {
                return false;
            }
        }

        self.set_active(original);
        true
    }

    /// Reload the active document from disk, asking first if it is modified.
    pub fn revert(&mut self) -> bool {
        let Some(doc) = self.registry.active_doc() else {
            return false;
        };
        let id = doc.id;
        let Some(path) = doc.path().map(Path::to_path_buf) else {
            return false;
        };
        if doc.is_modified() {
            match self.ctx.dialogs().revert(&doc.display_name) {
                RevertResponse::Revert => {}
                RevertResponse::SaveAs => {
                    let result = self.save_as_document(id);
                    if !self.report_save(result) {
                        return false;
                    }
                }
                RevertResponse::Cancel => return false,
            }
        }

        let (path, encoding) = match self.registry.doc_by_id(id) {
            Some(doc) => (doc.path().map(Path::to_path_buf).unwrap_or(path), doc.file.encoding.clone()),
            None => return false,
        };
        match self.ctx.files().read(&path, &encoding) {
            Ok(loaded) => {
                self.with_document(id, |doc| doc.load(loaded));
                self.refresh_title();
                self.update_actions();
                true
            }
            Err(e) => {
                self.ctx
                    .dialogs()
                    .show_error("Failed to reload the document", Some(&e.to_string()));
                false
            }
        }
    }

    // --- Closing ---

    /// Close a document, prompting when it has unsaved changes. Returns
    /// whether the document was destroyed.
    pub fn close_document(&mut self, id: DocumentId) -> bool {
        let Some(doc) = self.registry.doc_by_id(id) else {
            return false;
        };

        if doc.is_modified() {
            let proceed = match self.ctx.dialogs().save_changes(&doc.display_name, doc.file.read_only) {
                SaveChangesResponse::Save => {
                    let result = self.save_document(id);
                    self.report_save(result)
                }
                SaveChangesResponse::SaveAs => {
                    let result = self.save_as_document(id);
                    self.report_save(result)
                }
                SaveChangesResponse::DontSave => true,
                SaveChangesResponse::Cancel => false,
            };
            if !proceed {
                tracing::debug!(document = id.0, "close cancelled");
                return false;
            }
        }

        self.remove_document(id).is_some()
    }

    /// Close every document, last tab first. Stops at the first cancel.
    pub fn close_window(&mut self) -> bool {
        let lock = self.ctx.lock_menu_updates();
        for id in self.registry.ids().into_iter().rev() {
            self.set_active(id);
            if !self.close_document(id) {
                drop(lock);
                self.schedule(RebuildTarget::TabMenu);
                return false;
            }
        }
        drop(lock);
        self.tear_down();
        true
    }

    // --- Tab transfer ---

    /// Move the active document to a new window.
    pub fn detach(&mut self) -> bool {
        match self.registry.active_id() {
            Some(id) => self.detach_document(id, None),
            None => false,
        }
    }

    /// Move a document to a new window, e.g. after dragging its tab onto
    /// empty screen space. A lone tab stays where it is.
    pub fn detach_document(&mut self, id: DocumentId, position: Option<(i32, i32)>) -> bool {
        if !can_detach(self.registry.count()) {
            return false;
        }
        let Some(document) = self.remove_document(id) else {
            return false;
        };
        tracing::debug!(window = self.id.0, document = id.0, "document detached");
        self.outbox.push(Message::NewWindowWithDocument { document, position });
        true
    }

    /// Hand a document over to another window.
    pub fn take_document(&mut self, id: DocumentId) -> Option<Document> {
        self.remove_document(id)
    }

    /// Insert a document dragged in from another window at the drop point.
    pub fn receive_document(&mut self, document: Document, layout: &[TabExtent], x: i32) {
        self.connect(&document);
        let id = document.id;
        let index = self.registry.insert_at(document, drop_index(layout, x));
        tracing::debug!(window = self.id.0, document = id.0, index, "document received");
        self.after_insert();
    }

    /// Move a tab within this window to the drop point.
    pub fn reorder_tab(&mut self, id: DocumentId, layout: &[TabExtent], x: i32) {
        let Some(from) = self.registry.position_of(id) else {
            return;
        };
        self.registry.move_tab(from, drop_index(layout, x));
        self.schedule(RebuildTarget::TabMenu);
        self.update_actions();
    }

    // --- Navigation ---

    pub fn previous_tab(&mut self) -> bool {
        if !self.actions.is_sensitive("back") {
            return false;
        }
        match self.registry.prev_doc_id() {
            Some(id) => self.set_active(id),
            None => false,
        }
    }

    pub fn next_tab(&mut self) -> bool {
        if !self.actions.is_sensitive("forward") {
            return false;
        }
        match self.registry.next_doc_id() {
            Some(id) => self.set_active(id),
            None => false,
        }
    }

    // --- Search ---

    /// Highlight every match in the active document. Returns the match count.
    pub fn search_highlight(&mut self, needle: &str, options: SearchOptions) -> usize {
        let Some(doc) = self.registry.active_doc() else {
            return 0;
        };
        let matches = text_ops::find_all(doc.text(), needle, options);
        let count = matches.len();
        self.ctx.view().execute(doc.id, &ViewCommand::Highlight(matches));
        count
    }

    /// Select the next (or previous) match, wrapping around the document.
    pub fn search_next(&mut self, needle: &str, options: SearchOptions, forward: bool) -> bool {
        self.last_search = Some((needle.to_string(), options));
        let Some(doc) = self.registry.active_doc() else {
            return false;
        };
        let id = doc.id;
        let previous = self
            .last_match
            .as_ref()
            .filter(|(doc, _)| *doc == id)
            .map(|(_, range)| range.clone());

        let found = if forward {
            let from = previous.map_or(doc.cursor().offset, |r| r.end);
            text_ops::find_next(doc.text(), needle, from, options)
        } else {
            let before = previous.map_or(doc.cursor().offset, |r| r.start);
            text_ops::find_previous(doc.text(), needle, before, options)
        };
        let Some(range) = found else {
            return false;
        };

        let cursor = cursor_at(doc.text(), range.end, range.start);
        self.ctx.view().execute(id, &ViewCommand::Select(range.clone()));
        self.last_match = Some((id, range));
        self.with_document(id, |doc| doc.set_cursor(cursor));
        true
    }

    /// Replace every match in the active document, or in all documents of
    /// the window. Returns the number of replacements.
    pub fn replace(&mut self, needle: &str, replacement: &str, options: SearchOptions, all_documents: bool) -> usize {
        let ids = if all_documents {
            self.registry.ids()
        } else {
            self.registry.active_id().into_iter().collect()
        };

        let mut total = 0;
        for id in ids {
            let Some(doc) = self.registry.doc_by_id_mut(id) else {
                continue;
            };
            let (text, count) = text_ops::replace_all(doc.text(), needle, replacement, options);
            if count > 0 {
                doc.set_text(&text);
                total += count;
            }
        }
        self.last_match = None;
        self.process_signals();
        tracing::debug!(needle, total, all_documents, "replaced");
        total
    }

    /// Put the cursor at the start of a 1-based line.
    pub fn go_to_line(&mut self, line: usize) -> bool {
        let Some(doc) = self.registry.active_doc() else {
            return false;
        };
        let id = doc.id;
        let Some(offset) = text_ops::line_number_to_byte_position(doc.text(), line) else {
            return false;
        };
        let cursor = cursor_at(doc.text(), offset, offset);
        self.with_document(id, |doc| doc.set_cursor(cursor));
        self.ctx.view().execute(id, &ViewCommand::Select(offset..offset));
        self.ctx.view().execute(id, &ViewCommand::ScrollToCursor);
        true
    }

    // --- Clipboard history ---

    pub fn paste_history_menu(&self) -> Vec<PasteMenuRow> {
        let current = self.ctx.clipboard().text();
        self.ctx.clipboard_history().build_menu(current.as_deref())
    }

    pub fn paste_from_history(&mut self, index: usize) -> bool {
        let Some(text) = self.ctx.clipboard_history().get(index).map(str::to_string) else {
            return false;
        };
        self.execute_view(ViewCommand::PasteText(text));
        true
    }

    // --- Geometry ---

    pub fn move_to(&mut self, x: i32, y: i32) {
        self.outbox.push(Message::MoveTo { x, y });
    }

    pub fn on_configure(&mut self, width: i32, height: i32, now: Instant) {
        self.geometry.on_configure(width, height, now);
    }

    /// Persist the window size once resizing has settled. Returns whether
    /// the size was written.
    pub fn poll_geometry(&mut self, now: Instant, flags: WindowFlags) -> bool {
        let Some((width, height)) = self.geometry.poll(now, flags) else {
            return false;
        };
        if !self.ctx.settings().remember_geometry {
            return false;
        }
        self.ctx.update_settings(|s| {
            s.window_width = width;
            s.window_height = height;
        });
        true
    }
}

impl Drop for WindowState {
    fn drop(&mut self) {
        self.ctx.release_window(self.id);
    }
}

/// Cursor at byte `offset` with the selection reaching back to `anchor`.
/// Line and column are 1-based.
fn cursor_at(text: &str, offset: usize, anchor: usize) -> CursorPosition {
    let before = &text[..offset];
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    CursorPosition {
        line: before.matches('\n').count() + 1,
        column: before[line_start..].chars().count() + 1,
        selection: text[anchor.min(offset)..offset].chars().count(),
        offset,
    }
}

impl std::fmt::Debug for WindowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowState")
            .field("id", &self.id)
            .field("registry", &self.registry)
            .field("title", &self.title)
            .field("torn_down", &self.torn_down)
            .finish_non_exhaustive()
    }
}
