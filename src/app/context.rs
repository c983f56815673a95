//! State shared by every window of the process.
//!
//! One `AppContext` lives behind an `Rc` for the whole application. It holds
//! the collaborators, the preferences, the recent-file history, the
//! clipboard history, the idle rebuild queue and the menu-update lock.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::path::PathBuf;
use std::rc::Rc;

use crate::app::controllers::idle::{IdleQueue, RebuildTarget, WindowId};
use crate::app::domain::document::{Document, DocumentId};
use crate::app::domain::settings::AppSettings;
use crate::app::infrastructure::collaborators::{Clipboard, Dialogs, FileEngine, TextView};
use crate::app::services::clipboard::ClipboardHistory;
use crate::app::services::recent::{RecencyStore, RecentHistory};

/// The outside world, as seen by the windows.
#[derive(Clone)]
pub struct Collaborators {
    pub files: Rc<dyn FileEngine>,
    pub dialogs: Rc<dyn Dialogs>,
    pub clipboard: Rc<dyn Clipboard>,
    pub view: Rc<dyn TextView>,
}

/// Held while menus are updated programmatically. Action handlers that
/// would write preferences or touch documents do nothing while any guard is
/// alive, and idle rebuilds are not scheduled.
#[must_use = "the lock is released when the guard is dropped"]
pub struct MenuUpdateLock {
    counter: Rc<Cell<u32>>,
}

impl Drop for MenuUpdateLock {
    fn drop(&mut self) {
        self.counter.set(self.counter.get().saturating_sub(1));
    }
}

pub struct AppContext {
    collab: Collaborators,
    settings: RefCell<AppSettings>,
    settings_path: Option<PathBuf>,
    recent: RefCell<RecentHistory>,
    clipboard_history: RefCell<ClipboardHistory>,
    idle: RefCell<IdleQueue>,
    menu_lock: Rc<Cell<u32>>,
    live_windows: Cell<usize>,
    next_window: Cell<u64>,
    next_document: Cell<u64>,
    next_untitled: Cell<u32>,
}

impl AppContext {
    pub fn new(collab: Collaborators, settings: AppSettings, recent_store: Box<dyn RecencyStore>) -> Self {
        Self {
            collab,
            settings: RefCell::new(settings),
            settings_path: None,
            recent: RefCell::new(RecentHistory::new(recent_store)),
            clipboard_history: RefCell::new(ClipboardHistory::new()),
            idle: RefCell::new(IdleQueue::new()),
            menu_lock: Rc::new(Cell::new(0)),
            live_windows: Cell::new(0),
            next_window: Cell::new(1),
            next_document: Cell::new(1),
            next_untitled: Cell::new(1),
        }
    }

    /// Write preference changes to `path` as they happen.
    pub fn persist_settings_to(mut self, path: PathBuf) -> Self {
        self.settings_path = Some(path);
        self
    }

    pub fn files(&self) -> &dyn FileEngine {
        self.collab.files.as_ref()
    }

    pub fn dialogs(&self) -> &dyn Dialogs {
        self.collab.dialogs.as_ref()
    }

    pub fn clipboard(&self) -> &dyn Clipboard {
        self.collab.clipboard.as_ref()
    }

    pub fn view(&self) -> &dyn TextView {
        self.collab.view.as_ref()
    }

    // --- Preferences ---

    pub fn settings(&self) -> Ref<'_, AppSettings> {
        self.settings.borrow()
    }

    /// Change preferences and persist them when a settings file is set.
    pub fn update_settings(&self, f: impl FnOnce(&mut AppSettings)) {
        let mut settings = self.settings.borrow_mut();
        let before = settings.clone();
        f(&mut settings);
        if *settings == before {
            return;
        }
        if let Some(ref path) = self.settings_path
            && let Err(e) = settings.save_to(path)
        {
            tracing::warn!(path = %path.display(), error = %e, "failed to save settings");
        }
    }

    // --- Menu-update lock ---

    pub fn lock_menu_updates(&self) -> MenuUpdateLock {
        self.menu_lock.set(self.menu_lock.get() + 1);
        MenuUpdateLock {
            counter: Rc::clone(&self.menu_lock),
        }
    }

    pub fn menu_updates_locked(&self) -> bool {
        self.menu_lock.get() > 0
    }

    // --- Idle rebuilds ---

    /// Queue a menu rebuild. Suppressed while menu updates are locked and
    /// coalesced with a pending rebuild of the same target.
    pub fn schedule(&self, window: WindowId, target: RebuildTarget) -> bool {
        if self.menu_updates_locked() {
            tracing::trace!(window = window.0, ?target, "rebuild suppressed by menu lock");
            return false;
        }
        self.idle.borrow_mut().schedule(window, target)
    }

    pub fn is_scheduled(&self, window: WindowId, target: RebuildTarget) -> bool {
        self.idle.borrow().is_pending(window, target)
    }

    pub fn pop_idle(&self, window: WindowId) -> Option<RebuildTarget> {
        self.idle.borrow_mut().pop_for(window)
    }

    pub fn cancel_idle(&self, window: WindowId) {
        self.idle.borrow_mut().cancel_window(window);
    }

    pub fn idle_is_empty(&self) -> bool {
        self.idle.borrow().is_empty()
    }

    // --- Windows ---

    pub fn attach_window(&self) -> WindowId {
        let id = WindowId(self.next_window.get());
        self.next_window.set(id.0 + 1);
        self.live_windows.set(self.live_windows.get() + 1);
        id
    }

    /// Forget a destroyed window. The clipboard history goes with the last one.
    pub fn release_window(&self, window: WindowId) {
        self.idle.borrow_mut().cancel_window(window);
        let live = self.live_windows.get().saturating_sub(1);
        self.live_windows.set(live);
        if live == 0 {
            tracing::debug!("last window gone, dropping clipboard history");
            self.clipboard_history.borrow_mut().clear();
        }
    }

    pub fn live_windows(&self) -> usize {
        self.live_windows.get()
    }

    // --- Documents ---

    pub fn next_document_id(&self) -> DocumentId {
        let id = DocumentId(self.next_document.get());
        self.next_document.set(id.0 + 1);
        id
    }

    pub fn new_untitled(&self) -> Document {
        let counter = self.next_untitled.get();
        self.next_untitled.set(counter + 1);
        Document::new_untitled(self.next_document_id(), counter, &self.settings())
    }

    pub fn document_for_file(&self, path: PathBuf) -> Document {
        Document::for_file(self.next_document_id(), path, &self.settings())
    }

    // --- Histories ---

    pub fn recent(&self) -> Ref<'_, RecentHistory> {
        self.recent.borrow()
    }

    pub fn recent_mut(&self) -> RefMut<'_, RecentHistory> {
        self.recent.borrow_mut()
    }

    pub fn clipboard_history(&self) -> Ref<'_, ClipboardHistory> {
        self.clipboard_history.borrow()
    }

    /// Snapshot the system clipboard into the history.
    pub fn record_clipboard(&self) {
        let text = self.collab.clipboard.text();
        self.clipboard_history.borrow_mut().record(text);
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("live_windows", &self.live_windows.get())
            .field("menu_lock", &self.menu_lock.get())
            .field("idle", &self.idle.borrow().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::Harness;

    #[test]
    fn test_lock_guard_releases_on_drop() {
        let h = Harness::new();
        assert!(!h.ctx.menu_updates_locked());
        {
            let _outer = h.ctx.lock_menu_updates();
            let inner = h.ctx.lock_menu_updates();
            drop(inner);
            assert!(h.ctx.menu_updates_locked());
        }
        assert!(!h.ctx.menu_updates_locked());
    }

    #[test]
    fn test_schedule_suppressed_while_locked() {
        let h = Harness::new();
        let w = h.ctx.attach_window();
        {
            let _lock = h.ctx.lock_menu_updates();
            assert!(!h.ctx.schedule(w, RebuildTarget::TabMenu));
        }
        assert!(h.ctx.idle_is_empty());
        assert!(h.ctx.schedule(w, RebuildTarget::TabMenu));
        assert!(!h.ctx.schedule(w, RebuildTarget::TabMenu));
    }

    #[test]
    fn test_clipboard_history_dies_with_last_window() {
        let h = Harness::new();
        let a = h.ctx.attach_window();
        let b = h.ctx.attach_window();
        h.clipboard.set(Some("hello"));
        h.ctx.record_clipboard();

        h.ctx.release_window(a);
        assert_eq!(h.ctx.clipboard_history().entries(), ["hello".to_string()]);
        h.ctx.release_window(b);
        assert!(h.ctx.clipboard_history().is_empty());
    }

    #[test]
    fn test_release_cancels_pending_rebuilds() {
        let h = Harness::new();
        let w = h.ctx.attach_window();
        h.ctx.schedule(w, RebuildTarget::RecentMenu);
        h.ctx.release_window(w);
        assert!(!h.ctx.is_scheduled(w, RebuildTarget::RecentMenu));
    }

    #[test]
    fn test_untitled_numbering_and_unique_ids() {
        let h = Harness::new();
        let a = h.ctx.new_untitled();
        let b = h.ctx.new_untitled();
        assert_eq!(a.display_name, "Untitled");
        assert_eq!(b.display_name, "Untitled 2");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_settings_persist_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let h = Harness::persisting(AppSettings::default(), path.clone());

        h.ctx.update_settings(|s| s.tab_size = 8);
        assert_eq!(AppSettings::load_from(&path).tab_size, 8);
    }
}
