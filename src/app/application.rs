//! Owner of every window.
//!
//! The frontend forwards events to the window they concern, then calls
//! [`Application::process_events`] to route the cross-window messages and
//! collect the rest, and [`Application::run_idle`] when its loop goes idle.

use std::path::Path;
use std::rc::Rc;

use super::context::AppContext;
use super::controllers::idle::{RebuildTarget, WindowId};
use super::controllers::transfer::{DropPayload, TabExtent};
use super::domain::document::{Document, DocumentId};
use super::domain::messages::Message;
use super::state::WindowState;

pub struct Application {
    ctx: Rc<AppContext>,
    windows: Vec<WindowState>,
    recent_generation: u64,
}

impl Application {
    pub fn new(ctx: Rc<AppContext>) -> Self {
        let recent_generation = ctx.recent().generation();
        Self {
            ctx,
            windows: Vec::new(),
            recent_generation,
        }
    }

    pub fn context(&self) -> &Rc<AppContext> {
        &self.ctx
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    pub fn window_ids(&self) -> Vec<WindowId> {
        self.windows.iter().map(WindowState::id).collect()
    }

    pub fn window(&self, id: WindowId) -> Option<&WindowState> {
        self.windows.iter().find(|w| w.id() == id)
    }

    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut WindowState> {
        self.windows.iter_mut().find(|w| w.id() == id)
    }

    /// Open a window showing `locations`, or a new untitled document when
    /// none of them could be opened.
    pub fn open_window(&mut self, locations: &[String], working_dir: Option<&Path>) -> WindowId {
        let mut window = WindowState::new(Rc::clone(&self.ctx));
        let opened = window.open_locations(locations, working_dir);
        if window.registry().is_empty() {
            window.new_document();
        }
        let id = window.id();
        tracing::info!(window = id.0, requested = locations.len(), opened, "window opened");
        self.windows.push(window);
        id
    }

    fn spawn_window(&mut self, document: Option<Document>, position: Option<(i32, i32)>) -> WindowId {
        let mut window = WindowState::new(Rc::clone(&self.ctx));
        match document {
            Some(document) => window.add(document),
            None => window.new_document(),
        }
        if let Some((x, y)) = position {
            window.move_to(x, y);
        }
        let id = window.id();
        tracing::debug!(window = id.0, "window spawned");
        self.windows.push(window);
        id
    }

    fn destroy_window(&mut self, id: WindowId) {
        let before = self.windows.len();
        self.windows.retain(|w| w.id() != id);
        if self.windows.len() != before {
            tracing::debug!(window = id.0, remaining = self.windows.len(), "window destroyed");
        }
    }

    // --- Tab transfer ---

    /// Drop a tab dragged from `source` onto the tab strip of `target`.
    /// Within one window this reorders. Returns whether anything moved.
    pub fn drag_tab(
        &mut self,
        source: WindowId,
        document: DocumentId,
        target: WindowId,
        layout: &[TabExtent],
        x: i32,
    ) -> bool {
        if source == target {
            return match self.window_mut(source) {
                Some(window) if window.registry().contains(document) => {
                    window.reorder_tab(document, layout, x);
                    true
                }
                _ => false,
            };
        }

        if self.window(target).is_none_or(WindowState::is_torn_down) {
            return false;
        }
        let Some(doc) = self.window_mut(source).and_then(|w| w.take_document(document)) else {
            return false;
        };
        tracing::debug!(from = source.0, to = target.0, document = document.0, "tab dragged");
        match self.window_mut(target) {
            Some(window) => window.receive_document(doc, layout, x),
            None => {
                self.spawn_window(Some(doc), None);
            }
        }
        true
    }

    /// A tab was dropped outside every window.
    pub fn drag_to_empty_space(&mut self, source: WindowId, document: DocumentId, position: (i32, i32)) -> bool {
        self.window_mut(source)
            .is_some_and(|w| w.detach_document(document, Some(position)))
    }

    pub fn drop_payload(&mut self, target: WindowId, payload: DropPayload, layout: &[TabExtent], x: i32) -> bool {
        match payload {
            DropPayload::UriList(data) => self.window_mut(target).is_some_and(|w| w.drop_uris(&data) > 0),
            DropPayload::Tab { source, document } => self.drag_tab(source, document, target, layout, x),
        }
    }

    /// Close every window, stopping at the first one the user keeps open.
    pub fn quit(&mut self) -> bool {
        for index in (0..self.windows.len()).rev() {
            if !self.windows[index].close_window() {
                return false;
            }
        }
        true
    }

    // --- Event loop hooks ---

    /// Route cross-window messages until none are left. New windows are
    /// created and emptied ones destroyed here; every other message is
    /// returned for the frontend, tagged with its window. Messages of a
    /// window the frontend has not seen yet announce that window.
    pub fn process_events(&mut self) -> Vec<(WindowId, Message)> {
        let mut out = Vec::new();
        loop {
            self.sync_recent();
            let pending: Vec<(WindowId, Message)> = self
                .windows
                .iter_mut()
                .flat_map(|w| {
                    let id = w.id();
                    w.drain_messages().into_iter().map(move |m| (id, m))
                })
                .collect();
            if pending.is_empty() {
                break;
            }

            for (id, message) in pending {
                match message {
                    Message::NewWindow => {
                        self.spawn_window(None, None);
                    }
                    Message::NewWindowWithDocument { document, position } => {
                        self.spawn_window(Some(document), position);
                    }
                    Message::WindowEmpty => {
                        self.destroy_window(id);
                        out.push((id, Message::WindowEmpty));
                    }
                    other => out.push((id, other)),
                }
            }
        }
        out
    }

    /// Run pending menu rebuilds in every window. Returns how many ran.
    pub fn run_idle(&mut self) -> usize {
        let mut ran = 0;
        loop {
            self.sync_recent();
            let pass: usize = self.windows.iter_mut().map(WindowState::run_idle).sum();
            if pass == 0 {
                break;
            }
            ran += pass;
        }
        ran
    }

    /// Rebuild the recent menu of every window after the history changed.
    fn sync_recent(&mut self) {
        let generation = self.ctx.recent().generation();
        if generation == self.recent_generation {
            return;
        }
        self.recent_generation = generation;
        for window in &self.windows {
            window.schedule(RebuildTarget::RecentMenu);
        }
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("windows", &self.window_ids())
            .field("ctx", &self.ctx)
            .finish()
    }
}
