use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

/// Menus rebuilt from the idle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RebuildTarget {
    TabMenu,
    RecentMenu,
}

/// Pending menu rebuilds, at most one per (window, target).
#[derive(Debug, Default)]
pub struct IdleQueue {
    tasks: VecDeque<(WindowId, RebuildTarget)>,
}

impl IdleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a rebuild. Returns false if one is already pending.
    pub fn schedule(&mut self, window: WindowId, target: RebuildTarget) -> bool {
        if self.is_pending(window, target) {
            return false;
        }
        tracing::trace!(window = window.0, ?target, "rebuild scheduled");
        self.tasks.push_back((window, target));
        true
    }

    pub fn is_pending(&self, window: WindowId, target: RebuildTarget) -> bool {
        self.tasks.contains(&(window, target))
    }

    /// Drop every pending task of a window that is going away.
    pub fn cancel_window(&mut self, window: WindowId) {
        self.tasks.retain(|(w, _)| *w != window);
    }

    /// Take the oldest task. Its pending flag clears as it is taken, so the
    /// rebuild itself may schedule again.
    pub fn pop(&mut self) -> Option<(WindowId, RebuildTarget)> {
        self.tasks.pop_front()
    }

    /// Take the oldest task of one window.
    pub fn pop_for(&mut self, window: WindowId) -> Option<RebuildTarget> {
        let idx = self.tasks.iter().position(|(w, _)| *w == window)?;
        self.tasks.remove(idx).map(|(_, target)| target)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
