use std::time::{Duration, Instant};

/// Quiet period after the last resize before the size is saved.
pub const SAVE_GEOMETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowFlags {
    pub visible: bool,
    pub maximized: bool,
    pub fullscreen: bool,
}

impl WindowFlags {
    fn allows_save(self) -> bool {
        self.visible && !self.maximized && !self.fullscreen
    }
}

/// Debounces configure events into a single geometry save.
#[derive(Debug, Default)]
pub struct GeometryTracker {
    pending: Option<(i32, i32)>,
    last_event: Option<Instant>,
}

impl GeometryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resize. Restarts the quiet period.
    pub fn on_configure(&mut self, width: i32, height: i32, now: Instant) {
        self.pending = Some((width, height));
        self.last_event = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Size to persist once the window has been quiet long enough.
    ///
    /// The pending size is consumed even when `flags` forbid saving.
    pub fn poll(&mut self, now: Instant, flags: WindowFlags) -> Option<(i32, i32)> {
        let last = self.last_event?;
        if now.duration_since(last) < SAVE_GEOMETRY_DELAY {
            return None;
        }
        self.last_event = None;
        let size = self.pending.take()?;
        flags.allows_save().then_some(size)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
        self.last_event = None;
    }
}
