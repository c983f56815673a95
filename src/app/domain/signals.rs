//! Per-document notification hub.
//!
//! A window connects to every document it owns and keeps the returned
//! [`Subscription`] next to the document. Dropping the subscription (when the
//! document leaves the window) disconnects the handler, so a transferred
//! document only ever notifies the window that currently owns it.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::document::{DocumentId, SelectionKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSignal {
    CursorChanged { line: usize, column: usize, selection: usize },
    SelectionChanged(SelectionKind),
    OverwriteChanged(bool),
    ModifiedChanged(bool),
    CanUndo(bool),
    CanRedo(bool),
    /// The close button on the tab label was clicked.
    CloseTab,
}

type Handler = Box<dyn Fn(DocumentId, &DocumentSignal)>;
type HandlerList = RefCell<Vec<(u64, Handler)>>;

#[derive(Default)]
pub struct SignalHub {
    handlers: Rc<HandlerList>,
    next_id: Cell<u64>,
}

impl SignalHub {
    pub fn connect(&self, handler: impl Fn(DocumentId, &DocumentSignal) + 'static) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.handlers.borrow_mut().push((id, Box::new(handler)));
        Subscription {
            handlers: Rc::downgrade(&self.handlers),
            id,
        }
    }

    pub fn emit(&self, doc: DocumentId, signal: &DocumentSignal) {
        for (_, handler) in self.handlers.borrow().iter() {
            handler(doc, signal);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }
}

/// Connection handle. Disconnects on drop.
pub struct Subscription {
    handlers: Weak<HandlerList>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(handlers) = self.handlers.upgrade() {
            handlers.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropping_subscription_disconnects() {
        let hub = SignalHub::default();
        let seen = Rc::new(Cell::new(0));

        let counter = seen.clone();
        let sub = hub.connect(move |_, _| counter.set(counter.get() + 1));
        hub.emit(DocumentId(1), &DocumentSignal::CloseTab);
        assert_eq!(seen.get(), 1);

        drop(sub);
        assert_eq!(hub.handler_count(), 0);
        hub.emit(DocumentId(1), &DocumentSignal::CloseTab);
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn test_subscription_outliving_hub_is_harmless() {
        let hub = SignalHub::default();
        let sub = hub.connect(|_, _| {});
        drop(hub);
        drop(sub);
    }
}
