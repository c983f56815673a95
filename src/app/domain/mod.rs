//! Domain layer - core data structures and types.
//!
//! This module contains the fundamental domain models:
//! - Document, DocumentId and per-document notifications
//! - Application settings
//! - Message types for the event system

pub mod document;
pub mod messages;
pub mod settings;
pub mod signals;

pub use document::{Document, DocumentId, LineEnding, SelectionKind};
pub use messages::{Message, ViewCommand};
pub use settings::AppSettings;
pub use signals::{DocumentSignal, Subscription};
