//! Application layer - organized by Clean Architecture principles.
//!
//! # Structure
//!
//! - `domain/` - Core data structures (Document, Settings, Messages, signals)
//! - `controllers/` - Orchestration (registry, actions, idle rebuilds, transfer)
//! - `services/` - Business operations (recent files, clipboard history, search, geometry)
//! - `infrastructure/` - External integrations (collaborator traits, error)
//! - `context.rs` - State shared by every window
//! - `state.rs` - Per-window controller
//! - `application.rs` - Owner of every window

pub mod application;
pub mod context;
pub mod controllers;
pub mod domain;
pub mod infrastructure;
pub mod services;
pub mod state;

#[cfg(test)]
mod testing;

// Re-exports for convenient external access
pub use application::Application;
pub use context::{AppContext, Collaborators, MenuUpdateLock};
pub use controllers::actions::{Action, ActionKind, ActionSet};
pub use controllers::idle::{RebuildTarget, WindowId};
pub use controllers::transfer::{DropPayload, TabExtent};
pub use domain::{AppSettings, Document, DocumentId, Message, ViewCommand};
pub use infrastructure::collaborators::{
    Clipboard, Dialogs, FileEngine, FsFileEngine, RevertResponse, SaveChangesResponse, TextView,
};
pub use infrastructure::error::{AppError, Result};
pub use state::WindowState;
