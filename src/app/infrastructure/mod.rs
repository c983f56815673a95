//! Infrastructure layer - external integrations and utilities.
//!
//! This module contains code that interfaces with external systems:
//! - Collaborator traits (files, dialogs, clipboard, text view)
//! - Error types

pub mod collaborators;
pub mod error;
