//! Services layer - business operations and utilities.
//!
//! This module contains business logic and operations:
//! - Recent-file history and its stores
//! - Clipboard history
//! - Text search and replace
//! - Window geometry persistence

pub mod clipboard;
pub mod geometry;
pub mod recent;
pub mod text_ops;
