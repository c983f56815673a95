//! Controllers layer - orchestration and coordination.
//!
//! This module contains controllers that coordinate between
//! domain models, services, and the UI:
//! - Document registry (tabs)
//! - Action table and derived sensitivity
//! - Deferred menu rebuilds
//! - Tab transfer between windows

pub mod actions;
pub mod idle;
pub mod tabs;
pub mod transfer;
