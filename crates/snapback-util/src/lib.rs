//! Shared utilities for snapback.
//!
//! This crate provides common utilities used across the snapback workspace:
//! - XDG directory lookup and path joining that cannot escape a base
//! - RAII-based timing for operation measurement

pub mod path;
pub mod timing;

pub use timing::{OperationKind, TimingGuard};
