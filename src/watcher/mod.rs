//! File system watching.
//!
//! This module provides:
//! - Directory watching using notify-rs
//! - Glob-based selection of which paths to forward
//! - Translation of raw notifications into pipeline changes

mod adapter;
mod filter;

pub use adapter::DirectoryWatcher;
pub use filter::NameFilter;
