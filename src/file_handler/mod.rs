//! File handler module for Markdown Bridge
//!
//! Handles the file-system side of opening and saving Markdown:
//! - Reading and writing UTF-8 files without a byte-order mark
//! - Atomic save operations
//! - Watching the open file for external changes

pub mod io;
pub mod watcher;

pub use io::*;
pub use watcher::*;
