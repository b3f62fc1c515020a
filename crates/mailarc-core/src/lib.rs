//! mailarc core library
//!
//! Orchestration layer for a personal mail archive: mbsync mirrors the
//! remote mailbox, notmuch indexes it, and this crate glues the two to a
//! terminal menu for searching, reading, and saving attachments.

pub mod config;
pub mod engine;
pub mod error;
pub mod query;
pub mod results;
pub mod selector;
pub mod sync;
pub mod viewer;

pub use config::Config;
pub use error::{Error, Result};

/// Application name for config paths
pub const APP_NAME: &str = "mailarc";
