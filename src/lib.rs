//! Markdown Bridge
//!
//! Keeps one Markdown source of record consistent between a host document
//! and a sandboxed preview surface that shares nothing with the host but an
//! asynchronous message channel.
//!
//! - `bridge`: host end of the channel, canonical text, toolbar commands
//! - `surface`: surface end of the channel, editing buffer, preview mounting
//! - `message`: the wire envelope both ends speak
//! - `markdown`: Markdown -> HTML with diagram-block promotion
//! - `persistence`: the namespaced metadata region inside the host document
//! - `session`: one open document with all of the above wired together

pub mod bridge;
pub mod config;
pub mod error;
pub mod file_handler;
pub mod markdown;
pub mod message;
pub mod persistence;
pub mod session;
pub mod surface;

pub use bridge::SyncBridge;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use markdown::RenderPipeline;
pub use persistence::PersistenceStore;
pub use session::Session;
