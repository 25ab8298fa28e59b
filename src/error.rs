//! Error types for Markdown Bridge
//!
//! Errors are grouped by the boundary they originate from. Every boundary
//! operation returns one of these so the host can report it instead of
//! silently swallowing it.

use std::path::PathBuf;
use thiserror::Error;

/// Main application error type encompassing all error categories
#[derive(Error, Debug)]
pub enum AppError {
    /// File I/O related errors
    #[error(transparent)]
    FileIO(#[from] FileError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Wire protocol errors
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Host <-> surface bridge errors
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// Persistence region errors
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// File watcher errors
    #[error(transparent)]
    Watcher(#[from] WatcherError),
}

/// File I/O related errors
#[derive(Error, Debug)]
pub enum FileError {
    /// File not found at specified path
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// File is too large to open
    #[error("File too large: {path} ({size} bytes, max {max_size} bytes)")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// File is not valid UTF-8
    #[error("Unable to read file as UTF-8 text: {path}")]
    EncodingError { path: PathBuf },

    /// Error reading file
    #[error("Could not read file: {path}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error writing file
    #[error("Could not save file: {path}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error encoding or decoding a document container file
    #[error("Invalid document file: {path}")]
    InvalidDocument {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Configuration related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error loading configuration file
    #[error("Could not load configuration: {0}")]
    LoadError(String),

    /// Error parsing configuration
    #[error("Invalid configuration format: {0}")]
    ParseError(String),

    /// Invalid configuration value
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    /// Configuration directory error
    #[error("Could not access configuration directory")]
    DirectoryError,
}

/// Envelope decoding errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// No delimiter between kind and payload
    #[error("Envelope has no kind delimiter")]
    MissingDelimiter,

    /// Kind outside the fixed vocabulary
    #[error("Unknown message kind: {0}")]
    UnknownKind(String),

    /// Payload is not valid base64
    #[error("Payload is not validly encoded: {0}")]
    InvalidEncoding(String),

    /// Payload bytes are not UTF-8 text
    #[error("Payload is not UTF-8 text")]
    InvalidText,

    /// Structured payload did not match its schema
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

/// Errors raised while talking across the host <-> surface channel
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The other end of the channel is gone
    #[error("Channel to the embedded surface is closed")]
    ChannelClosed,

    /// The embedded surface has not completed its handshake
    #[error("Embedded surface is not ready")]
    NotReady,

    /// The embedded surface failed to initialize
    #[error("Embedded surface failed to initialize: {0}")]
    InitFailed(String),
}

/// Persistence region errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Text contains a character XML 1.0 cannot carry
    #[error("Character U+{0:04X} cannot be stored in the document")]
    UnrepresentableChar(u32),

    /// The host document refused the operation
    #[error("Host document error: {0}")]
    Host(String),

    /// Host document container could not be read or written
    #[error(transparent)]
    File(#[from] FileError),
}

/// File watcher errors
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Could not initialize file watcher
    #[error("Could not start file watcher: {0}")]
    InitError(String),

    /// Could not watch path
    #[error("Could not watch path: {path}")]
    WatchError {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Result type alias for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for file operations
pub type FileResult<T> = Result<T, FileError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Result type alias for persistence operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;

impl FileError {
    /// Create a user-friendly error message suitable for display
    pub fn user_message(&self) -> String {
        match self {
            FileError::NotFound(_) => {
                "The file could not be found. It may have been moved or deleted.".to_string()
            }
            FileError::FileTooLarge { max_size, .. } => {
                format!(
                    "This file is too large to open. Maximum file size is {} bytes.",
                    max_size
                )
            }
            FileError::EncodingError { .. } => {
                "This file cannot be opened as text. It must be UTF-8 encoded.".to_string()
            }
            FileError::WriteError { .. } => {
                "Could not save the file. Check disk space and permissions.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl BridgeError {
    /// Create a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            BridgeError::InitFailed(_) => {
                "The preview could not be started. Editing still works, but the preview is unavailable."
                    .to_string()
            }
            BridgeError::ChannelClosed => "The preview is no longer connected.".to_string(),
            BridgeError::NotReady => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_error_display() {
        let err = FileError::NotFound(PathBuf::from("/test/file.md"));
        assert!(err.to_string().contains("/test/file.md"));
    }

    #[test]
    fn test_app_error_from_protocol_error() {
        let app_err: AppError = ProtocolError::MissingDelimiter.into();
        assert!(matches!(app_err, AppError::Protocol(_)));
    }

    #[test]
    fn test_unrepresentable_char_display() {
        let err = PersistenceError::UnrepresentableChar(0x1);
        assert_eq!(err.to_string(), "Character U+0001 cannot be stored in the document");
    }

    #[test]
    fn test_init_failed_user_message() {
        let msg = BridgeError::InitFailed("sandbox denied".into()).user_message();
        assert!(msg.contains("preview"));
    }
}
