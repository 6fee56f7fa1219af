//! Error types for tabkit.
//!
//! One enum covers every layer: frame decoding, database access, tab
//! enumeration and search. Callers use [`TabkitError::is_permission_denied`]
//! to show a "grant access" affordance instead of a retry spinner.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the tabkit library.
#[derive(Debug, Error)]
pub enum TabkitError {
    // Frame decoding errors
    #[error("Malformed frame at byte {offset}: {message}")]
    Format { offset: usize, message: String },

    #[error("Corrupted frame at byte {offset}: {message}")]
    Corruption { offset: usize, message: String },

    // Access errors
    #[error("Permission denied for {path:?}: {message}")]
    PermissionDenied { path: PathBuf, message: String },

    // Database errors
    #[error("Database temporarily unavailable: {message}")]
    Transient { message: String },

    #[error("Database still unavailable after {attempts} attempts: {last_error}")]
    ExhaustedRetries { attempts: u32, last_error: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    // Source errors
    #[error("Tab enumeration failed: {message}")]
    Enumeration { message: String },

    // Search errors
    #[error("Could not normalize field '{field}' of {record}: {message}")]
    SearchNormalization {
        record: String,
        field: String,
        message: String,
    },

    #[error("Operation was cancelled")]
    Cancelled,

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for tabkit operations.
pub type Result<T> = std::result::Result<T, TabkitError>;

impl From<std::io::Error> for TabkitError {
    fn from(err: std::io::Error) -> Self {
        TabkitError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for TabkitError {
    fn from(err: serde_json::Error) -> Self {
        TabkitError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for TabkitError {
    fn from(err: rusqlite::Error) -> Self {
        TabkitError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl TabkitError {
    /// Create an IO error with path context.
    ///
    /// Permission failures become [`TabkitError::PermissionDenied`] and a
    /// missing file becomes [`TabkitError::FileNotFound`].
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => TabkitError::PermissionDenied {
                message: format!("{}. Grant read access to this file and try again", err),
                path,
            },
            std::io::ErrorKind::NotFound => TabkitError::FileNotFound(path),
            _ => TabkitError::Io {
                message: err.to_string(),
                path: Some(path),
                source: Some(err),
            },
        }
    }

    /// Build a format error at the given input offset.
    pub fn format(offset: usize, message: impl Into<String>) -> Self {
        TabkitError::Format {
            offset,
            message: message.into(),
        }
    }

    /// Build a corruption error at the given input offset.
    pub fn corruption(offset: usize, message: impl Into<String>) -> Self {
        TabkitError::Corruption {
            offset,
            message: message.into(),
        }
    }

    /// Check if this error should trigger a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TabkitError::Transient { .. })
    }

    /// Check if the user has to grant access before this can succeed.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, TabkitError::PermissionDenied { .. })
    }

    /// Process exit code used by the command-line front end.
    ///
    /// - 2: malformed or corrupted input
    /// - 3: access denied
    /// - 4: database busy after all retries
    /// - 5: cancelled
    /// - 1: anything else
    pub fn exit_code(&self) -> i32 {
        match self {
            TabkitError::Format { .. } | TabkitError::Corruption { .. } => 2,
            TabkitError::PermissionDenied { .. } => 3,
            TabkitError::Transient { .. } | TabkitError::ExhaustedRetries { .. } => 4,
            TabkitError::Cancelled => 5,
            _ => 1,
        }
    }
}
