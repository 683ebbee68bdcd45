//! Core error types for focusloop-core.
//!
//! Every engine operation reports failures through [`CoreError`]. The
//! dispatch layer uses [`CoreError::kind`] to render a structured failure
//! alongside the human-readable message.

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::IntervalKind;

/// Core error type for focusloop-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// An interval is already running.
    #[error("a {running} interval is already running; stop it first")]
    Conflict { running: IntervalKind },

    /// The operation needs a running interval but the engine is idle.
    #[error("no interval is running")]
    NotRunning,

    /// The referenced task does not exist.
    #[error("task not found: {task_id}")]
    NotFound { task_id: String },

    /// Caller-supplied input was rejected.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The durable store could not be read or written.
    #[error("Persistence error: {0}")]
    Persistence(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl CoreError {
    /// Stable snake_case discriminator for structured failure reports.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Conflict { .. } => "conflict",
            CoreError::NotRunning => "not_running",
            CoreError::NotFound { .. } => "not_found",
            CoreError::Validation(_) => "validation",
            CoreError::Persistence(_) => "persistence",
            CoreError::Config(_) => "config",
        }
    }
}

/// Validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Empty or whitespace-only name
    #[error("{field} must not be empty")]
    EmptyName { field: String },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    pub(crate) fn positive(field: &str) -> Self {
        ValidationError::InvalidValue {
            field: field.to_string(),
            message: "must be greater than zero".to_string(),
        }
    }
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A stored row could not be decoded
    #[error("Corrupt record in '{table}': {message}")]
    Corrupt { table: String, message: String },

    /// The data directory could not be prepared
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-separated key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg) => {
                if code.code == rusqlite::ErrorCode::DatabaseLocked
                    || code.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Persistence(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_stable_per_variant() {
        assert_eq!(
            CoreError::Conflict {
                running: IntervalKind::Work
            }
            .kind(),
            "conflict"
        );
        assert_eq!(CoreError::NotRunning.kind(), "not_running");
        assert_eq!(
            CoreError::NotFound {
                task_id: "x".into()
            }
            .kind(),
            "not_found"
        );
        assert_eq!(
            CoreError::from(ValidationError::positive("work_minutes")).kind(),
            "validation"
        );
        assert_eq!(CoreError::from(StorageError::Locked).kind(), "persistence");
    }

    #[test]
    fn conflict_message_names_running_kind() {
        let err = CoreError::Conflict {
            running: IntervalKind::LongBreak,
        };
        assert_eq!(
            err.to_string(),
            "a long_break interval is already running; stop it first"
        );
    }

    #[test]
    fn busy_sqlite_maps_to_locked() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(matches!(StorageError::from(err), StorageError::Locked));
    }
}
