//! Core error types for wattbind-core.
//!
//! This module defines the error hierarchy using thiserror. Insufficient
//! data for a prediction is deliberately NOT an error -- the prediction
//! functions return `Option` for that case.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for wattbind-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Upstream balance API errors
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Validation errors (reported verbatim to the user)
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storage-specific errors. Fatal for the triggering operation only.
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
}

/// Failures from the upstream balance API. Never retried in-process;
/// the next manual or scheduled trigger retries naturally.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// Network-level failure reaching the API
    #[error("Failed to reach the balance API: {0}")]
    Network(#[from] reqwest::Error),

    /// Response arrived but could not be interpreted
    #[error("Failed to parse balance API response: {0}")]
    Parse(String),

    /// The API answered with an error for this room
    #[error("Room lookup failed: {0}")]
    NotFound(String),
}

/// Bad user input. The message text is shown to the user as-is.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Unknown campus name
    #[error("Unknown campus '{name}'. Available campuses: {available}")]
    UnknownCampus { name: String, available: String },

    /// Unknown building within a campus
    #[error("Unknown building '{name}' in campus '{campus}'")]
    UnknownBuilding { name: String, campus: String },

    /// Bad schedule time format
    #[error("Invalid time '{0}': expected HH:MM, 24-hour (e.g. 08:00)")]
    BadTimeFormat(String),

    /// Wrong argument shape for a command
    #[error("{0}")]
    BadArgs(String),

    /// The identity has no room bound
    #[error("No room bound for this identity. Bind one first: bind <campus> <building> <room>")]
    NotBound,
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
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
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
        CoreError::Storage(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
