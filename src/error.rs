//! Structured error types for registry, storage and repository operations.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Lookup errors
    StorageNotFound,
    KeyNotFound,

    // Facade errors
    MissingBinding,

    // Validation errors
    InvalidRecord,
    InvalidDefinition,
}

/// Error raised by the registry, storages and the accessor facade.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConfigError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl ConfigError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            storage: None,
            key: None,
        }
    }

    pub fn with_storage(mut self, storage: impl Into<String>) -> Self {
        self.storage = Some(storage.into());
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    // Convenience constructors

    pub fn storage_not_found(storage: &str) -> Self {
        Self::new(
            ErrorCode::StorageNotFound,
            format!("storage {} does not exist", storage),
        )
        .with_storage(storage)
    }

    pub fn key_not_found(storage: &str, key: &str) -> Self {
        Self::new(
            ErrorCode::KeyNotFound,
            format!("key {} not found in storage {}", key, storage),
        )
        .with_storage(storage)
        .with_key(key)
    }

    pub fn missing_binding(what: &str) -> Self {
        Self::new(ErrorCode::MissingBinding, format!("Cfg has no {} set", what))
    }

    pub fn invalid_record(storage: &str, key: &str) -> Self {
        Self::new(
            ErrorCode::InvalidRecord,
            format!(
                "record needs a non-empty storage and key, got storage {:?} key {:?}",
                storage, key
            ),
        )
        .with_storage(storage)
        .with_key(key)
    }

    pub fn invalid_definition(source: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::InvalidDefinition,
            format!("invalid definition {}: {}", source, reason),
        )
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Error raised by repository adapters.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("no database connection set for the config repository")]
    MissingConnection,

    #[error("no table name set for the config repository")]
    MissingTable,

    #[error("table name {0:?} is not a plain SQL identifier")]
    InvalidTable(String),

    #[error("no file path set for the config repository")]
    MissingPath,

    #[error("config file {} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("config file {} is not readable", .0.display())]
    Unreadable(PathBuf),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to encode config data: {0}")]
    Encode(String),

    #[error("failed to decode {source_name}: {message}")]
    Decode { source_name: String, message: String },

    #[error("database connection lock poisoned")]
    Poisoned,
}

impl RepositoryError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn decode(source_name: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::Decode {
            source_name: source_name.to_string(),
            message: message.to_string(),
        }
    }

    /// Underlying OS or SQLite error code, when there is one.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Io { source, .. } => source.raw_os_error(),
            Self::Database(rusqlite::Error::SqliteFailure(err, _)) => Some(err.extended_code),
            _ => None,
        }
    }
}

/// Any error produced by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result type for storage and registry lookups.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type for repository adapters.
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Result type for operations that touch both the registry and a repository.
pub type Result<T> = std::result::Result<T, Error>;
