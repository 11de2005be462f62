//! Error types for the statistics service

use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or out-of-range input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced entity is not in the registry
    #[error("Not found: {0}")]
    NotFound(String),

    /// Relational store error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Cache store error
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Whether the error was caused by the caller's input rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::NotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Relational store errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Could not reach the store or acquire a connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement or query failed
    #[error("Query error: {0}")]
    Query(String),

    /// Schema migration failed
    #[error("Migration error: {0}")]
    Migration(String),
}

/// Cache store errors
///
/// A missing key is not an error; gateways report it as `Ok(None)`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Could not reach the cache store
    #[error("Connection error: {0}")]
    Connection(String),

    /// Command was rejected or failed in flight
    #[error("Command error: {0}")]
    Command(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
