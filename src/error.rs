//! Error types for the word count store
//!
//! Provides a unified error type for all operations. A word that was never
//! observed is not an error: lookups report it as `None`.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for store operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    #[error("WAL write failed: {0}")]
    WalWrite(String),

    // -------------------------------------------------------------------------
    // Snapshot Errors
    // -------------------------------------------------------------------------
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Input Errors
    // -------------------------------------------------------------------------
    #[error("Word must not be empty")]
    EmptyWord,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Startup Errors
    // -------------------------------------------------------------------------
    /// Store could not be brought up; it cannot serve any operation.
    #[error("Failed to initialize store at {}: {source}", path.display())]
    Initialization {
        path: PathBuf,
        #[source]
        source: Box<StoreError>,
    },
}

impl StoreError {
    /// Wrap a startup failure for the given data directory
    pub(crate) fn initialization(path: impl Into<PathBuf>, source: StoreError) -> Self {
        StoreError::Initialization {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// True if this error came out of store startup
    pub fn is_initialization(&self) -> bool {
        matches!(self, StoreError::Initialization { .. })
    }
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
