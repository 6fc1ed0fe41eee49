//! Error types for playcell-core

use thiserror::Error;

/// Result type alias using playcell-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in playcell-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Settings could not be resolved
    #[error("Configuration error: {0}")]
    Config(String),
}
