use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] playcell_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("File name cannot be empty")]
    EmptyFileName,
    #[error("Simulation script has no steps")]
    EmptyScript,
    #[error("Invalid simulation script {path}: {message}")]
    InvalidScript { path: String, message: String },
}
