//! Core error types for the MavensMate server.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving or loading projects
#[derive(Debug, Error)]
pub enum CoreError {
    /// No configured workspace contains a project with this id
    #[error(
        "MavensMate could not find project with id: {0}. \
         This is likely because you are trying to open a project that does not reside in a valid mm_workspace. \
         Please go to MavensMate Desktop settings and ensure this project is located in a valid mm_workspace."
    )]
    ProjectNotFound(String),

    /// Project manifest is missing or malformed
    #[error("Invalid project manifest at {}: {reason}", path.display())]
    InvalidManifest { path: PathBuf, reason: String },

    /// Lifecycle manager could not construct the project
    #[error("Project initialization failed: {0}")]
    InitializationFailure(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
