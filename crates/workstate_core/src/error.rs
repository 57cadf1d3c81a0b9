//! Error types for workstate_core operations.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for artifact and session store operations.
#[derive(Error, Debug)]
pub enum WorkstateError {
    /// Artifact with the given ID was not found in any collection.
    #[error("artifact not found: {0}")]
    NotFound(String),

    /// Unsupported artifact type or invalid/missing settings.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A computed path would escape the workspace base directory.
    #[error("path {} escapes workspace base {}", path.display(), base.display())]
    PathTraversalDenied {
        /// The offending path (after resolution)
        path: PathBuf,
        /// The configured workspace base
        base: PathBuf,
    },

    /// Request rejected before touching the filesystem.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Artifact file exists but its header cannot be parsed.
    #[error("malformed artifact at {}: {}", path.display(), reason)]
    MalformedArtifact {
        /// Path to the artifact file
        path: PathBuf,
        /// Description of the problem
        reason: String,
    },

    /// A line of a session audit log is not a valid entry.
    #[error("corrupted audit log at {} (line {}): {}", path.display(), line, reason)]
    CorruptedAuditLog {
        /// Path to the audit log
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// Parser message
        reason: String,
    },

    /// Serialization error while writing a snapshot or header.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error while reading a snapshot.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkstateError {
    /// Returns a user-friendly recovery suggestion for the error, if available.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NotFound(_) => Some("List artifacts to find the correct ID; archived items are included."),
            Self::Configuration(_) => {
                Some("Check workstate.toml: the artifact type must be registered under [artifacts.collections].")
            }
            Self::PathTraversalDenied { .. } => {
                Some("Collection and session directories must live inside the workspace base path.")
            }
            Self::MalformedArtifact { .. } => {
                Some("Fix or remove the file's front-matter header; listings skip it until then.")
            }
            Self::CorruptedAuditLog { .. } => {
                Some("Inspect audit.jsonl and remove the malformed line; the log is append-only otherwise.")
            }
            _ => None,
        }
    }
}

/// Convenience Result type for workstate_core operations.
pub type Result<T> = std::result::Result<T, WorkstateError>;
