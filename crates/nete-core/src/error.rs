//! Error types for nete-core

use std::path::PathBuf;

use thiserror::Error;

use crate::models::{NoteId, RevisionId};

/// Result type alias using nete-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in local storage operations
#[derive(Error, Debug)]
pub enum Error {
    /// Note not found
    #[error("Note not found: {0}")]
    NotFound(String),

    /// Stored revision differs from the one the caller expected
    #[error("Revision mismatch for note {id}: expected {expected}, found {actual}")]
    RevisionMismatch {
        id: NoteId,
        expected: RevisionId,
        actual: RevisionId,
    },

    /// A different version of the note already exists
    #[error("Note already exists with a different revision: {0}")]
    AlreadyExists(NoteId),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Storage directory is held by another process
    #[error("Storage is locked by another process: {}", .0.display())]
    Locked(PathBuf),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn not_found(id: impl ToString) -> Self {
        Self::NotFound(id.to_string())
    }

    /// Whether the error is a missing note rather than a storage failure
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
