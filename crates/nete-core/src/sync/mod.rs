//! Two-replica synchronization.
//!
//! A pass reads the last synchronized snapshot ([`SyncStatus`]), the local
//! note list and the remote index, classifies every note id with a three-way
//! comparison, runs the resulting actions and finally stores the new
//! snapshot. See [`plan`] for the classification rules and [`Synchronizer`]
//! for the execution phases.
//!
//! [`SyncStatus`]: crate::models::SyncStatus

mod engine;
pub mod plan;
mod report;

#[cfg(test)]
mod peer;

use async_trait::async_trait;

use crate::client::ClientError;
use crate::error::Error;
use crate::models::{Note, NoteId, NoteIndexEntry, RevisionId};

pub use engine::Synchronizer;
pub use plan::{SyncAction, SyncCategory, SyncPlan};
pub use report::{ConflictCopy, SyncFailure, SyncOperation, SyncReport};

/// Errors that abort a whole sync pass. Per-note failures never end
/// up here, they are collected in [`SyncReport::failures`].
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Local storage error: {0}")]
    Storage(#[from] Error),

    #[error("Could not list remote notes: {0}")]
    Remote(#[source] ClientError),
}

/// The other replica, as seen by the synchronizer.
#[async_trait]
pub trait RemoteNoteClient: Send + Sync {
    /// Ids and current revisions of every remote note.
    async fn list_index(&self) -> Result<Vec<NoteIndexEntry>, ClientError>;

    async fn fetch(&self, id: &NoteId) -> Result<Note, ClientError>;

    /// Create `note` remotely under its own id and revision.
    async fn create(&self, note: &Note) -> Result<Note, ClientError>;

    /// Replace the remote note if its current revision is still `expected`.
    /// Fails with [`ClientError::Conflict`] otherwise.
    async fn update(&self, note: &Note, expected: RevisionId) -> Result<Note, ClientError>;
}
