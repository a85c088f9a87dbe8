//! Note storage for nete
//!
//! A [`NoteStore`] owns a replica's notes and its last-synchronized
//! [`SyncStatus`]. Two implementations ship with the crate: the
//! directory-backed [`FilesystemNoteStore`] used by the backend, and the
//! in-memory [`MemoryNoteStore`] used in tests.

mod filesystem;
mod lock;
mod memory;

use async_trait::async_trait;

pub use filesystem::FilesystemNoteStore;
pub use lock::StorageLock;
pub use memory::MemoryNoteStore;

use crate::error::{Error, Result};
use crate::models::{Note, NoteId, RevisionId, SyncStatus};

/// Outcome of [`NoteStore::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The note was new and has been stored.
    Created(Note),
    /// The exact same version was already stored (idempotent, not an error).
    AlreadyExists(Note),
}

impl CreateOutcome {
    pub fn into_note(self) -> Note {
        match self {
            Self::Created(note) | Self::AlreadyExists(note) => note,
        }
    }
}

/// Async interface for note persistence.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// List every stored note, ordered by id
    async fn list(&self) -> Result<Vec<Note>>;

    /// Read a single note
    async fn read(&self, id: &NoteId) -> Result<Note>;

    /// Create or fully overwrite a note; `updated_at` is always refreshed
    async fn write(&self, note: Note) -> Result<Note>;

    /// Store a note that must not exist yet in a different version
    async fn create(&self, note: Note) -> Result<CreateOutcome>;

    /// Overwrite a note only if its stored revision is `expected`
    async fn update(&self, note: Note, expected: RevisionId) -> Result<Note>;

    /// Remove a note
    async fn delete(&self, id: &NoteId) -> Result<()>;

    /// Load the last-synchronized snapshot (empty if never synced)
    async fn load_status(&self) -> Result<SyncStatus>;

    /// Atomically replace the last-synchronized snapshot
    async fn save_status(&self, status: &SyncStatus) -> Result<()>;
}

/// Check a conditional update against the currently stored note.
pub(crate) fn validate_update(stored: &Note, incoming: &Note, expected: RevisionId) -> Result<()> {
    if stored.revision_id != expected {
        return Err(Error::RevisionMismatch {
            id: stored.id,
            expected,
            actual: stored.revision_id,
        });
    }

    if incoming.revision_id == stored.revision_id {
        return Err(Error::InvalidInput(
            "New revision id needs to be different from old revision id".to_string(),
        ));
    }

    let mut changed = Vec::new();
    if incoming.id != stored.id {
        changed.push("id");
    }
    if incoming.created_at != stored.created_at {
        changed.push("created_at");
    }
    if !changed.is_empty() {
        return Err(Error::InvalidInput(format!(
            "Tried to update immutable attributes: {}",
            changed.join(", ")
        )));
    }

    Ok(())
}

/// Decide how a create request relates to what is already stored.
pub(crate) fn check_create(existing: Option<&Note>, incoming: &Note) -> Result<Option<Note>> {
    match existing {
        None => Ok(None),
        Some(stored) if stored.same_version(incoming) => Ok(Some(stored.clone())),
        Some(stored) => Err(Error::AlreadyExists(stored.id)),
    }
}
