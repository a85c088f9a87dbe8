//! In-process remote replica for sync tests.

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::RemoteNoteClient;
use crate::client::ClientError;
use crate::error::Error;
use crate::models::{Note, NoteId, NoteIndexEntry, RevisionId};
use crate::storage::{MemoryNoteStore, NoteStore};

/// A [`MemoryNoteStore`] seen through the [`RemoteNoteClient`] interface,
/// with switchable per-note failures.
#[derive(Default)]
pub struct StorePeer {
    store: MemoryNoteStore,
    failures: Mutex<Failures>,
}

#[derive(Default)]
struct Failures {
    index: bool,
    creates: BTreeSet<NoteId>,
    updates: BTreeSet<NoteId>,
    fetches: BTreeSet<NoteId>,
}

impl StorePeer {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn store(&self) -> &MemoryNoteStore {
        &self.store
    }

    pub fn fail_index(&self) {
        self.with_failures(|failures| failures.index = true);
    }

    pub fn fail_creates_of(&self, id: NoteId) {
        self.with_failures(|failures| {
            failures.creates.insert(id);
        });
    }

    pub fn fail_updates_of(&self, id: NoteId) {
        self.with_failures(|failures| {
            failures.updates.insert(id);
        });
    }

    pub fn fail_fetches_of(&self, id: NoteId) {
        self.with_failures(|failures| {
            failures.fetches.insert(id);
        });
    }

    pub fn clear_failures(&self) {
        self.with_failures(|failures| *failures = Failures::default());
    }

    fn with_failures<T>(&self, f: impl FnOnce(&mut Failures) -> T) -> T {
        f(&mut self.failures.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

fn injected() -> ClientError {
    ClientError::Server {
        status: 503,
        message: "injected failure".to_string(),
    }
}

fn remote_error(error: Error) -> ClientError {
    match error {
        Error::NotFound(id) => ClientError::NotFound(id),
        Error::RevisionMismatch { .. } | Error::AlreadyExists(_) => {
            ClientError::Conflict(error.to_string())
        }
        other => ClientError::Server {
            status: 500,
            message: other.to_string(),
        },
    }
}

#[async_trait]
impl RemoteNoteClient for StorePeer {
    async fn list_index(&self) -> Result<Vec<NoteIndexEntry>, ClientError> {
        if self.with_failures(|failures| failures.index) {
            return Err(ClientError::Transport("connection refused".to_string()));
        }
        let notes = self.store.list().await.map_err(remote_error)?;
        Ok(notes.iter().map(Note::index_entry).collect())
    }

    async fn fetch(&self, id: &NoteId) -> Result<Note, ClientError> {
        if self.with_failures(|failures| failures.fetches.contains(id)) {
            return Err(injected());
        }
        self.store.read(id).await.map_err(remote_error)
    }

    async fn create(&self, note: &Note) -> Result<Note, ClientError> {
        if self.with_failures(|failures| failures.creates.contains(&note.id)) {
            return Err(injected());
        }
        self.store
            .create(note.clone())
            .await
            .map(|outcome| outcome.into_note())
            .map_err(remote_error)
    }

    async fn update(&self, note: &Note, expected: RevisionId) -> Result<Note, ClientError> {
        if self.with_failures(|failures| failures.updates.contains(&note.id)) {
            return Err(injected());
        }
        self.store
            .update(note.clone(), expected)
            .await
            .map_err(remote_error)
    }
}
