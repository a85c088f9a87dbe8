//! In-memory implementation of the [`NoteStore`] trait.
//!
//! Same semantics as the filesystem store, no persistence. Used by tests and
//! as the second replica of in-process sync scenarios.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{check_create, validate_update, CreateOutcome, NoteStore};
use crate::error::{Error, Result};
use crate::models::{Note, NoteId, RevisionId, SyncStatus};

/// In-memory store; all data is lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryNoteStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    notes: BTreeMap<NoteId, Note>,
    status: SyncStatus,
}

impl MemoryStoreInner {
    fn put(&mut self, mut note: Note) -> Note {
        note.updated_at = Utc::now();
        self.notes.insert(note.id, note.clone());
        note
    }
}

impl MemoryNoteStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read_inner(&self) -> RwLockReadGuard<'_, MemoryStoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_inner(&self) -> RwLockWriteGuard<'_, MemoryStoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn list(&self) -> Result<Vec<Note>> {
        Ok(self.read_inner().notes.values().cloned().collect())
    }

    async fn read(&self, id: &NoteId) -> Result<Note> {
        self.read_inner()
            .notes
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(id))
    }

    async fn write(&self, note: Note) -> Result<Note> {
        Ok(self.write_inner().put(note))
    }

    async fn create(&self, note: Note) -> Result<CreateOutcome> {
        let mut inner = self.write_inner();
        if let Some(stored) = check_create(inner.notes.get(&note.id), &note)? {
            return Ok(CreateOutcome::AlreadyExists(stored));
        }
        Ok(CreateOutcome::Created(inner.put(note)))
    }

    async fn update(&self, note: Note, expected: RevisionId) -> Result<Note> {
        let mut inner = self.write_inner();
        let stored = inner
            .notes
            .get(&note.id)
            .ok_or_else(|| Error::not_found(note.id))?;
        validate_update(stored, &note, expected)?;
        Ok(inner.put(note))
    }

    async fn delete(&self, id: &NoteId) -> Result<()> {
        self.write_inner()
            .notes
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(id))
    }

    async fn load_status(&self) -> Result<SyncStatus> {
        Ok(self.read_inner().status.clone())
    }

    async fn save_status(&self, status: &SyncStatus) -> Result<()> {
        self.write_inner().status = status.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_and_read() {
        let store = MemoryNoteStore::new();
        let note = store.write(Note::new("TITLE", "TEXT")).await.unwrap();

        let fetched = store.read(&note.id).await.unwrap();
        assert_eq!(fetched, note);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let store = MemoryNoteStore::new();
        assert!(store.delete(&NoteId::new()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_update_on_missing_note() {
        let store = MemoryNoteStore::new();
        let note = Note::new("TITLE", "TEXT");
        let err = store.update(note, RevisionId::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
