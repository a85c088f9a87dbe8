//! Directory-backed note store: one JSON file per note plus `status.json`.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::lock::StorageLock;
use super::{check_create, validate_update, CreateOutcome, NoteStore};
use crate::error::{Error, Result};
use crate::models::{Note, NoteId, RevisionId, SyncStatus};

const NOTE_EXTENSION: &str = "nete";
const STATUS_FILE: &str = "status.json";

/// Filesystem implementation of [`NoteStore`].
///
/// Holds the directory's [`StorageLock`] for its whole lifetime. Writers of
/// the same note id are serialized; every file is replaced atomically by
/// writing a sibling temp file and renaming it over the target.
pub struct FilesystemNoteStore {
    base_dir: PathBuf,
    lock: StorageLock,
    note_locks: Mutex<HashMap<NoteId, Arc<AsyncMutex<()>>>>,
    status_lock: AsyncMutex<()>,
}

impl FilesystemNoteStore {
    /// Open (creating if needed) the store rooted at `base_dir`.
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        tracing::info!("Opening storage in directory {}", base_dir.display());

        let lock = StorageLock::acquire(&base_dir)?;
        Ok(Self {
            base_dir,
            lock,
            note_locks: Mutex::new(HashMap::new()),
            status_lock: AsyncMutex::new(()),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn lock_path(&self) -> &Path {
        self.lock.path()
    }

    fn note_path(&self, id: &NoteId) -> PathBuf {
        self.base_dir.join(format!("{id}.{NOTE_EXTENSION}"))
    }

    fn status_path(&self) -> PathBuf {
        self.base_dir.join(STATUS_FILE)
    }

    fn note_locks(&self) -> MutexGuard<'_, HashMap<NoteId, Arc<AsyncMutex<()>>>> {
        self.note_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn lock_note(&self, id: &NoteId) -> NoteLock<'_> {
        let lock = self.note_locks().entry(*id).or_default().clone();
        NoteLock {
            store: self,
            id: *id,
            guard: lock.lock_owned().await,
        }
    }

    async fn read_note_file(path: &Path, id: impl ToString) -> Result<Note> {
        tracing::debug!("Opening file {} for reading", path.display());
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Err(Error::not_found(id)),
            Err(error) => Err(error.into()),
        }
    }

    async fn read_existing(&self, id: &NoteId) -> Result<Option<Note>> {
        match Self::read_note_file(&self.note_path(id), id).await {
            Ok(note) => Ok(Some(note)),
            Err(error) if error.is_not_found() => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Write without taking the per-note lock; callers must hold it.
    async fn write_unlocked(&self, mut note: Note) -> Result<Note> {
        note.updated_at = Utc::now();
        let path = self.note_path(&note.id);
        tracing::debug!("Opening file {} for writing", path.display());
        write_atomic(&path, &serde_json::to_vec_pretty(&note)?).await?;
        Ok(note)
    }
}

#[async_trait]
impl NoteStore for FilesystemNoteStore {
    async fn list(&self) -> Result<Vec<Note>> {
        let mut notes = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.base_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(NOTE_EXTENSION) {
                continue;
            }
            let label = path.display().to_string();
            notes.push(Self::read_note_file(&path, label).await?);
        }

        notes.sort_by_key(|note| note.id);
        Ok(notes)
    }

    async fn read(&self, id: &NoteId) -> Result<Note> {
        Self::read_note_file(&self.note_path(id), id).await
    }

    async fn write(&self, note: Note) -> Result<Note> {
        let _lock = self.lock_note(&note.id).await;
        self.write_unlocked(note).await
    }

    async fn create(&self, note: Note) -> Result<CreateOutcome> {
        let _lock = self.lock_note(&note.id).await;

        let existing = self.read_existing(&note.id).await?;
        if let Some(stored) = check_create(existing.as_ref(), &note)? {
            return Ok(CreateOutcome::AlreadyExists(stored));
        }
        Ok(CreateOutcome::Created(self.write_unlocked(note).await?))
    }

    async fn update(&self, note: Note, expected: RevisionId) -> Result<Note> {
        let _lock = self.lock_note(&note.id).await;

        let stored = self.read(&note.id).await?;
        validate_update(&stored, &note, expected)?;
        self.write_unlocked(note).await
    }

    async fn delete(&self, id: &NoteId) -> Result<()> {
        let _lock = self.lock_note(id).await;

        match tokio::fs::remove_file(self.note_path(id)).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Err(Error::not_found(id)),
            Err(error) => Err(error.into()),
        }
    }

    async fn load_status(&self) -> Result<SyncStatus> {
        let _guard = self.status_lock.lock().await;
        match tokio::fs::read(self.status_path()).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(SyncStatus::new()),
            Err(error) => Err(error.into()),
        }
    }

    async fn save_status(&self, status: &SyncStatus) -> Result<()> {
        let _guard = self.status_lock.lock().await;
        write_atomic(&self.status_path(), &serde_json::to_vec_pretty(status)?).await
    }
}

/// Exclusive hold on one note id. The last holder removes the id's entry
/// from the lock map.
struct NoteLock<'a> {
    store: &'a FilesystemNoteStore,
    id: NoteId,
    guard: OwnedMutexGuard<()>,
}

impl Drop for NoteLock<'_> {
    fn drop(&mut self) {
        let mut locks = self.store.note_locks();
        let held = OwnedMutexGuard::mutex(&self.guard);
        // Only the map and this guard still point at the mutex.
        let idle = locks
            .get(&self.id)
            .is_some_and(|lock| Arc::ptr_eq(lock, held) && Arc::strong_count(lock) <= 2);
        if idle {
            locks.remove(&self.id);
        }
    }
}

async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let mut temp_name = path.as_os_str().to_os_string();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    tokio::fs::write(&temp_path, contents).await?;
    if let Err(error) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(error.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, FilesystemNoteStore) {
        let dir = tempdir().unwrap();
        let store = FilesystemNoteStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_list() {
        let (_dir, store) = setup();
        assert!(store.list().await.unwrap().is_empty());

        let note = Note::new("TITLE", "TEXT");
        store.write(note.clone()).await.unwrap();

        let notes = store.list().await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, note.id);
        assert_eq!(notes[0].title, "TITLE");
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let (_dir, store) = setup();
        let err = store.read(&NoteId::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_write_updates_existing_note() {
        let (_dir, store) = setup();
        let note = Note::new("TITLE", "TEXT");
        let written = store.write(note.clone()).await.unwrap();

        let edited = written.clone().edited("NEW TITLE", "NEW TEXT");
        store.write(edited.clone()).await.unwrap();

        let stored = store.read(&note.id).await.unwrap();
        assert_eq!(stored.created_at, note.created_at);
        assert!(stored.updated_at >= written.updated_at);
        assert_eq!(stored.title, "NEW TITLE");
        assert_eq!(stored.text, "NEW TEXT");
        assert_eq!(stored.revision_id, edited.revision_id);
    }

    #[tokio::test]
    async fn test_delete_removes_note() {
        let (_dir, store) = setup();
        let note = store.write(Note::new("TITLE", "TEXT")).await.unwrap();

        store.delete(&note.id).await.unwrap();

        assert!(store.read(&note.id).await.unwrap_err().is_not_found());
        assert!(store.delete(&note.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_create_is_idempotent_per_version() {
        let (_dir, store) = setup();
        let note = Note::new("TITLE", "TEXT");

        let first = store.create(note.clone()).await.unwrap();
        assert!(matches!(first, CreateOutcome::Created(_)));

        let second = store.create(note.clone()).await.unwrap();
        assert!(matches!(second, CreateOutcome::AlreadyExists(_)));

        let other_version = note.clone().edited("OTHER", "");
        let err = store.create(other_version).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(id) if id == note.id));
    }

    #[tokio::test]
    async fn test_update_checks_expected_revision() {
        let (_dir, store) = setup();
        let note = store.write(Note::new("TITLE", "TEXT")).await.unwrap();

        let stale = note.clone().edited("A", "");
        let err = store
            .update(stale, RevisionId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RevisionMismatch { .. }));

        let same_revision = Note {
            title: "B".to_string(),
            ..note.clone()
        };
        let err = store
            .update(same_revision, note.revision_id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let edited = note.clone().edited("C", "");
        let updated = store.update(edited.clone(), note.revision_id).await.unwrap();
        assert_eq!(updated.revision_id, edited.revision_id);
        assert_eq!(store.read(&note.id).await.unwrap().title, "C");
    }

    #[tokio::test]
    async fn test_update_rejects_changed_created_at() {
        let (_dir, store) = setup();
        let note = store.write(Note::new("TITLE", "TEXT")).await.unwrap();

        let mut edited = note.clone().edited("X", "");
        edited.created_at = note.created_at - chrono::Duration::days(1);
        let err = store.update(edited, note.revision_id).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(message) if message.contains("created_at")));
    }

    #[tokio::test]
    async fn test_status_round_trip() {
        let (_dir, store) = setup();
        assert!(store.load_status().await.unwrap().is_empty());

        let note = store.write(Note::new("TITLE", "TEXT")).await.unwrap();
        let status = SyncStatus::from_notes([&note]);
        store.save_status(&status).await.unwrap();

        assert_eq!(store.load_status().await.unwrap(), status);
    }

    #[tokio::test]
    async fn test_list_ignores_foreign_files() {
        let (dir, store) = setup();
        store.write(Note::new("TITLE", "TEXT")).await.unwrap();
        store.save_status(&SyncStatus::new()).await.unwrap();
        std::fs::write(dir.path().join("README"), "not a note").unwrap();

        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_open_twice_is_locked() {
        let (dir, _store) = setup();
        let err = FilesystemNoteStore::open(dir.path()).err().unwrap();
        assert!(matches!(err, Error::Locked(_)));
    }

    #[tokio::test]
    async fn test_concurrent_writes_to_one_note_leave_a_whole_file() {
        let (_dir, store) = setup();
        let store = Arc::new(store);
        let note = store.write(Note::new("TITLE", "TEXT")).await.unwrap();

        let mut handles = Vec::new();
        for index in 0..8 {
            let store = store.clone();
            let edited = note.clone().edited(format!("T{index}"), "x".repeat(4096));
            handles.push(tokio::spawn(async move { store.write(edited).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = store.read(&note.id).await.unwrap();
        assert!(stored.title.starts_with('T'));
        assert_eq!(stored.text.len(), 4096);
    }

    #[tokio::test]
    async fn test_note_locks_are_released() {
        let (_dir, store) = setup();
        let note = store.write(Note::new("TITLE", "TEXT")).await.unwrap();
        store
            .update(note.clone().edited("NEW", ""), note.revision_id)
            .await
            .unwrap();
        let other = store.create(Note::new("OTHER", "")).await.unwrap();
        store.delete(&note.id).await.unwrap();

        assert!(store.note_locks().is_empty());

        let _held = store.lock_note(&other.into_note().id).await;
        assert_eq!(store.note_locks().len(), 1);
    }
}
