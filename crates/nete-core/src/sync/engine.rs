use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info, warn};

use super::plan::{SyncAction, SyncPlan};
use super::report::{ConflictCopy, SyncFailure, SyncOperation, SyncReport};
use super::{RemoteNoteClient, SyncError};
use crate::models::{Note, NoteId, RevisionId, SyncStatus};
use crate::storage::NoteStore;

/// Runs sync passes between a local store and one remote replica.
///
/// Phases run in a fixed order: conflict copies, push creates, push
/// updates, pulls, and finally the new snapshot is saved. Failures of a
/// single note, remote errors or a local note that disappeared mid-pass,
/// are logged and reported without stopping the pass. Any other local
/// storage failure aborts it before the snapshot is written.
pub struct Synchronizer<'a> {
    store: &'a dyn NoteStore,
    remote: &'a dyn RemoteNoteClient,
}

/// Bookkeeping of one pass.
#[derive(Default)]
struct PassState {
    report: SyncReport,
    /// Local revisions as listed when the pass was planned.
    planned: BTreeMap<NoteId, RevisionId>,
    /// Revisions known to be the same on both replicas.
    confirmed: BTreeMap<NoteId, RevisionId>,
}

impl PassState {
    fn fail(&mut self, note_id: NoteId, operation: SyncOperation, error: &impl fmt::Display) {
        warn!(%note_id, %operation, %error, "sync operation failed");
        self.report.failures.push(SyncFailure {
            note_id,
            operation,
            message: error.to_string(),
        });
    }

    fn confirm(&mut self, note_id: NoteId, revision_id: RevisionId) {
        self.confirmed.insert(note_id, revision_id);
    }

    fn confirm_planned(&mut self, note_id: NoteId) {
        if let Some(&revision_id) = self.planned.get(&note_id) {
            self.confirm(note_id, revision_id);
        }
    }
}

impl<'a> Synchronizer<'a> {
    pub fn new(store: &'a dyn NoteStore, remote: &'a dyn RemoteNoteClient) -> Self {
        Self { store, remote }
    }

    pub async fn synchronize(&self) -> Result<SyncReport, SyncError> {
        let status = self.store.load_status().await?;
        let local: BTreeMap<NoteId, RevisionId> = self
            .store
            .list()
            .await?
            .iter()
            .map(|note| (note.id, note.revision_id))
            .collect();
        let remote: BTreeMap<NoteId, RevisionId> = self
            .remote
            .list_index()
            .await
            .map_err(SyncError::Remote)?
            .into_iter()
            .map(|entry| (entry.id, entry.revision_id))
            .collect();

        let plan = SyncPlan::build(&status, &local, &remote);
        info!(
            local = local.len(),
            remote = remote.len(),
            actions = plan.actions.len(),
            "starting sync pass"
        );
        let mut state = PassState {
            report: SyncReport::from_plan(&plan),
            planned: local,
            ..PassState::default()
        };

        for action in plan.actions {
            self.run(action, &mut state).await?;
        }

        let snapshot = self.snapshot(&status, &state.confirmed).await?;
        self.store.save_status(&snapshot).await?;

        info!(report = %state.report, "sync pass finished");
        Ok(state.report)
    }

    async fn run(&self, action: SyncAction, state: &mut PassState) -> Result<(), SyncError> {
        match action {
            SyncAction::CreateConflictCopy(id) => {
                let Some(note) = self.read_local(id, state).await? else {
                    return Ok(());
                };
                let copy = self.store.write(note.conflict_copy()).await?;
                debug!(original = %id, copy = %copy.id, "created conflict copy");
                state.report.conflict_copies.push(ConflictCopy {
                    original: id,
                    copy: copy.id,
                });
                match self.remote.create(&copy).await {
                    Ok(_) => state.confirm(copy.id, copy.revision_id),
                    Err(error) => state.fail(copy.id, SyncOperation::PushCreate, &error),
                }
            }
            SyncAction::PushCreate(id) => {
                let Some(note) = self.read_local(id, state).await? else {
                    return Ok(());
                };
                debug!(note_id = %id, "pushing new note");
                match self.remote.create(&note).await {
                    Ok(_) => state.confirm(id, note.revision_id),
                    Err(error) => state.fail(id, SyncOperation::PushCreate, &error),
                }
            }
            SyncAction::PushUpdate { id, expected } => {
                let Some(note) = self.read_local(id, state).await? else {
                    return Ok(());
                };
                debug!(note_id = %id, %expected, "pushing update");
                match self.remote.update(&note, expected).await {
                    Ok(_) => state.confirm(id, note.revision_id),
                    Err(error) => state.fail(id, SyncOperation::PushUpdate, &error),
                }
            }
            SyncAction::Pull(id) => {
                debug!(note_id = %id, "pulling note");
                match self.remote.fetch(&id).await {
                    Ok(note) => {
                        let note = self.store.write(note).await?;
                        state.confirm(id, note.revision_id);
                    }
                    Err(error) => {
                        state.fail(id, SyncOperation::Pull, &error);
                        // The local side is settled; the remote change is
                        // pulled again next pass.
                        state.confirm_planned(id);
                    }
                }
            }
            SyncAction::Noop(id) => state.confirm_planned(id),
        }
        Ok(())
    }

    /// The local note `id`, or `None` once a failure is recorded when it was
    /// deleted after the pass was planned.
    async fn read_local(
        &self,
        id: NoteId,
        state: &mut PassState,
    ) -> Result<Option<Note>, SyncError> {
        match self.store.read(&id).await {
            Ok(note) => Ok(Some(note)),
            Err(error) if error.is_not_found() => {
                state.fail(id, SyncOperation::Read, &error);
                Ok(None)
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Confirmed revisions of the notes that still carry them locally. Every
    /// other local note keeps its previous entry, or none, and is compared
    /// again on the next pass.
    async fn snapshot(
        &self,
        previous: &SyncStatus,
        confirmed: &BTreeMap<NoteId, RevisionId>,
    ) -> Result<SyncStatus, SyncError> {
        let mut snapshot = SyncStatus::new();
        for note in self.store.list().await? {
            let revision_id = match confirmed.get(&note.id) {
                Some(&revision_id) if revision_id == note.revision_id => Some(revision_id),
                _ => previous.get(&note.id),
            };
            if let Some(revision_id) = revision_id {
                snapshot.insert(note.id, revision_id);
            }
        }
        Ok(snapshot)
    }
}
