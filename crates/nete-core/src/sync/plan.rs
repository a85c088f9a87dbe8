//! Pure classification of a sync pass.
//!
//! | category | condition |
//! |---|---|
//! | created here | local only |
//! | created there | remote only |
//! | updated here | local differs from snapshot, remote matches it |
//! | updated there | local matches snapshot, remote differs from it |
//! | updated here and there | both differ from the snapshot |
//! | unchanged | local, remote and snapshot agree |
//!
//! Two refinements apply when a note exists on both sides: identical
//! local and remote revisions are unchanged whatever the snapshot says, and
//! a note without a snapshot entry whose revisions differ is treated as
//! updated on both sides.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::models::{NoteId, RevisionId, SyncStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncCategory {
    CreatedHere,
    CreatedThere,
    UpdatedHere,
    UpdatedThere,
    UpdatedHereAndThere,
    Unchanged,
}

impl SyncCategory {
    /// Classify one note id. Returns `None` when the id is on neither side.
    pub fn classify(
        status: Option<RevisionId>,
        local: Option<RevisionId>,
        remote: Option<RevisionId>,
    ) -> Option<Self> {
        let category = match (local, remote) {
            (None, None) => return None,
            (Some(_), None) => Self::CreatedHere,
            (None, Some(_)) => Self::CreatedThere,
            (Some(local), Some(remote)) if local == remote => Self::Unchanged,
            (Some(local), Some(remote)) => match status {
                None => Self::UpdatedHereAndThere,
                Some(base) if local == base => Self::UpdatedThere,
                Some(base) if remote == base => Self::UpdatedHere,
                Some(_) => Self::UpdatedHereAndThere,
            },
        };
        Some(category)
    }
}

/// One step of a sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Copy the local note under a fresh id and push the copy as a create.
    CreateConflictCopy(NoteId),
    PushCreate(NoteId),
    PushUpdate { id: NoteId, expected: RevisionId },
    /// Fetch the remote note and overwrite the local one.
    Pull(NoteId),
    Noop(NoteId),
}

impl SyncAction {
    pub const fn note_id(&self) -> NoteId {
        match *self {
            Self::CreateConflictCopy(id)
            | Self::PushCreate(id)
            | Self::PushUpdate { id, .. }
            | Self::Pull(id)
            | Self::Noop(id) => id,
        }
    }

    const fn phase(&self) -> u8 {
        match self {
            Self::CreateConflictCopy(_) => 0,
            Self::PushCreate(_) => 1,
            Self::PushUpdate { .. } => 2,
            Self::Pull(_) => 3,
            Self::Noop(_) => 4,
        }
    }
}

/// Actions of one pass, already in execution order: conflict copies, push
/// creates, push updates, pulls. Within a phase ids ascend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub actions: Vec<SyncAction>,
    pub categories: BTreeMap<NoteId, SyncCategory>,
}

impl SyncPlan {
    pub fn build(
        status: &SyncStatus,
        local: &BTreeMap<NoteId, RevisionId>,
        remote: &BTreeMap<NoteId, RevisionId>,
    ) -> Self {
        let ids: BTreeSet<NoteId> = local.keys().chain(remote.keys()).copied().collect();
        let mut plan = Self::default();

        for id in ids {
            let base = status.get(&id);
            let Some(category) =
                SyncCategory::classify(base, local.get(&id).copied(), remote.get(&id).copied())
            else {
                continue;
            };
            plan.categories.insert(id, category);

            match category {
                SyncCategory::CreatedHere => plan.actions.push(SyncAction::PushCreate(id)),
                SyncCategory::CreatedThere | SyncCategory::UpdatedThere => {
                    plan.actions.push(SyncAction::Pull(id));
                }
                SyncCategory::UpdatedHere => {
                    // UpdatedHere is only produced with a snapshot entry.
                    if let Some(expected) = base {
                        plan.actions.push(SyncAction::PushUpdate { id, expected });
                    }
                }
                SyncCategory::UpdatedHereAndThere => {
                    plan.actions.push(SyncAction::CreateConflictCopy(id));
                    plan.actions.push(SyncAction::Pull(id));
                }
                SyncCategory::Unchanged => plan.actions.push(SyncAction::Noop(id)),
            }
        }

        // Stable sort keeps the ascending id order inside each phase.
        plan.actions.sort_by_key(SyncAction::phase);
        plan
    }

    pub fn count(&self, category: SyncCategory) -> usize {
        self.categories
            .values()
            .filter(|&&candidate| candidate == category)
            .count()
    }
}
