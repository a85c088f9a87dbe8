use std::fmt;

use serde::{Deserialize, Serialize};

use super::plan::{SyncCategory, SyncPlan};
use crate::models::NoteId;

/// Outcome of one sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub created_here: usize,
    pub created_there: usize,
    pub updated_here: usize,
    pub updated_there: usize,
    pub conflicts: usize,
    pub unchanged: usize,
    #[serde(default)]
    pub conflict_copies: Vec<ConflictCopy>,
    #[serde(default)]
    pub failures: Vec<SyncFailure>,
}

/// A locally edited note that was preserved under a new id because the
/// remote side changed it as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictCopy {
    pub original: NoteId,
    pub copy: NoteId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    /// The local copy vanished between listing and use.
    Read,
    PushCreate,
    PushUpdate,
    Pull,
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Read => "read",
            Self::PushCreate => "push create",
            Self::PushUpdate => "push update",
            Self::Pull => "pull",
        };
        f.write_str(name)
    }
}

/// A per-note operation that failed without aborting the pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    pub note_id: NoteId,
    pub operation: SyncOperation,
    pub message: String,
}

impl SyncReport {
    pub(crate) fn from_plan(plan: &SyncPlan) -> Self {
        Self {
            created_here: plan.count(SyncCategory::CreatedHere),
            created_there: plan.count(SyncCategory::CreatedThere),
            updated_here: plan.count(SyncCategory::UpdatedHere),
            updated_there: plan.count(SyncCategory::UpdatedThere),
            conflicts: plan.count(SyncCategory::UpdatedHereAndThere),
            unchanged: plan.count(SyncCategory::Unchanged),
            ..Self::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created here, {} created there, {} updated here, {} updated there, {} conflicts, {} unchanged",
            self.created_here,
            self.created_there,
            self.updated_here,
            self.updated_there,
            self.conflicts,
            self.unchanged
        )?;
        if !self.failures.is_empty() {
            write!(f, ", {} failed", self.failures.len())?;
        }
        Ok(())
    }
}
