//! Last-synchronized revision snapshot

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Note, NoteId, RevisionId};

/// Revision of every note as last observed synchronized between two replicas.
///
/// Serialized as a list of `{note_id, revision_id}` items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<StatusItem>", into = "Vec<StatusItem>")]
pub struct SyncStatus {
    revisions: BTreeMap<NoteId, RevisionId>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusItem {
    note_id: NoteId,
    revision_id: RevisionId,
}

impl SyncStatus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current revision of every given note
    #[must_use]
    pub fn from_notes<'a>(notes: impl IntoIterator<Item = &'a Note>) -> Self {
        notes
            .into_iter()
            .map(|note| (note.id, note.revision_id))
            .collect()
    }

    #[must_use]
    pub fn get(&self, id: &NoteId) -> Option<RevisionId> {
        self.revisions.get(id).copied()
    }

    pub fn insert(&mut self, id: NoteId, revision_id: RevisionId) -> Option<RevisionId> {
        self.revisions.insert(id, revision_id)
    }

    pub fn remove(&mut self, id: &NoteId) -> Option<RevisionId> {
        self.revisions.remove(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NoteId, &RevisionId)> {
        self.revisions.iter()
    }
}

impl FromIterator<(NoteId, RevisionId)> for SyncStatus {
    fn from_iter<T: IntoIterator<Item = (NoteId, RevisionId)>>(iter: T) -> Self {
        Self {
            revisions: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<StatusItem>> for SyncStatus {
    fn from(items: Vec<StatusItem>) -> Self {
        items
            .into_iter()
            .map(|item| (item.note_id, item.revision_id))
            .collect()
    }
}

impl From<SyncStatus> for Vec<StatusItem> {
    fn from(status: SyncStatus) -> Self {
        status
            .revisions
            .into_iter()
            .map(|(note_id, revision_id)| StatusItem {
                note_id,
                revision_id,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_as_item_list() {
        let note = Note::new("Title", "Text");
        let status = SyncStatus::from_notes([&note]);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "note_id": note.id.to_string(),
                "revision_id": note.revision_id.to_string(),
            }])
        );

        let parsed: SyncStatus = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, status);
    }

    #[test]
    fn test_empty_status() {
        let status: SyncStatus = serde_json::from_str("[]").unwrap();
        assert!(status.is_empty());
        assert_eq!(status.get(&NoteId::new()), None);
    }
}
