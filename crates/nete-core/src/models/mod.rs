//! Data models for nete

mod note;
mod status;

pub use note::{Note, NoteDraft, NoteId, NoteIndexEntry, NoteSummary, RevisionId};
pub use status::SyncStatus;
