//! Note model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a note, assigned at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NoteId(Uuid);

impl NoteId {
    /// Create a new random note ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NoteId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

/// Opaque version marker, replaced on every content write.
///
/// Only compared for equality; revisions carry no ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RevisionId(Uuid);

impl RevisionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RevisionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RevisionId {
    type Err = uuid::Error;

    /// Accepts bare UUIDs as well as quoted entity tags (`"<uuid>"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().trim_start_matches("W/").trim_matches('"');
        Ok(Self(Uuid::parse_str(value)?))
    }
}

/// A note in the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Unique identifier
    pub id: NoteId,
    /// Current revision
    pub revision_id: RevisionId,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last write timestamp
    pub updated_at: DateTime<Utc>,
    pub title: String,
    pub text: String,
}

impl Note {
    /// Create a new note with fresh identifiers
    #[must_use]
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: NoteId::new(),
            revision_id: RevisionId::new(),
            created_at: now,
            updated_at: now,
            title: title.into(),
            text: text.into(),
        }
    }

    /// Replace title and text, assigning a new revision
    #[must_use]
    pub fn edited(mut self, title: impl Into<String>, text: impl Into<String>) -> Self {
        self.title = title.into();
        self.text = text.into();
        self.revision_id = RevisionId::new();
        self
    }

    /// Duplicate this note under a new identity, keeping its content and timestamps
    #[must_use]
    pub fn conflict_copy(&self) -> Self {
        Self {
            id: NoteId::new(),
            revision_id: RevisionId::new(),
            ..self.clone()
        }
    }

    /// Whether both notes are the same version of the same note
    #[must_use]
    pub fn same_version(&self, other: &Self) -> bool {
        self.id == other.id && self.revision_id == other.revision_id
    }

    #[must_use]
    pub const fn index_entry(&self) -> NoteIndexEntry {
        NoteIndexEntry {
            id: self.id,
            revision_id: self.revision_id,
        }
    }

    #[must_use]
    pub fn summary(&self) -> NoteSummary {
        NoteSummary {
            id: self.id,
            revision_id: self.revision_id,
            title: self.title.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Creation payload; identifiers and timestamps are assigned when absent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NoteId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_id: Option<RevisionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub title: String,
    #[serde(default)]
    pub text: String,
}

impl NoteDraft {
    #[must_use]
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    /// Fill in whatever the caller left out
    #[must_use]
    pub fn into_note(self) -> Note {
        let now = Utc::now();
        Note {
            id: self.id.unwrap_or_default(),
            revision_id: self.revision_id.unwrap_or_default(),
            created_at: self.created_at.unwrap_or(now),
            updated_at: self.updated_at.unwrap_or(now),
            title: self.title,
            text: self.text,
        }
    }
}

impl From<Note> for NoteDraft {
    fn from(note: Note) -> Self {
        Self {
            id: Some(note.id),
            revision_id: Some(note.revision_id),
            created_at: Some(note.created_at),
            updated_at: Some(note.updated_at),
            title: note.title,
            text: note.text,
        }
    }
}

/// Lightweight index row exchanged during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteIndexEntry {
    pub id: NoteId,
    pub revision_id: RevisionId,
}

/// Listing row for human-facing views
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSummary {
    pub id: NoteId,
    pub revision_id: RevisionId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
