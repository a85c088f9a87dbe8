//! Small helpers shared by the backend and the CLI.

use crate::models::NoteId;

/// Length of the id prefix shown when a full id would be too noisy.
pub const SHORT_ID_LEN: usize = 13;

/// Trim a configured value; blank values count as unset.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// First characters of a note id, enough to tell notes apart in messages.
pub fn short_id(id: &NoteId) -> String {
    id.to_string().chars().take(SHORT_ID_LEN).collect()
}

/// Response body cut down to something that fits in an error message.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}
