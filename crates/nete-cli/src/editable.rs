//! Plain-text rendering of a note for `cat` and the editor.
//!
//! ```text
//! Title: Groceries
//! Id: 0b7c…
//! Created-At: 2024-05-01T10:00:00+00:00
//! Updated-At: 2024-05-01T10:00:00+00:00
//! # optional comment lines
//!
//! milk
//! ```
//!
//! Only the title and the text are taken back from an edited rendering;
//! the other headers are informational.

use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use nete_core::NoteDraft;
use thiserror::Error;

const NOT_SET: &str = "<not set>";
const HEADERS: [&str; 4] = ["Title", "Id", "Created-At", "Updated-At"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Header formatting is not right: »{0}«")]
    MalformedHeader(String),
    #[error("No headers found.")]
    NoHeaders,
    #[error("Header(s) {0} are unknown.")]
    UnknownHeaders(String),
    #[error("Title header is missing.")]
    MissingTitle,
}

/// Title and text as read back from an edited rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditedNote {
    pub title: String,
    pub text: String,
}

pub fn render_editable_note(note: &NoteDraft, message: Option<&str>) -> String {
    let mut rendered = String::new();
    let _ = writeln!(rendered, "Title: {}", note.title);
    let _ = writeln!(
        rendered,
        "Id: {}",
        note.id.map_or_else(|| NOT_SET.to_string(), |id| id.to_string())
    );
    let _ = writeln!(rendered, "Created-At: {}", render_timestamp(note.created_at));
    let _ = writeln!(rendered, "Updated-At: {}", render_timestamp(note.updated_at));
    for line in message.into_iter().flat_map(str::lines) {
        let _ = writeln!(rendered, "# {line}");
    }
    rendered.push('\n');
    rendered.push_str(&note.text);
    rendered
}

fn render_timestamp(value: Option<DateTime<Utc>>) -> String {
    value.map_or_else(
        || NOT_SET.to_string(),
        |timestamp| timestamp.to_rfc3339_opts(SecondsFormat::Secs, false),
    )
}

pub fn parse_editable_note(formatted: &str) -> Result<EditedNote, ParseError> {
    let (header_block, text) = formatted
        .split_once("\n\n")
        .unwrap_or((formatted, ""));

    let mut title = None;
    let mut unknown = Vec::new();
    let mut seen_any = false;
    for line in header_block.lines() {
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ParseError::MalformedHeader(line.to_string()))?;
        let name = name.trim();
        seen_any = true;

        if !HEADERS.contains(&name) {
            unknown.push(name.to_string());
        } else if name == "Title" {
            title = Some(value.trim().to_string());
        }
    }

    if !seen_any {
        return Err(ParseError::NoHeaders);
    }
    if !unknown.is_empty() {
        return Err(ParseError::UnknownHeaders(unknown.join(", ")));
    }

    Ok(EditedNote {
        title: title.ok_or(ParseError::MissingTitle)?,
        text: text.to_string(),
    })
}
