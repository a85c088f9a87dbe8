use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use nete_core::util::short_id;
use nete_core::{NeteClient, NoteDraft, NoteId, RemoteNoteClient};

use crate::editable::{parse_editable_note, render_editable_note, EditedNote};
use crate::error::CliError;

/// Resolve a full note id or a unique prefix of one.
pub async fn resolve_note_id(query: &str, client: &NeteClient) -> Result<NoteId, CliError> {
    let query = normalize_note_identifier(query)?;
    if let Ok(id) = query.parse::<NoteId>() {
        return Ok(id);
    }

    let ids: Vec<NoteId> = client
        .list_index()
        .await?
        .into_iter()
        .map(|entry| entry.id)
        .collect();
    match_note_id(&query, &ids)
}

pub fn match_note_id(query: &str, ids: &[NoteId]) -> Result<NoteId, CliError> {
    let matching: Vec<NoteId> = ids
        .iter()
        .filter(|id| id.to_string().starts_with(query))
        .copied()
        .collect();

    match matching.as_slice() {
        [] => Err(CliError::NoteNotFound(query.to_string())),
        [id] => Ok(*id),
        _ => {
            let options = matching
                .iter()
                .take(3)
                .map(short_id)
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousNoteId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn normalize_note_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyNoteId)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Open the editable rendering of `note` in the user's editor and read the
/// title and text back.
pub fn edit_in_editor(note: &NoteDraft, message: Option<&str>) -> Result<EditedNote, CliError> {
    edit_with(&preferred_editor(), note, message)
}

pub fn edit_with(
    editor: &str,
    note: &NoteDraft,
    message: Option<&str>,
) -> Result<EditedNote, CliError> {
    let temp_file = create_temp_note_file_path();
    std::fs::write(&temp_file, render_editable_note(note, message))?;

    let launch_result = launch_editor(editor, &temp_file);
    let edited = std::fs::read_to_string(&temp_file);
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(parse_editable_note(&edited?)?)
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    match Command::new(editor).arg(file_path).status() {
        Ok(status) => {
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}, not changing note"
                )))
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let mut parts = editor.split_whitespace();
            let Some(program) = parts.next() else {
                return Err(CliError::EditorFailed("empty EDITOR command".into()));
            };

            let mut command = Command::new(program);
            command.args(parts).arg(file_path);

            let status = command.status()?;
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}, not changing note"
                )))
            }
        }
        Err(err) => Err(CliError::Io(err)),
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

pub fn create_temp_note_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("nete-note-{}-{now}.nete", std::process::id()))
}
