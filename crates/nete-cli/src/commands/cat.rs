use nete_core::{NeteClient, NoteDraft, RemoteNoteClient};

use crate::commands::common::resolve_note_id;
use crate::editable::render_editable_note;
use crate::error::CliError;

pub async fn run_cat(note_ids: &[String], client: &NeteClient) -> Result<(), CliError> {
    for query in note_ids {
        let id = resolve_note_id(query, client).await?;
        let note = match client.fetch(&id).await {
            Ok(note) => note,
            Err(error) if error.is_not_found() => {
                return Err(CliError::NoteNotFound(query.clone()))
            }
            Err(error) => return Err(error.into()),
        };
        println!("{}", render_editable_note(&NoteDraft::from(note), None));
    }
    Ok(())
}
