use nete_core::{NeteClient, NoteDraft, RemoteNoteClient};

use crate::commands::common::{edit_in_editor, resolve_note_id};
use crate::error::CliError;

pub async fn run_edit(note_id: &str, client: &NeteClient) -> Result<(), CliError> {
    let id = resolve_note_id(note_id, client).await?;
    let note = match client.fetch(&id).await {
        Ok(note) => note,
        Err(error) if error.is_not_found() => {
            return Err(CliError::NoteNotFound(note_id.to_string()))
        }
        Err(error) => return Err(error.into()),
    };

    let draft = NoteDraft::from(note.clone());
    let edited = tokio::task::block_in_place(|| edit_in_editor(&draft, None))?;
    if edited.title == note.title && edited.text == note.text {
        println!("{}", note.id);
        return Ok(());
    }

    let expected = note.revision_id;
    let updated = note.edited(edited.title, edited.text);
    client.update(&updated, expected).await?;
    println!("{}", updated.id);
    Ok(())
}
