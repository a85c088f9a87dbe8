use nete_core::{NeteClient, NoteDraft};

use crate::commands::common::edit_in_editor;
use crate::error::CliError;

const NEW_NOTE_MESSAGE: &str = "Write the note below the blank line. Save and quit to create it.";

pub async fn run_new(title: Option<&str>, client: &NeteClient) -> Result<(), CliError> {
    let draft = NoteDraft::new(title.unwrap_or_default(), "");
    let edited = tokio::task::block_in_place(|| edit_in_editor(&draft, Some(NEW_NOTE_MESSAGE)))?;

    let note = client
        .create_draft(&NoteDraft::new(edited.title, edited.text))
        .await?;
    println!("Created note with id {}", note.id);
    Ok(())
}
