use nete_core::NeteClient;

use crate::commands::common::resolve_note_id;
use crate::error::CliError;

pub async fn run_rm(note_ids: &[String], client: &NeteClient) -> Result<(), CliError> {
    for query in note_ids {
        let id = resolve_note_id(query, client).await?;
        match client.delete(&id).await {
            Ok(()) => println!("{id}"),
            Err(error) if error.is_not_found() => {
                return Err(CliError::NoteNotFound(query.clone()))
            }
            Err(error) => return Err(error.into()),
        }
    }
    Ok(())
}
