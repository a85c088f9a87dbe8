use nete_core::{NeteClient, NoteSummary};

use crate::error::CliError;

pub async fn run_ls(client: &NeteClient) -> Result<(), CliError> {
    let notes = client.list_summaries().await?;
    for line in format_listing(notes) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_listing(mut notes: Vec<NoteSummary>) -> Vec<String> {
    notes.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
    notes
        .iter()
        .map(|note| format!("{}   {}", note.id, note.title))
        .collect()
}
