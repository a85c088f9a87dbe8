use nete_core::{NeteClient, SyncReport};

use crate::error::CliError;

pub async fn run_sync(client: &NeteClient) -> Result<(), CliError> {
    let report = client.trigger_sync().await?;
    for line in format_sync_report(&report) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_sync_report(report: &SyncReport) -> Vec<String> {
    let mut lines = vec![format!("Synchronized: {report}")];
    lines.extend(report.conflict_copies.iter().map(|conflict| {
        format!(
            "Conflict on {}: local version kept as {}",
            conflict.original, conflict.copy
        )
    }));
    lines.extend(report.failures.iter().map(|failure| {
        format!(
            "Failed to {} {}: {}",
            failure.operation, failure.note_id, failure.message
        )
    }));
    lines
}
