pub mod cat;
pub mod common;
pub mod completions;
pub mod edit;
pub mod ls;
pub mod new;
pub mod rm;
pub mod socket;
pub mod sync;

use nete_core::NeteClient;
use tokio::sync::OnceCell;

use crate::cli::NoteCommand;
use crate::config::CliConfig;
use crate::error::CliError;

/// Configuration plus a backend connection opened on first use, so that
/// `socket` never connects and the REPL reuses one connection (and one SSH
/// tunnel) for all its commands.
pub struct Session {
    config: CliConfig,
    client: OnceCell<NeteClient>,
}

impl Session {
    pub fn new(config: CliConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    pub const fn config(&self) -> &CliConfig {
        &self.config
    }

    pub async fn client(&self) -> Result<&NeteClient, CliError> {
        self.client
            .get_or_try_init(|| async {
                let url = self.config.backend_url()?;
                tracing::debug!(%url, "connecting to backend");
                let client = NeteClient::connect_with_timeout(url, self.config.timeout).await?;
                Ok::<_, CliError>(client)
            })
            .await
    }

    pub async fn close(self) {
        if let Some(client) = self.client.into_inner() {
            client.close().await;
        }
    }
}

pub async fn run_note_command(command: &NoteCommand, session: &Session) -> Result<(), CliError> {
    match command {
        NoteCommand::Ls => ls::run_ls(session.client().await?).await,
        NoteCommand::Cat { note_ids } => cat::run_cat(note_ids, session.client().await?).await,
        NoteCommand::New { title } => {
            new::run_new(title.as_deref(), session.client().await?).await
        }
        NoteCommand::Edit { note_id } => edit::run_edit(note_id, session.client().await?).await,
        NoteCommand::Rm { note_ids } => rm::run_rm(note_ids, session.client().await?).await,
        NoteCommand::Sync => sync::run_sync(session.client().await?).await,
        NoteCommand::Socket => socket::run_socket(session.config()),
    }
}
