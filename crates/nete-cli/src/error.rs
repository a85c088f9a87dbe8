use std::io;

use thiserror::Error;

use crate::editable::ParseError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Client(#[from] nete_core::ClientError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Could not parse edited note: {0}")]
    Parse(#[from] ParseError),
    #[error("{0} not found.")]
    NoteNotFound(String),
    #[error("{0}")]
    AmbiguousNoteId(String),
    #[error("Note ID cannot be empty")]
    EmptyNoteId,
    #[error("Editor command failed: {0}")]
    EditorFailed(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Backend URL {0} is not a socket URL")]
    NotASocketUrl(String),
    #[error("REPL error: {0}")]
    Repl(String),
}

impl From<rustyline::error::ReadlineError> for CliError {
    fn from(error: rustyline::error::ReadlineError) -> Self {
        Self::Repl(error.to_string())
    }
}
