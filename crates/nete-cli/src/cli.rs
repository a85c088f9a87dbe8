use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "nete")]
#[command(about = "Read, write and synchronize notes kept by a nete backend")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug output
    #[arg(short = 'D', long, global = true)]
    pub debug: bool,

    /// Read configuration from this file instead of the default one
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Backend to talk to (http://, https://, local:/path or http+ssh://)
    #[arg(long, global = true, value_name = "URL")]
    pub backend_url: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(flatten)]
    Note(NoteCommand),
    /// Run an interactive shell
    Repl,
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Write completion script to file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

/// Commands available both on the command line and in the REPL.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum NoteCommand {
    /// List notes sorted by title
    Ls,
    /// Print notes to stdout
    Cat {
        /// Note IDs or unique ID prefixes
        #[arg(required = true)]
        note_ids: Vec<String>,
    },
    /// Create a note in $EDITOR
    New {
        /// Note title
        title: Option<String>,
    },
    /// Edit a note in $EDITOR
    Edit {
        /// Note ID or unique ID prefix
        note_id: String,
    },
    /// Delete notes
    Rm {
        /// Note IDs or unique ID prefixes
        #[arg(required = true)]
        note_ids: Vec<String>,
    },
    /// Ask the backend to synchronize with its configured peer
    Sync,
    /// Print the backend's Unix socket path
    Socket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
