//! nete CLI - read, write and synchronize notes from the terminal.

mod cli;
mod commands;
mod config;
mod editable;
mod error;
mod repl;


use clap::Parser;
use tracing_subscriber::filter::Directive;

use crate::cli::{Cli, Commands};
use crate::commands::completions::run_completions;
use crate::commands::{run_note_command, Session};
use crate::config::CliConfig;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = CliConfig::load(&cli)?;
    init_tracing(config.debug)?;
    tracing::debug!("Using config {:?}", config);

    match cli.command {
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
        Commands::Repl => {
            let session = Session::new(config);
            let result = repl::run(&session).await;
            session.close().await;
            result
        }
        Commands::Note(command) => {
            let session = Session::new(config);
            let result = run_note_command(&command, &session).await;
            session.close().await;
            result
        }
    }
}

fn init_tracing(debug: bool) -> Result<(), CliError> {
    let level = if debug { "debug" } else { "warn" };
    let directive = |target: &str| -> Result<Directive, CliError> {
        format!("{target}={level}")
            .parse::<Directive>()
            .map_err(|error| CliError::Config(format!("invalid log directive: {error}")))
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(directive("nete_cli")?)
                .add_directive(directive("nete_core")?),
        )
        .init();
    Ok(())
}
