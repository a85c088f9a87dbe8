//! Interactive shell.
//!
//! Line editing runs on its own thread; every parsed command is sent to the
//! async side, which runs it and answers whether to keep reading.

use std::path::PathBuf;

use clap::Subcommand;
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};
use tokio::sync::{mpsc, oneshot};

use crate::cli::NoteCommand;
use crate::commands::{run_note_command, Session};
use crate::error::CliError;

const PROMPT: &str = "nete> ";

pub async fn run(session: &Session) -> Result<(), CliError> {
    println!("Welcome to nete. Type `help` for a list of commands.");
    let mut repl_rx = Repl::spawn(history_path());
    while let Some((cmd, reply)) = repl_rx.recv().await {
        let next = match cmd {
            ReplCmd::Note(command) => {
                if let Err(error) = run_note_command(&command, session).await {
                    println!("Error: {error}");
                }
                ToRepl::Continue
            }
            ReplCmd::Exit => ToRepl::Exit,
        };
        reply.send(next).ok();
    }
    Ok(())
}

/// Reply to the repl after a command completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToRepl {
    /// Continue execution by reading the next command
    Continue,
    /// Exit the repl
    Exit,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
pub enum ReplCmd {
    #[command(flatten)]
    Note(NoteCommand),
    /// Quit the nete repl
    #[command(alias = "quit")]
    Exit,
}

type ReplMessage = (ReplCmd, oneshot::Sender<ToRepl>);

pub struct Repl {
    history_path: Option<PathBuf>,
    cmd_tx: mpsc::Sender<ReplMessage>,
}

impl Repl {
    pub fn spawn(history_path: Option<PathBuf>) -> mpsc::Receiver<ReplMessage> {
        let (cmd_tx, cmd_rx) = mpsc::channel(1);
        let repl = Self {
            history_path,
            cmd_tx,
        };
        std::thread::spawn(move || {
            if let Err(err) = repl.run() {
                println!("repl crashed: {err}");
            }
        });
        cmd_rx
    }

    fn run(self) -> Result<(), CliError> {
        let mut rl =
            DefaultEditor::with_config(Config::builder().auto_add_history(false).build())?;
        if let Some(path) = &self.history_path {
            rl.load_history(path).ok();
        }

        loop {
            let (to_repl_tx, to_repl_rx) = oneshot::channel();
            match rl.readline(PROMPT) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => {
                    rl.add_history_entry(line.as_str())?;
                    let Some(cmd) = parse_cmd::<ReplCmd>(&line) else {
                        continue;
                    };
                    self.send(cmd, to_repl_tx)?;
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                    self.send(ReplCmd::Exit, to_repl_tx)?;
                }
                Err(ReadlineError::WindowResized) => continue,
                Err(err) => return Err(err.into()),
            }

            match to_repl_rx.blocking_recv() {
                Ok(ToRepl::Continue) => continue,
                Ok(ToRepl::Exit) | Err(_) => break,
            }
        }

        if let Some(path) = &self.history_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            rl.save_history(path).ok();
        }
        Ok(())
    }

    fn send(&self, cmd: ReplCmd, reply: oneshot::Sender<ToRepl>) -> Result<(), CliError> {
        self.cmd_tx
            .blocking_send((cmd, reply))
            .map_err(|_| CliError::Repl("command loop has stopped".to_string()))
    }
}

fn history_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("nete").join("repl_history"))
}

pub fn try_parse_cmd<C: Subcommand>(s: &str) -> Result<C, CliError> {
    let args = shell_words::split(s).map_err(|error| CliError::Repl(error.to_string()))?;
    let cmd = clap::Command::new("repl");
    let cmd = C::augment_subcommands(cmd);
    let matches = cmd
        .multicall(true)
        .subcommand_required(true)
        .try_get_matches_from(args)
        .map_err(|error| CliError::Repl(error.render().to_string()))?;
    C::from_arg_matches(&matches).map_err(|error| CliError::Repl(error.to_string()))
}

fn parse_cmd<C: Subcommand>(s: &str) -> Option<C> {
    match try_parse_cmd::<C>(s) {
        Ok(cmd) => Some(cmd),
        Err(CliError::Repl(message)) => {
            println!("{message}");
            None
        }
        Err(err) => {
            println!("{err}");
            None
        }
    }
}
