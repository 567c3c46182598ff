use crate::config::Overrides;
use crate::router::View;
use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "ticktask",
    version,
    about = "Terminal task list and millisecond countdown timer"
)]
pub struct Cli {
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to a config file (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Timer duration in minutes
    #[arg(long, global = true)]
    pub minutes: Option<u64>,

    /// Disable the completion chime
    #[arg(long, global = true)]
    pub no_sound: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        let view = match &self.command {
            Some(Command::Tui { view }) => *view,
            _ => None,
        };
        Overrides {
            minutes: self.minutes,
            no_sound: self.no_sound,
            view,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a project task store in the current directory
    Init,
    /// List tasks, newest first
    List,
    /// Add a new task
    Add {
        /// Task text
        text: String,
    },
    /// Toggle a task's done flag
    Done {
        /// Task id
        id: String,
    },
    /// Replace a task's text
    Edit {
        /// Task id
        id: String,
        /// New text (prompted for when omitted)
        text: Option<String>,
    },
    /// Delete a task
    Rm {
        /// Task id
        id: String,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Run the countdown in the terminal without the TUI
    Timer,
    /// Launch the interactive TUI
    Tui {
        /// Panel to show first
        #[arg(long, value_enum)]
        view: Option<View>,
    },
}

/// Installs the global subscriber. Logs go to `log_file` when given, otherwise stderr.
pub fn init_tracing(verbose: u8, log_file: Option<&Path>) -> Result<()> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true);

    let init_result = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {:?}", parent))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {:?}", path))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder
            .with_ansi(std::io::stderr().is_terminal())
            .with_writer(std::io::stderr)
            .try_init(),
    };

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_tui() {
        let cli = Cli::parse_from(["ticktask"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn parses_rm_with_yes() {
        let cli = Cli::parse_from(["ticktask", "rm", "abc123", "--yes"]);
        match cli.command {
            Some(Command::Rm { id, yes }) => {
                assert_eq!(id, "abc123");
                assert!(yes);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn tui_view_feeds_overrides() {
        let cli = Cli::parse_from(["ticktask", "--minutes", "5", "tui", "--view", "timer"]);
        let overrides = cli.overrides();
        assert_eq!(overrides.minutes, Some(5));
        assert_eq!(overrides.view, Some(View::Timer));
    }
}
