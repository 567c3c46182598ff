use anyhow::Result;
use clap::Parser;
use ticktask::{cli, commands, config::Config};

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let default_command = cli::Command::Tui { view: None };
    let command = args.command.as_ref().unwrap_or(&default_command);

    let log_file = match command {
        cli::Command::Tui { .. } => {
            Some(commands::current_location()?.dir.join("ticktask.log"))
        }
        _ => None,
    };
    cli::init_tracing(args.verbose, log_file.as_deref())?;

    let config = Config::load(args.config.as_deref())?.apply(&args.overrides());
    match command {
        cli::Command::Init => commands::init(),
        cli::Command::List => commands::list(),
        cli::Command::Add { text } => commands::add(text.clone()),
        cli::Command::Done { id } => commands::done(id.clone()),
        cli::Command::Edit { id, text } => commands::edit(id.clone(), text.clone()),
        cli::Command::Rm { id, yes } => commands::remove(id.clone(), *yes),
        cli::Command::Timer => commands::timer(&config),
        cli::Command::Tui { .. } => commands::tui(&config),
    }
}
