use crate::chime::chime_for;
use crate::config::Config;
use crate::model::Task;
use crate::storage::{init_project_store, locate_store, FileStore, StoreLocation};
use crate::tasks::{Prompt, TaskStore};
use crate::timer::{Countdown, SystemClock, TimerState};
use crate::ui;
use anyhow::Result;
use std::env;
use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;

const FRAME: Duration = Duration::from_millis(16);

/// Reads answers from stdin. EOF or an I/O error counts as cancel / no.
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn ask_text(&mut self, message: &str, default: &str) -> Option<String> {
        print!("{} [{}]: ", message, default);
        io::stdout().flush().ok()?;
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                let answer = line.trim_end_matches(['\r', '\n']);
                if answer.is_empty() {
                    Some(default.to_string())
                } else {
                    Some(answer.to_string())
                }
            }
        }
    }

    fn confirm(&mut self, message: &str) -> bool {
        print!("{} [y/N]: ", message);
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(_) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

/// Answers yes to every confirmation and keeps the current text.
pub struct AssumeYes;

impl Prompt for AssumeYes {
    fn ask_text(&mut self, _message: &str, default: &str) -> Option<String> {
        Some(default.to_string())
    }

    fn confirm(&mut self, _message: &str) -> bool {
        true
    }
}

pub fn init() -> Result<()> {
    let location = init_project_store()?;
    println!("Initialized task store at {}", location.dir.display());
    Ok(())
}

pub fn list() -> Result<()> {
    let (store, location) = open_current_store()?;
    println!("Tasks ({})", location.scope.label());
    if store.tasks().is_empty() {
        println!("  {}", crate::tasks::EMPTY_PLACEHOLDER);
    }
    for task in store.tasks() {
        print_task(task);
    }
    Ok(())
}

pub fn add(text: String) -> Result<()> {
    let (mut store, _) = open_current_store()?;
    match store.add(&text)? {
        Some(id) => println!("Added task {}", id),
        None => println!("Nothing to add"),
    }
    Ok(())
}

pub fn done(id: String) -> Result<()> {
    let (mut store, _) = open_current_store()?;
    let done = store.toggle_done(&id)?;
    println!(
        "Marked {} as {}",
        id,
        if done { "done" } else { "not done" }
    );
    Ok(())
}

pub fn edit(id: String, text: Option<String>) -> Result<()> {
    let (mut store, _) = open_current_store()?;
    let changed = match text {
        Some(text) => store.edit(&id, &mut crate::tasks::Reply::text(text))?,
        None => store.edit(&id, &mut StdinPrompt)?,
    };
    if changed {
        println!("Updated task {}", id);
    } else {
        println!("Edit canceled");
    }
    Ok(())
}

pub fn remove(id: String, yes: bool) -> Result<()> {
    let (mut store, _) = open_current_store()?;
    let removed = if yes {
        store.remove(&id, &mut AssumeYes)?
    } else {
        store.remove(&id, &mut StdinPrompt)?
    };
    if removed {
        println!("Deleted task {}", id);
    } else {
        println!("Delete canceled");
    }
    Ok(())
}

pub fn timer(config: &Config) -> Result<()> {
    let mut countdown = Countdown::new(
        SystemClock,
        chime_for(config.chime),
        config.default_minutes,
    );
    countdown.start();
    let mut stdout = io::stdout();
    while countdown.wants_frame() {
        let state = countdown.on_frame();
        write!(stdout, "\r{}", countdown.display())?;
        stdout.flush()?;
        if state == TimerState::Expired {
            break;
        }
        thread::sleep(FRAME);
    }
    writeln!(stdout)?;
    if config.chime.enabled {
        // The chime plays on a detached thread that dies with the process.
        thread::sleep(Duration::from_millis(config.chime.duration_ms + 300));
    }
    Ok(())
}

pub fn tui(config: &Config) -> Result<()> {
    let (store, location) = open_current_store()?;
    ui::run(store, location, config)
}

pub fn current_location() -> Result<StoreLocation> {
    let cwd = env::current_dir()?;
    locate_store(&cwd)
}

fn open_current_store() -> Result<(TaskStore<FileStore>, StoreLocation)> {
    let location = current_location()?;
    let store = TaskStore::open(FileStore::open(&location));
    Ok((store, location))
}

fn print_task(task: &Task) {
    println!(
        "  {} {} {}  ({})",
        if task.done { "[x]" } else { "[ ]" },
        task.id,
        task.text,
        task.created.format("%Y-%m-%d %H:%M")
    );
}
