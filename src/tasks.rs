use crate::model::{unique_id, Task, TaskError, TaskId};
use crate::storage::KeyValueStore;
use anyhow::{Context, Result};
use tracing::{debug, info, warn};

pub const TASKS_KEY: &str = "tasks_v1";
pub const EMPTY_PLACEHOLDER: &str = "No tasks yet.";

/// Synchronous user prompts used to gate edits and deletions.
pub trait Prompt {
    /// Returns the replacement text, or `None` when the user cancels.
    fn ask_text(&mut self, message: &str, default: &str) -> Option<String>;
    fn confirm(&mut self, message: &str) -> bool;
}

/// An answer collected ahead of time, e.g. from a TUI modal.
#[derive(Debug, Clone, Default)]
pub struct Reply {
    pub text: Option<String>,
    pub confirmed: bool,
}

impl Reply {
    pub fn text(value: impl Into<String>) -> Self {
        Reply {
            text: Some(value.into()),
            confirmed: true,
        }
    }

    pub fn yes() -> Self {
        Reply {
            text: None,
            confirmed: true,
        }
    }

    pub fn cancel() -> Self {
        Reply::default()
    }
}

impl Prompt for Reply {
    fn ask_text(&mut self, _message: &str, _default: &str) -> Option<String> {
        self.text.take()
    }

    fn confirm(&mut self, _message: &str) -> bool {
        self.confirmed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub id: TaskId,
    pub checked: bool,
    pub text: String,
}

impl TaskRow {
    pub fn checkbox(&self) -> &'static str {
        if self.checked {
            "[x]"
        } else {
            "[ ]"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskListView {
    Placeholder(&'static str),
    Rows(Vec<TaskRow>),
}

impl TaskListView {
    pub fn rows(&self) -> &[TaskRow] {
        match self {
            TaskListView::Placeholder(_) => &[],
            TaskListView::Rows(rows) => rows,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskCounts {
    pub total: usize,
    pub done: usize,
}

/// Ordered newest-first task list persisted to a single slot.
pub struct TaskStore<S: KeyValueStore> {
    store: S,
    tasks: Vec<Task>,
    view: TaskListView,
}

impl<S: KeyValueStore> TaskStore<S> {
    pub fn open(store: S) -> Self {
        let tasks = load(&store);
        let mut task_store = TaskStore {
            store,
            tasks,
            view: TaskListView::Placeholder(EMPTY_PLACEHOLDER),
        };
        task_store.render();
        task_store
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn view(&self) -> &TaskListView {
        &self.view
    }

    pub fn counts(&self) -> TaskCounts {
        TaskCounts {
            total: self.tasks.len(),
            done: self.tasks.iter().filter(|t| t.done).count(),
        }
    }

    pub fn backend(&self) -> &S {
        &self.store
    }

    /// Returns `None` when the trimmed text is empty.
    #[tracing::instrument(skip(self, text))]
    pub fn add(&mut self, text: &str) -> Result<Option<TaskId>> {
        let text = text.trim();
        if text.is_empty() {
            debug!("ignoring empty task");
            return Ok(None);
        }
        let id = unique_id(&self.tasks);
        let mut next = self.tasks.clone();
        next.insert(0, Task::new(id.clone(), text));
        self.commit(next)?;
        info!(id = %id, "added task");
        Ok(Some(id))
    }

    #[tracing::instrument(skip(self))]
    pub fn toggle_done(&mut self, id: &str) -> Result<bool> {
        let idx = self.position(id)?;
        let mut next = self.tasks.clone();
        next[idx].done = !next[idx].done;
        let done = next[idx].done;
        self.commit(next)?;
        Ok(done)
    }

    /// Returns whether the text was replaced.
    #[tracing::instrument(skip(self, prompt))]
    pub fn edit(&mut self, id: &str, prompt: &mut dyn Prompt) -> Result<bool> {
        let idx = self.position(id)?;
        let Some(value) = prompt.ask_text("Edit task", &self.tasks[idx].text) else {
            debug!("edit cancelled");
            return Ok(false);
        };
        let mut next = self.tasks.clone();
        next[idx].text = value.trim().to_string();
        self.commit(next)?;
        info!("edited task");
        Ok(true)
    }

    /// Returns whether the task was removed.
    #[tracing::instrument(skip(self, prompt))]
    pub fn remove(&mut self, id: &str, prompt: &mut dyn Prompt) -> Result<bool> {
        let idx = self.position(id)?;
        if !prompt.confirm("Delete task?") {
            debug!("delete declined");
            return Ok(false);
        }
        let mut next = self.tasks.clone();
        next.remove(idx);
        self.commit(next)?;
        info!("removed task");
        Ok(true)
    }

    pub fn render(&mut self) {
        self.view = if self.tasks.is_empty() {
            TaskListView::Placeholder(EMPTY_PLACEHOLDER)
        } else {
            TaskListView::Rows(
                self.tasks
                    .iter()
                    .map(|t| TaskRow {
                        id: t.id.clone(),
                        checked: t.done,
                        text: t.text.clone(),
                    })
                    .collect(),
            )
        };
    }

    pub fn persist(&mut self) -> Result<()> {
        save(&mut self.store, &self.tasks)
    }

    /// Writes `next` and only then adopts it, so a failed save leaves the list untouched.
    fn commit(&mut self, next: Vec<Task>) -> Result<()> {
        save(&mut self.store, &next)?;
        self.tasks = next;
        self.render();
        Ok(())
    }

    fn position(&self, id: &str) -> Result<usize, TaskError> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))
    }
}

fn save(store: &mut dyn KeyValueStore, tasks: &[Task]) -> Result<()> {
    let serialized = serde_yaml::to_string(tasks).context("serializing tasks")?;
    store.set(TASKS_KEY, &serialized).context("saving tasks")?;
    debug!(count = tasks.len(), "persisted tasks");
    Ok(())
}

/// Reads the task slot. Absent, unreadable, or unparsable data yields an empty list.
pub fn load(store: &dyn KeyValueStore) -> Vec<Task> {
    let raw = match store.get(TASKS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(err) => {
            warn!(error = %err, "could not read tasks, starting empty");
            return Vec::new();
        }
    };
    if raw.trim().is_empty() {
        return Vec::new();
    }
    let mut tasks: Vec<Task> = match serde_yaml::from_str(&raw) {
        Ok(tasks) => tasks,
        Err(err) => {
            warn!(error = %err, "could not parse tasks, starting empty");
            return Vec::new();
        }
    };
    dedupe_ids(&mut tasks);
    tasks
}

fn dedupe_ids(tasks: &mut [Task]) {
    for idx in 0..tasks.len() {
        let (before, rest) = tasks.split_at_mut(idx);
        if before.iter().any(|t| t.id == rest[0].id) {
            let id = unique_id(before.iter().chain(rest.iter()));
            rest[0].id = id;
        }
    }
}
