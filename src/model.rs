use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

pub type TaskId = String;

const ID_LEN: usize = 6;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Task {
    #[serde(default = "generate_id")]
    pub id: TaskId,
    pub text: String,
    #[serde(default)]
    pub done: bool,
    pub created: DateTime<Utc>,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(TaskId),
}

impl Task {
    pub fn new(id: TaskId, text: impl Into<String>) -> Self {
        Task {
            id,
            text: text.into(),
            done: false,
            created: Utc::now(),
        }
    }
}

pub fn generate_id() -> TaskId {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

/// Generates an id that does not collide with any of `taken`.
pub fn unique_id<'a, I>(taken: I) -> TaskId
where
    I: IntoIterator<Item = &'a Task> + Clone,
{
    loop {
        let id = generate_id();
        if !taken.clone().into_iter().any(|t| t.id == id) {
            return id;
        }
    }
}
