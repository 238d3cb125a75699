use crate::task::{Task, TaskRef};
use crate::types::{Personality, UserCommon, UserKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Prospect,
    Lead,
}

/// A sales target (prospect or lead) and its embedded task back-references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub kind: ComponentKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<Personality>,
    /// URL of the existing conversation thread on the threaded channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_url: Option<String>,
    #[serde(default)]
    pub tasks: Vec<TaskRef>,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated: DateTime<Utc>,
}

impl Component {
    pub fn new(id: impl Into<String>, kind: ComponentKind, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            personality: None,
            thread_url: None,
            tasks: Vec::new(),
            created: now,
            updated: now,
        }
    }

    pub fn find_task_ref(&self, task_id: &str) -> Option<&TaskRef> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    /// Remove and return the back-reference for `task_id`, with its index.
    pub fn take_task_ref(&mut self, task_id: &str) -> Option<(usize, TaskRef)> {
        let idx = self.tasks.iter().position(|t| t.id == task_id)?;
        Some((idx, self.tasks.remove(idx)))
    }

    pub fn append_tasks<'a>(&mut self, tasks: impl IntoIterator<Item = &'a Task>) {
        self.tasks.extend(tasks.into_iter().map(TaskRef::from));
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated = now;
    }

    /// The component itself as an assignee, for tasks the target has to act on.
    pub fn to_common(&self) -> UserCommon {
        UserCommon {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: UserKind::Component,
        }
    }
}
