use crate::types::{Channel, TaskStatus, UserCommon};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// TaskSource / TaskLink
// ---------------------------------------------------------------------------

/// Where a task came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskSource {
    /// Produced by evaluating a sequence.
    Automatic { sequence_id: String },
    /// Entered by a user.
    Manual,
}

impl TaskSource {
    pub fn is_manual(&self) -> bool {
        matches!(self, TaskSource::Manual)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLink {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub component_id: String,
    pub scheduled: DateTime<Utc>,
    pub channel: Channel,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<TaskSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<TaskLink>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Caller-supplied fields of a task; ids and timestamps are assigned on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub scheduled: DateTime<Utc>,
    pub channel: Channel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<TaskSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<TaskLink>,
}

impl NewTask {
    pub fn manual(scheduled: DateTime<Utc>, channel: Channel) -> Self {
        Self {
            scheduled,
            channel,
            status: None,
            assignee_id: None,
            source: Some(TaskSource::Manual),
            message: None,
            link: None,
        }
    }

    pub fn automatic(
        scheduled: DateTime<Utc>,
        channel: Channel,
        sequence_id: impl Into<String>,
    ) -> Self {
        Self {
            source: Some(TaskSource::Automatic {
                sequence_id: sequence_id.into(),
            }),
            ..Self::manual(scheduled, channel)
        }
    }

    pub fn into_task(self, component_id: &str, now: DateTime<Utc>) -> Task {
        Task {
            id: Uuid::new_v4().to_string(),
            component_id: component_id.to_string(),
            scheduled: self.scheduled,
            channel: self.channel,
            status: self.status.unwrap_or(TaskStatus::Pending),
            assignee_id: self.assignee_id,
            source: self.source,
            message: self.message,
            link: self.link,
            created: now,
            updated: now,
        }
    }
}

impl From<Task> for NewTask {
    fn from(task: Task) -> Self {
        Self {
            scheduled: task.scheduled,
            channel: task.channel,
            status: Some(task.status),
            assignee_id: task.assignee_id,
            source: task.source,
            message: task.message,
            link: task.link,
        }
    }
}

// ---------------------------------------------------------------------------
// TaskRef: the embedded back-reference kept on a Component
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRef {
    pub id: String,
    pub scheduled: DateTime<Utc>,
    pub channel: Channel,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<TaskSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    pub created: DateTime<Utc>,
}

impl From<&Task> for TaskRef {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            scheduled: task.scheduled,
            channel: task.channel,
            status: task.status,
            source: task.source.clone(),
            assignee_id: task.assignee_id.clone(),
            created: task.created,
        }
    }
}

impl TaskRef {
    /// Rebuild the last-known projection of the task from the embedded fields.
    pub fn to_task(&self, component_id: &str) -> Task {
        Task {
            id: self.id.clone(),
            component_id: component_id.to_string(),
            scheduled: self.scheduled,
            channel: self.channel,
            status: self.status,
            assignee_id: self.assignee_id.clone(),
            source: self.source.clone(),
            message: None,
            link: None,
            created: self.created,
            updated: self.created,
        }
    }
}

// ---------------------------------------------------------------------------
// TaskWithAssignee / TaskCriteria
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskWithAssignee {
    #[serde(flatten)]
    pub task: Task,
    pub assignee: Option<UserCommon>,
}

/// Search filter for the central task store. An empty list matches anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskCriteria {
    #[serde(default)]
    pub component_ids: Vec<String>,
    #[serde(default)]
    pub statuses: Vec<TaskStatus>,
    #[serde(default)]
    pub channels: Vec<Channel>,
}

impl TaskCriteria {
    pub fn for_component(component_id: impl Into<String>) -> Self {
        Self {
            component_ids: vec![component_id.into()],
            ..Self::default()
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        (self.component_ids.is_empty() || self.component_ids.contains(&task.component_id))
            && (self.statuses.is_empty() || self.statuses.contains(&task.status))
            && (self.channels.is_empty() || self.channels.contains(&task.channel))
    }
}
