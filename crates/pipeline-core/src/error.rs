use std::fmt;
use thiserror::Error;

/// Entity kinds that can be referenced by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Component,
    Account,
    Sequence,
    Task,
}

impl Entity {
    pub fn as_str(self) -> &'static str {
        match self {
            Entity::Component => "component",
            Entity::Account => "account",
            Entity::Sequence => "sequence",
            Entity::Task => "task",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: String },

    #[error("task {task_id} not found on component {component_id}")]
    TaskNotOnComponent {
        component_id: String,
        task_id: String,
    },

    #[error("component {component_id} has no personality assigned; cannot evaluate sequence {sequence_id}")]
    PersonalityNotAssigned {
        sequence_id: String,
        component_id: String,
    },

    #[error("assignee {assignee_id} is not a member of account {account_id}")]
    AssigneeNotFound {
        account_id: String,
        assignee_id: String,
    },

    #[error("no eligible assignee in account {account_id}")]
    NoAssigneeFound { account_id: String },

    #[error("slot {scheduled} is already scheduled on component {component_id}")]
    SlotAlreadyScheduled {
        component_id: String,
        scheduled: String,
    },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub fn not_found(entity: Entity, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }

    /// True for both the plain and the component-scoped not-found kinds.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngineError::NotFound { .. } | EngineError::TaskNotOnComponent { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
