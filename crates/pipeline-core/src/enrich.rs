//! Read-side join of assignees onto tasks.

use std::collections::HashMap;

use crate::account::Account;
use crate::component::Component;
use crate::task::{Task, TaskWithAssignee};
use crate::types::UserCommon;

/// Pre-fetched set of people a task on one component can be assigned to.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    by_id: HashMap<String, UserCommon>,
}

impl Roster {
    pub fn new(users: impl IntoIterator<Item = UserCommon>) -> Self {
        Self {
            by_id: users.into_iter().map(|u| (u.id.clone(), u)).collect(),
        }
    }

    /// Account members plus the component itself.
    pub fn for_component(account: Option<&Account>, component: &Component) -> Self {
        let members = account.map(Account::roster).unwrap_or_default();
        Self::new(members.into_iter().chain(std::iter::once(component.to_common())))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn lookup(&self, id: &str) -> Option<&UserCommon> {
        self.by_id.get(id)
    }

    /// Unknown or missing assignees leave the task unassigned.
    pub fn decorate(&self, task: Task) -> TaskWithAssignee {
        let assignee = task
            .assignee_id
            .as_deref()
            .and_then(|id| self.lookup(id))
            .cloned();
        TaskWithAssignee { task, assignee }
    }

    pub fn decorate_all(&self, tasks: impl IntoIterator<Item = Task>) -> Vec<TaskWithAssignee> {
        tasks.into_iter().map(|t| self.decorate(t)).collect()
    }
}
