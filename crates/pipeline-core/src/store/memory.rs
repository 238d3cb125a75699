use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::{sort_tasks, SequenceProvider, Store};
use crate::account::Account;
use crate::component::Component;
use crate::error::Result;
use crate::sequence::Sequence;
use crate::task::{Task, TaskCriteria};

/// In-process store backed by hash maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    components: RwLock<HashMap<String, Component>>,
    accounts: RwLock<Vec<Account>>,
    tasks: RwLock<HashMap<String, Task>>,
    sequences: RwLock<HashMap<String, Sequence>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task_count(&self) -> usize {
        self.tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Store for MemoryStore {
    fn find_component(&self, id: &str) -> Result<Option<Component>> {
        let components = self.components.read().unwrap_or_else(PoisonError::into_inner);
        Ok(components.get(id).cloned())
    }

    fn save_component(&self, component: &Component) -> Result<Component> {
        let mut components = self
            .components
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        components.insert(component.id.clone(), component.clone());
        Ok(component.clone())
    }

    fn find_account_owning_component(&self, component_id: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);
        Ok(accounts.iter().find(|a| a.owns(component_id)).cloned())
    }

    fn put_account(&self, account: &Account) -> Result<()> {
        let mut accounts = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
        match accounts.iter_mut().find(|a| a.id == account.id) {
            Some(existing) => *existing = account.clone(),
            None => accounts.push(account.clone()),
        }
        Ok(())
    }

    fn insert_task(&self, task: &Task) -> Result<Task> {
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        tasks.insert(task.id.clone(), task.clone());
        Ok(task.clone())
    }

    fn find_task(&self, id: &str) -> Result<Option<Task>> {
        let tasks = self.tasks.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tasks.get(id).cloned())
    }

    fn find_tasks_by_ids(&self, ids: &[String]) -> Result<Vec<Task>> {
        let tasks = self.tasks.read().unwrap_or_else(PoisonError::into_inner);
        Ok(ids.iter().filter_map(|id| tasks.get(id).cloned()).collect())
    }

    fn delete_task(&self, id: &str) -> Result<Option<Task>> {
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        Ok(tasks.remove(id))
    }

    fn delete_tasks(&self, ids: &[String]) -> Result<usize> {
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        Ok(ids.iter().filter(|id| tasks.remove(id.as_str()).is_some()).count())
    }

    fn find_tasks(&self, criteria: &TaskCriteria) -> Result<Vec<Task>> {
        let tasks = self.tasks.read().unwrap_or_else(PoisonError::into_inner);
        let mut found: Vec<Task> = tasks
            .values()
            .filter(|t| criteria.matches(t))
            .cloned()
            .collect();
        sort_tasks(&mut found);
        Ok(found)
    }
}

impl SequenceProvider for MemoryStore {
    fn find_sequence(&self, id: &str) -> Result<Option<Sequence>> {
        let sequences = self.sequences.read().unwrap_or_else(PoisonError::into_inner);
        Ok(sequences.get(id).cloned())
    }

    fn put_sequence(&self, sequence: &Sequence) -> Result<()> {
        let mut sequences = self
            .sequences
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        sequences.insert(sequence.id.clone(), sequence.clone());
        Ok(())
    }
}
