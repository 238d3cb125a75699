//! Storage seams consumed by the engine.
//!
//! The engine only needs per-document reads and writes; query mechanics stay
//! behind these traits. Two implementations ship with the crate:
//! [`MemoryStore`] for tests and ephemeral servers, and [`RedbStore`] for a
//! single-file persistent deployment.

mod db;
mod memory;

pub use db::RedbStore;
pub use memory::MemoryStore;

use crate::account::Account;
use crate::component::Component;
use crate::error::{EngineError, Entity, Result};
use crate::sequence::{Sequence, SequenceStep};
use crate::task::{Task, TaskCriteria};
use crate::types::Personality;

/// Component, account and central task storage.
pub trait Store: Send + Sync {
    fn find_component(&self, id: &str) -> Result<Option<Component>>;
    fn save_component(&self, component: &Component) -> Result<Component>;
    fn find_account_owning_component(&self, component_id: &str) -> Result<Option<Account>>;
    fn put_account(&self, account: &Account) -> Result<()>;

    fn insert_task(&self, task: &Task) -> Result<Task>;
    fn find_task(&self, id: &str) -> Result<Option<Task>>;
    fn find_tasks_by_ids(&self, ids: &[String]) -> Result<Vec<Task>>;
    fn delete_task(&self, id: &str) -> Result<Option<Task>>;
    /// Returns the number of tasks actually removed.
    fn delete_tasks(&self, ids: &[String]) -> Result<usize>;
    /// Matching tasks ordered by scheduled instant, then id.
    fn find_tasks(&self, criteria: &TaskCriteria) -> Result<Vec<Task>>;
}

/// Read access to sequence templates.
pub trait SequenceProvider: Send + Sync {
    fn find_sequence(&self, id: &str) -> Result<Option<Sequence>>;
    fn put_sequence(&self, sequence: &Sequence) -> Result<()>;

    fn steps_by_personality(
        &self,
        sequence_id: &str,
        personality: Personality,
    ) -> Result<Vec<SequenceStep>> {
        let sequence = self
            .find_sequence(sequence_id)?
            .ok_or_else(|| EngineError::not_found(Entity::Sequence, sequence_id))?;
        Ok(sequence.steps_for(personality))
    }
}

pub(crate) fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| a.scheduled.cmp(&b.scheduled).then_with(|| a.id.cmp(&b.id)));
}
