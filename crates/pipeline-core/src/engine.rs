//! Task aggregate synchronizer.
//!
//! Every task lives twice: as a full record in the central task store and as a
//! [`TaskRef`] embedded in its component. `TaskEngine` is the only writer of
//! both, and keeps them in agreement:
//!
//! - all writes for one component run under that component's lock, so the
//!   slot guard and the write that follows it see the same embedded list;
//! - inserts go to the central store first; if the component save fails the
//!   inserted tasks are deleted again before the error is returned;
//! - removals save the component first; if the central delete fails the
//!   back-reference is restored.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::assign::resolve_assignee;
use crate::component::Component;
use crate::config::{BatchConflicts, EngineConfig};
use crate::conflict::check_conflict;
use crate::enrich::Roster;
use crate::error::{EngineError, Entity, Result};
use crate::evaluate::{default_start, evaluate};
use crate::locks::ComponentLocks;
use crate::paths::validate_id;
use crate::store::{SequenceProvider, Store};
use crate::task::{NewTask, Task, TaskCriteria, TaskRef, TaskWithAssignee};

pub struct TaskEngine {
    store: Arc<dyn Store>,
    sequences: Arc<dyn SequenceProvider>,
    config: EngineConfig,
    locks: ComponentLocks,
}

impl TaskEngine {
    pub fn new(
        store: Arc<dyn Store>,
        sequences: Arc<dyn SequenceProvider>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            sequences,
            config,
            locks: ComponentLocks::new(),
        }
    }

    /// Build an engine over a backend that serves both seams.
    pub fn with_backend<B>(backend: Arc<B>, config: EngineConfig) -> Self
    where
        B: Store + SequenceProvider + 'static,
    {
        Self::new(backend.clone(), backend, config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn sequences(&self) -> &dyn SequenceProvider {
        self.sequences.as_ref()
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    pub fn add_task(&self, component_id: &str, task: NewTask) -> Result<Task> {
        validate_id("component", component_id)?;
        let task = task.into_task(component_id, Utc::now());
        let mut inserted = self.insert_tasks(component_id, vec![task])?;
        inserted
            .pop()
            .ok_or_else(|| EngineError::Storage("insert returned no task".into()))
    }

    pub fn add_task_list(&self, component_id: &str, tasks: Vec<NewTask>) -> Result<Vec<Task>> {
        validate_id("component", component_id)?;
        if tasks.is_empty() {
            return Err(EngineError::validation("task list must not be empty"));
        }
        let now = Utc::now();
        let tasks = tasks
            .into_iter()
            .map(|t| t.into_task(component_id, now))
            .collect();
        self.insert_tasks(component_id, tasks)
    }

    pub fn remove_task(&self, component_id: &str, task_id: &str) -> Result<Task> {
        validate_id("component", component_id)?;
        validate_id("task", task_id)?;

        self.locks.with_lock(component_id, || -> Result<Task> {
            let mut component = self.load_component(component_id)?;
            let (idx, task_ref) =
                component
                    .take_task_ref(task_id)
                    .ok_or_else(|| EngineError::TaskNotOnComponent {
                        component_id: component_id.to_string(),
                        task_id: task_id.to_string(),
                    })?;
            component.touch(Utc::now());
            self.store.save_component(&component)?;

            match self.store.delete_task(task_id) {
                Ok(Some(task)) => {
                    tracing::info!(component_id, task_id, "removed task");
                    Ok(task)
                }
                Ok(None) => {
                    tracing::warn!(
                        component_id,
                        task_id,
                        "task missing from central store; returning embedded projection"
                    );
                    Ok(task_ref.to_task(component_id))
                }
                Err(e) => {
                    component.tasks.insert(idx, task_ref);
                    if let Err(restore) = self.store.save_component(&component) {
                        tracing::error!(component_id, task_id, error = %restore, "failed to restore back-reference");
                    } else {
                        tracing::warn!(component_id, task_id, "central delete failed; back-reference restored");
                    }
                    Err(e)
                }
            }
        })
    }

    /// Delete every task matching `criteria`, keeping embedded lists in step.
    /// Returns the number of tasks removed from the central store. Components
    /// are processed one at a time; a failure stops at that component with its
    /// back-references restored, leaving earlier components purged.
    pub fn remove_tasks_matching(&self, criteria: &TaskCriteria) -> Result<usize> {
        if criteria.component_ids.is_empty() {
            return Err(EngineError::validation(
                "criteria must name at least one component",
            ));
        }
        for id in &criteria.component_ids {
            validate_id("component", id)?;
        }

        let mut by_component: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for task in self.store.find_tasks(criteria)? {
            by_component
                .entry(task.component_id)
                .or_default()
                .push(task.id);
        }

        let mut removed = 0;
        for (component_id, ids) in by_component {
            removed += self.locks.with_lock(&component_id, || -> Result<usize> {
                let original = self.store.find_component(&component_id)?;
                if let Some(component) = &original {
                    let mut stripped = component.clone();
                    stripped.tasks.retain(|r| !ids.contains(&r.id));
                    stripped.touch(Utc::now());
                    self.store.save_component(&stripped)?;
                }
                match self.store.delete_tasks(&ids) {
                    Ok(n) => Ok(n),
                    Err(e) => {
                        if let Some(component) = &original {
                            match self.store.save_component(component) {
                                Ok(_) => tracing::warn!(
                                    component_id = %component_id,
                                    "central delete failed; back-references restored"
                                ),
                                Err(restore) => tracing::error!(
                                    component_id = %component_id,
                                    error = %restore,
                                    "failed to restore back-references"
                                ),
                            }
                        }
                        Err(e)
                    }
                }
            })?;
        }
        tracing::info!(removed, "removed tasks by criteria");
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn list_tasks(&self, component_id: &str) -> Result<Vec<TaskWithAssignee>> {
        validate_id("component", component_id)?;
        let component = self.load_component(component_id)?;
        if component.tasks.is_empty() {
            return Ok(Vec::new());
        }

        let roster = self.roster(&component)?;
        let ids: Vec<String> = component.tasks.iter().map(|r| r.id.clone()).collect();
        let mut central: HashMap<String, Task> = self
            .store
            .find_tasks_by_ids(&ids)?
            .into_iter()
            .map(|t| (t.id.clone(), t))
            .collect();

        let tasks = component
            .tasks
            .iter()
            .map(|r| match central.remove(&r.id) {
                Some(task) => task,
                None => {
                    tracing::warn!(component_id, task_id = %r.id, "embedded task missing from central store");
                    r.to_task(component_id)
                }
            })
            .collect::<Vec<_>>();
        tracing::debug!(component_id, count = tasks.len(), "listed tasks");
        Ok(roster.decorate_all(tasks))
    }

    pub fn get_task(&self, component_id: &str, task_id: &str) -> Result<TaskWithAssignee> {
        validate_id("component", component_id)?;
        validate_id("task", task_id)?;
        let component = self.load_component(component_id)?;
        let task_ref = component.find_task_ref(task_id).ok_or_else(|| {
            EngineError::TaskNotOnComponent {
                component_id: component_id.to_string(),
                task_id: task_id.to_string(),
            }
        })?;
        let task = match self.store.find_task(task_id)? {
            Some(task) => task,
            None => {
                tracing::warn!(component_id, task_id, "embedded task missing from central store");
                task_ref.to_task(component_id)
            }
        };
        Ok(self.roster(&component)?.decorate(task))
    }

    // -----------------------------------------------------------------------
    // Sequences
    // -----------------------------------------------------------------------

    /// Preview the tasks a sequence would create, starting tomorrow.
    pub fn eval_schedule(
        &self,
        component_id: &str,
        sequence_id: &str,
        assignee_id: Option<&str>,
    ) -> Result<Vec<TaskWithAssignee>> {
        let start = default_start(Utc::now(), &self.config.schedule)?;
        self.eval_schedule_from(component_id, sequence_id, assignee_id, start)
    }

    pub fn eval_schedule_from(
        &self,
        component_id: &str,
        sequence_id: &str,
        assignee_id: Option<&str>,
        start: DateTime<Utc>,
    ) -> Result<Vec<TaskWithAssignee>> {
        validate_id("component", component_id)?;
        validate_id("sequence", sequence_id)?;
        if let Some(id) = assignee_id {
            validate_id("assignee", id)?;
        }

        let component = self.load_component(component_id)?;
        let sequence = self
            .sequences
            .find_sequence(sequence_id)?
            .ok_or_else(|| EngineError::not_found(Entity::Sequence, sequence_id))?;
        let steps = evaluate(&sequence, &component, start, &self.config.links)?;
        let assignee = resolve_assignee(
            self.store.as_ref(),
            component_id,
            assignee_id,
            &self.config.assignment.role_precedence,
        )?;

        let now = Utc::now();
        Ok(steps
            .iter()
            .map(|step| TaskWithAssignee {
                task: step
                    .to_new_task(sequence_id, Some(&assignee.id))
                    .into_task(component_id, now),
                assignee: Some(assignee.clone()),
            })
            .collect())
    }

    /// Evaluate a sequence and persist the resulting tasks.
    pub fn commit_schedule(
        &self,
        component_id: &str,
        sequence_id: &str,
        assignee_id: Option<&str>,
    ) -> Result<Vec<TaskWithAssignee>> {
        let start = default_start(Utc::now(), &self.config.schedule)?;
        self.commit_schedule_from(component_id, sequence_id, assignee_id, start)
    }

    pub fn commit_schedule_from(
        &self,
        component_id: &str,
        sequence_id: &str,
        assignee_id: Option<&str>,
        start: DateTime<Utc>,
    ) -> Result<Vec<TaskWithAssignee>> {
        let preview = self.eval_schedule_from(component_id, sequence_id, assignee_id, start)?;
        if preview.is_empty() {
            return Ok(Vec::new());
        }
        let assignee = preview[0].assignee.clone();
        let tasks = preview.into_iter().map(|p| p.task).collect();
        let inserted = self.insert_tasks(component_id, tasks)?;
        Ok(inserted
            .into_iter()
            .map(|task| TaskWithAssignee {
                task,
                assignee: assignee.clone(),
            })
            .collect())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn load_component(&self, component_id: &str) -> Result<Component> {
        self.store
            .find_component(component_id)?
            .ok_or_else(|| EngineError::not_found(Entity::Component, component_id))
    }

    fn roster(&self, component: &Component) -> Result<Roster> {
        let account = self.store.find_account_owning_component(&component.id)?;
        if account.is_none() {
            tracing::warn!(component_id = %component.id, "component has no owning account");
        }
        Ok(Roster::for_component(account.as_ref(), component))
    }

    /// Guard, insert centrally, append back-references and save, as one unit.
    fn insert_tasks(&self, component_id: &str, tasks: Vec<Task>) -> Result<Vec<Task>> {
        self.locks.with_lock(component_id, || -> Result<Vec<Task>> {
            let mut component = self.load_component(component_id)?;

            let mut occupied: Vec<TaskRef> = component.tasks.clone();
            for task in &tasks {
                check_conflict(&occupied, task, component_id)?;
                if self.config.schedule.batch_conflicts == BatchConflicts::Cumulative {
                    occupied.push(TaskRef::from(task));
                }
            }

            let mut inserted = Vec::with_capacity(tasks.len());
            for task in &tasks {
                match self.store.insert_task(task) {
                    Ok(saved) => inserted.push(saved),
                    Err(e) => {
                        self.compensate(component_id, &inserted);
                        return Err(e);
                    }
                }
            }

            component.append_tasks(&inserted);
            component.touch(Utc::now());
            if let Err(e) = self.store.save_component(&component) {
                self.compensate(component_id, &inserted);
                return Err(e);
            }

            tracing::info!(component_id, count = inserted.len(), "added tasks");
            Ok(inserted)
        })
    }

    fn compensate(&self, component_id: &str, inserted: &[Task]) {
        if inserted.is_empty() {
            return;
        }
        let ids: Vec<String> = inserted.iter().map(|t| t.id.clone()).collect();
        match self.store.delete_tasks(&ids) {
            Ok(n) => tracing::warn!(component_id, deleted = n, "rolled back task inserts"),
            Err(e) => {
                tracing::error!(component_id, error = %e, "failed to roll back task inserts")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{Account, AccountUser};
    use crate::component::ComponentKind;
    use crate::sequence::{Sequence, SequenceStep};
    use crate::store::MemoryStore;
    use crate::types::{Channel, Personality, Role, TaskStatus};
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;

    fn slot(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 9, 0, 0).unwrap()
    }

    fn seeded() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let mut acc = Account::new("acc-1", "Acme");
        acc.users = vec![
            AccountUser::new("client", "Cleo", vec![Role::Client]),
            AccountUser::new("assistant", "Ada", vec![Role::Assistant]),
        ];
        acc.component_ids = vec!["c1".into(), "c2".into()];
        store.put_account(&acc).unwrap();

        for id in ["c1", "c2"] {
            let mut c = Component::new(id, ComponentKind::Prospect, "Pat");
            c.personality = Some(Personality(1));
            store.save_component(&c).unwrap();
        }

        let mut seq = Sequence::new("seq-1", "Intro");
        seq.steps = vec![
            SequenceStep::new("s0", 0, Channel::Linkedin, 0),
            SequenceStep::new("s1", 1, Channel::Email, 3),
            SequenceStep::new("s2", 2, Channel::Linkedin, 2),
        ];
        store.put_sequence(&seq).unwrap();
        store
    }

    fn engine(store: &Arc<MemoryStore>) -> TaskEngine {
        TaskEngine::with_backend(store.clone(), EngineConfig::default())
    }

    #[test]
    fn add_task_writes_both_sides() {
        let store = seeded();
        let engine = engine(&store);
        let task = engine
            .add_task("c1", NewTask::manual(slot(2), Channel::Email))
            .unwrap();

        assert!(store.find_task(&task.id).unwrap().is_some());
        let c = store.find_component("c1").unwrap().unwrap();
        assert!(c.find_task_ref(&task.id).is_some());
    }

    #[test]
    fn add_task_to_missing_component_is_not_found() {
        let store = seeded();
        let err = engine(&store)
            .add_task("ghost", NewTask::manual(slot(2), Channel::Email))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::NotFound {
                entity: Entity::Component,
                ..
            }
        ));
        assert_eq!(store.task_count(), 0);
    }

    #[test]
    fn add_task_stamps_component_updated() {
        let store = seeded();
        let before = store.find_component("c1").unwrap().unwrap().updated;
        engine(&store)
            .add_task("c1", NewTask::manual(slot(2), Channel::Email))
            .unwrap();
        let after = store.find_component("c1").unwrap().unwrap().updated;
        assert!(after >= before);
    }

    #[test]
    fn second_automatic_task_in_same_slot_is_rejected() {
        let store = seeded();
        let engine = engine(&store);
        engine
            .add_task("c1", NewTask::automatic(slot(2), Channel::Email, "seq-1"))
            .unwrap();
        let err = engine
            .add_task("c1", NewTask::automatic(slot(2), Channel::Call, "seq-1"))
            .unwrap_err();
        assert!(matches!(err, EngineError::SlotAlreadyScheduled { .. }));
        assert_eq!(store.task_count(), 1);

        // The same instant on another component is a different slot.
        engine
            .add_task("c2", NewTask::automatic(slot(2), Channel::Call, "seq-1"))
            .unwrap();
    }

    #[test]
    fn manual_task_may_take_an_automatic_slot() {
        let store = seeded();
        let engine = engine(&store);
        engine
            .add_task("c1", NewTask::automatic(slot(2), Channel::Email, "seq-1"))
            .unwrap();
        engine
            .add_task("c1", NewTask::manual(slot(2), Channel::Call))
            .unwrap();
        assert_eq!(engine.list_tasks("c1").unwrap().len(), 2);
    }

    #[test]
    fn batch_checks_against_pre_existing_only_by_default() {
        let store = seeded();
        let engine = engine(&store);
        let batch = vec![
            NewTask::automatic(slot(4), Channel::Email, "seq-1"),
            NewTask::automatic(slot(4), Channel::Call, "seq-1"),
        ];
        // Both land: siblings in one batch are not checked against each other.
        let added = engine.add_task_list("c1", batch).unwrap();
        assert_eq!(added.len(), 2);
    }

    #[test]
    fn cumulative_batch_mode_rejects_sibling_collisions() {
        let store = seeded();
        let mut config = EngineConfig::default();
        config.schedule.batch_conflicts = BatchConflicts::Cumulative;
        let engine = TaskEngine::with_backend(store.clone(), config);
        let batch = vec![
            NewTask::automatic(slot(4), Channel::Email, "seq-1"),
            NewTask::automatic(slot(4), Channel::Call, "seq-1"),
        ];
        let err = engine.add_task_list("c1", batch).unwrap_err();
        assert!(matches!(err, EngineError::SlotAlreadyScheduled { .. }));
        assert_eq!(store.task_count(), 0);
        assert!(store.find_component("c1").unwrap().unwrap().tasks.is_empty());
    }

    #[test]
    fn batch_guard_failure_writes_nothing() {
        let store = seeded();
        let engine = engine(&store);
        engine
            .add_task("c1", NewTask::manual(slot(3), Channel::Email))
            .unwrap();
        let batch = vec![
            NewTask::automatic(slot(5), Channel::Email, "seq-1"),
            NewTask::automatic(slot(3), Channel::Email, "seq-1"),
        ];
        assert!(engine.add_task_list("c1", batch).is_err());
        assert_eq!(store.task_count(), 1);
        assert_eq!(store.find_component("c1").unwrap().unwrap().tasks.len(), 1);
    }

    #[test]
    fn empty_batch_is_a_validation_error() {
        let store = seeded();
        let err = engine(&store).add_task_list("c1", Vec::new()).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn remove_task_clears_both_sides() {
        let store = seeded();
        let engine = engine(&store);
        let task = engine
            .add_task("c1", NewTask::manual(slot(2), Channel::Email))
            .unwrap();

        let removed = engine.remove_task("c1", &task.id).unwrap();
        assert_eq!(removed.id, task.id);
        assert!(store.find_task(&task.id).unwrap().is_none());
        let c = store.find_component("c1").unwrap().unwrap();
        assert!(c.find_task_ref(&task.id).is_none());
    }

    #[test]
    fn remove_task_distinguishes_missing_component_and_missing_task() {
        let store = seeded();
        let engine = engine(&store);
        let err = engine.remove_task("ghost", "t1").unwrap_err();
        assert!(matches!(
            err,
            EngineError::NotFound {
                entity: Entity::Component,
                ..
            }
        ));
        let err = engine.remove_task("c1", "t1").unwrap_err();
        match err {
            EngineError::TaskNotOnComponent {
                component_id,
                task_id,
            } => {
                assert_eq!(component_id, "c1");
                assert_eq!(task_id, "t1");
            }
            other => panic!("expected TaskNotOnComponent, got {other:?}"),
        }
    }

    #[test]
    fn task_on_other_component_is_not_found() {
        let store = seeded();
        let engine = engine(&store);
        let task = engine
            .add_task("c1", NewTask::manual(slot(2), Channel::Email))
            .unwrap();
        assert!(engine.get_task("c2", &task.id).unwrap_err().is_not_found());
        assert!(engine.remove_task("c2", &task.id).unwrap_err().is_not_found());
        assert!(store.find_task(&task.id).unwrap().is_some());
    }

    #[test]
    fn list_tasks_enriches_assignees_and_keeps_order() {
        let store = seeded();
        let engine = engine(&store);
        let mut first = NewTask::manual(slot(5), Channel::Email);
        first.assignee_id = Some("assistant".into());
        let mut second = NewTask::manual(slot(2), Channel::Call);
        second.assignee_id = Some("departed".into());
        let a = engine.add_task("c1", first).unwrap();
        let b = engine.add_task("c1", second).unwrap();

        let listed = engine.list_tasks("c1").unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].task.id, a.id);
        assert_eq!(listed[0].assignee.as_ref().unwrap().name, "Ada");
        assert_eq!(listed[1].task.id, b.id);
        assert!(listed[1].assignee.is_none());
    }

    #[test]
    fn list_tasks_on_empty_component_is_empty() {
        let store = seeded();
        assert!(engine(&store).list_tasks("c2").unwrap().is_empty());
    }

    #[test]
    fn get_task_returns_enriched_task() {
        let store = seeded();
        let engine = engine(&store);
        let mut new = NewTask::manual(slot(2), Channel::Email);
        new.assignee_id = Some("client".into());
        let task = engine.add_task("c1", new).unwrap();

        let got = engine.get_task("c1", &task.id).unwrap();
        assert_eq!(got.task, task);
        assert_eq!(got.assignee.unwrap().id, "client");
    }

    #[test]
    fn eval_schedule_previews_without_persisting() {
        let store = seeded();
        let engine = engine(&store);
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap();
        let preview = engine
            .eval_schedule_from("c1", "seq-1", None, start)
            .unwrap();

        let dates: Vec<String> = preview
            .iter()
            .map(|p| p.task.scheduled.format("%Y-%m-%d").to_string())
            .collect();
        assert_eq!(dates, vec!["2024-01-02", "2024-01-05", "2024-01-07"]);
        assert!(preview
            .iter()
            .all(|p| p.assignee.as_ref().unwrap().id == "assistant"));
        assert!(preview
            .iter()
            .all(|p| p.task.status == TaskStatus::Scheduled));
        assert_eq!(store.task_count(), 0);
    }

    #[test]
    fn eval_schedule_requires_personality() {
        let store = seeded();
        let mut c = store.find_component("c2").unwrap().unwrap();
        c.personality = None;
        store.save_component(&c).unwrap();

        let err = engine(&store).eval_schedule("c2", "seq-1", None).unwrap_err();
        assert!(matches!(err, EngineError::PersonalityNotAssigned { .. }));
    }

    #[test]
    fn eval_schedule_unknown_sequence_is_not_found() {
        let store = seeded();
        let err = engine(&store).eval_schedule("c1", "nope", None).unwrap_err();
        assert!(matches!(
            err,
            EngineError::NotFound {
                entity: Entity::Sequence,
                ..
            }
        ));
    }

    #[test]
    fn blank_explicit_assignee_is_rejected_before_lookups() {
        let store = seeded();
        let engine = engine(&store);
        for component in ["ghost", "c2"] {
            let err = engine
                .eval_schedule_from(component, "seq-1", Some(""), slot(2))
                .unwrap_err();
            assert!(matches!(err, EngineError::Validation(_)), "{component}: {err:?}");
        }
    }

    #[test]
    fn out_of_range_schedule_is_a_validation_error() {
        let store = seeded();
        let mut seq = Sequence::new("huge", "Glacial");
        seq.steps = vec![SequenceStep::new("s0", 0, Channel::Email, 200_000_000)];
        store.put_sequence(&seq).unwrap();

        let err = engine(&store)
            .eval_schedule_from("c1", "huge", None, slot(2))
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn commit_then_list_round_trips() {
        let store = seeded();
        let engine = engine(&store);
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap();
        let preview = engine
            .eval_schedule_from("c1", "seq-1", None, start)
            .unwrap();
        let committed = engine
            .commit_schedule_from("c1", "seq-1", None, start)
            .unwrap();
        let listed = engine.list_tasks("c1").unwrap();

        assert_eq!(committed.len(), preview.len());
        assert_eq!(listed.len(), preview.len());
        for (p, l) in preview.iter().zip(&listed) {
            assert_eq!(p.task.scheduled, l.task.scheduled);
            assert_eq!(p.task.channel, l.task.channel);
            assert_eq!(p.task.source, l.task.source);
            assert_eq!(p.assignee, l.assignee);
        }
        for (c, l) in committed.iter().zip(&listed) {
            assert_eq!(c, l);
        }
    }

    #[test]
    fn committing_the_same_sequence_twice_hits_the_guard() {
        let store = seeded();
        let engine = engine(&store);
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap();
        engine
            .commit_schedule_from("c1", "seq-1", None, start)
            .unwrap();
        let err = engine
            .commit_schedule_from("c1", "seq-1", None, start)
            .unwrap_err();
        assert!(matches!(err, EngineError::SlotAlreadyScheduled { .. }));
        assert_eq!(store.task_count(), 3);
    }

    #[test]
    fn commit_with_explicit_assignee_outside_account_fails() {
        let store = seeded();
        let err = engine(&store)
            .commit_schedule("c1", "seq-1", Some("stranger"))
            .unwrap_err();
        assert!(matches!(err, EngineError::AssigneeNotFound { .. }));
        assert_eq!(store.task_count(), 0);
    }

    #[test]
    fn remove_tasks_matching_strips_back_references() {
        let store = seeded();
        let engine = engine(&store);
        let keep = engine
            .add_task("c1", NewTask::manual(slot(2), Channel::Call))
            .unwrap();
        engine
            .add_task("c1", NewTask::manual(slot(3), Channel::Email))
            .unwrap();
        engine
            .add_task("c2", NewTask::manual(slot(3), Channel::Email))
            .unwrap();

        let criteria = TaskCriteria {
            component_ids: vec!["c1".into(), "c2".into()],
            channels: vec![Channel::Email],
            ..TaskCriteria::default()
        };
        assert_eq!(engine.remove_tasks_matching(&criteria).unwrap(), 2);

        let c1 = store.find_component("c1").unwrap().unwrap();
        assert_eq!(c1.tasks.len(), 1);
        assert_eq!(c1.tasks[0].id, keep.id);
        assert!(store.find_component("c2").unwrap().unwrap().tasks.is_empty());
        assert_eq!(store.task_count(), 1);
    }

    #[test]
    fn remove_tasks_matching_requires_components() {
        let store = seeded();
        let err = engine(&store)
            .remove_tasks_matching(&TaskCriteria::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn lock_registry_does_not_retain_released_components() {
        let store = seeded();
        let engine = engine(&store);
        for i in 0..100 {
            let err = engine
                .add_task(&format!("ghost-{i}"), NewTask::manual(slot(2), Channel::Email))
                .unwrap_err();
            assert!(err.is_not_found());
        }
        engine
            .add_task("c1", NewTask::manual(slot(2), Channel::Email))
            .unwrap();
        assert!(engine.locks.is_empty());
    }

    #[test]
    fn concurrent_adds_to_one_slot_admit_exactly_one() {
        let store = seeded();
        let engine = Arc::new(engine(&store));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    engine.add_task("c1", NewTask::automatic(slot(9), Channel::Email, "seq-1"))
                })
            })
            .collect();
        let ok = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(Result::is_ok)
            .count();
        assert_eq!(ok, 1);
        assert_eq!(store.task_count(), 1);
        assert_eq!(store.find_component("c1").unwrap().unwrap().tasks.len(), 1);
    }

    // -----------------------------------------------------------------------
    // Failure injection
    // -----------------------------------------------------------------------

    /// Delegates to a MemoryStore, failing selected writes on demand.
    struct FlakyStore {
        inner: Arc<MemoryStore>,
        fail_save: AtomicBool,
        fail_delete: AtomicBool,
        /// Inserts numbered at or past this (zero-based) fail.
        fail_insert_after: AtomicUsize,
        inserts: AtomicUsize,
    }

    impl FlakyStore {
        fn new(inner: Arc<MemoryStore>) -> Self {
            Self {
                inner,
                fail_save: AtomicBool::new(false),
                fail_delete: AtomicBool::new(false),
                fail_insert_after: AtomicUsize::new(usize::MAX),
                inserts: AtomicUsize::new(0),
            }
        }
    }

    impl Store for FlakyStore {
        fn find_component(&self, id: &str) -> Result<Option<Component>> {
            self.inner.find_component(id)
        }
        fn save_component(&self, component: &Component) -> Result<Component> {
            if self.fail_save.load(Ordering::SeqCst) {
                return Err(EngineError::Storage("component save refused".into()));
            }
            self.inner.save_component(component)
        }
        fn find_account_owning_component(&self, component_id: &str) -> Result<Option<Account>> {
            self.inner.find_account_owning_component(component_id)
        }
        fn put_account(&self, account: &Account) -> Result<()> {
            self.inner.put_account(account)
        }
        fn insert_task(&self, task: &Task) -> Result<Task> {
            let n = self.inserts.fetch_add(1, Ordering::SeqCst);
            if n >= self.fail_insert_after.load(Ordering::SeqCst) {
                return Err(EngineError::Storage("task insert refused".into()));
            }
            self.inner.insert_task(task)
        }
        fn find_task(&self, id: &str) -> Result<Option<Task>> {
            self.inner.find_task(id)
        }
        fn find_tasks_by_ids(&self, ids: &[String]) -> Result<Vec<Task>> {
            self.inner.find_tasks_by_ids(ids)
        }
        fn delete_task(&self, id: &str) -> Result<Option<Task>> {
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(EngineError::Storage("task delete refused".into()));
            }
            self.inner.delete_task(id)
        }
        fn delete_tasks(&self, ids: &[String]) -> Result<usize> {
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(EngineError::Storage("task delete refused".into()));
            }
            self.inner.delete_tasks(ids)
        }
        fn find_tasks(&self, criteria: &TaskCriteria) -> Result<Vec<Task>> {
            self.inner.find_tasks(criteria)
        }
    }

    #[test]
    fn failed_component_save_leaves_no_orphan_task() {
        let inner = seeded();
        let flaky = Arc::new(FlakyStore::new(inner.clone()));
        let engine = TaskEngine::new(flaky.clone(), inner.clone(), EngineConfig::default());

        flaky.fail_save.store(true, Ordering::SeqCst);
        let err = engine
            .add_task_list(
                "c1",
                vec![
                    NewTask::manual(slot(2), Channel::Email),
                    NewTask::manual(slot(3), Channel::Email),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::Storage(_)));
        assert_eq!(inner.task_count(), 0);
        assert!(inner.find_component("c1").unwrap().unwrap().tasks.is_empty());
    }

    #[test]
    fn failed_central_delete_restores_back_reference() {
        let inner = seeded();
        let flaky = Arc::new(FlakyStore::new(inner.clone()));
        let engine = TaskEngine::new(flaky.clone(), inner.clone(), EngineConfig::default());
        let task = engine
            .add_task("c1", NewTask::manual(slot(2) + Duration::hours(1), Channel::Call))
            .unwrap();

        flaky.fail_delete.store(true, Ordering::SeqCst);
        assert!(engine.remove_task("c1", &task.id).is_err());
        assert!(inner.find_task(&task.id).unwrap().is_some());
        let c = inner.find_component("c1").unwrap().unwrap();
        assert!(c.find_task_ref(&task.id).is_some());
    }

    #[test]
    fn failed_insert_mid_batch_rolls_back_earlier_inserts() {
        let inner = seeded();
        let flaky = Arc::new(FlakyStore::new(inner.clone()));
        let engine = TaskEngine::new(flaky.clone(), inner.clone(), EngineConfig::default());
        let kept = engine
            .add_task("c1", NewTask::manual(slot(5), Channel::Call))
            .unwrap();

        flaky.fail_insert_after.store(2, Ordering::SeqCst);
        let err = engine
            .add_task_list(
                "c1",
                vec![
                    NewTask::manual(slot(2), Channel::Email),
                    NewTask::manual(slot(3), Channel::Email),
                    NewTask::manual(slot(4), Channel::Email),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::Storage(_)));
        assert_eq!(inner.task_count(), 1);
        let c = inner.find_component("c1").unwrap().unwrap();
        assert_eq!(c.tasks.len(), 1);
        assert_eq!(c.tasks[0].id, kept.id);
    }

    #[test]
    fn failed_bulk_delete_restores_back_references() {
        let inner = seeded();
        let flaky = Arc::new(FlakyStore::new(inner.clone()));
        let engine = TaskEngine::new(flaky.clone(), inner.clone(), EngineConfig::default());
        let task = engine
            .add_task("c1", NewTask::manual(slot(2), Channel::Email))
            .unwrap();

        flaky.fail_delete.store(true, Ordering::SeqCst);
        let err = engine
            .remove_tasks_matching(&TaskCriteria::for_component("c1"))
            .unwrap_err();
        assert!(matches!(err, EngineError::Storage(_)));
        assert!(inner.find_task(&task.id).unwrap().is_some());
        let c = inner.find_component("c1").unwrap().unwrap();
        assert!(c.find_task_ref(&task.id).is_some());
    }
}
