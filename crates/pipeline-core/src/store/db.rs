//! Persistent store backed by a single redb file.
//!
//! # Table design
//!
//! Four tables keyed by the entity id (`&str`) with JSON-encoded values:
//! `components`, `accounts`, `tasks`, `sequences`. Every trait call runs in
//! its own read or write transaction; cross-document consistency is the
//! engine's job.

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{sort_tasks, SequenceProvider, Store};
use crate::account::Account;
use crate::component::Component;
use crate::error::{EngineError, Result};
use crate::sequence::Sequence;
use crate::task::{Task, TaskCriteria};

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

const COMPONENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("components");
const ACCOUNTS: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");
const TASKS: TableDefinition<&str, &[u8]> = TableDefinition::new("tasks");
const SEQUENCES: TableDefinition<&str, &[u8]> = TableDefinition::new("sequences");

type Table = TableDefinition<'static, &'static str, &'static [u8]>;

fn db_err(e: impl std::fmt::Display) -> EngineError {
    EngineError::Storage(e.to_string())
}

// ---------------------------------------------------------------------------
// RedbStore
// ---------------------------------------------------------------------------

pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create the database at `path`, creating all tables.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            crate::io::ensure_dir(parent)?;
        }
        let db = Database::create(path).map_err(db_err)?;
        let wt = db.begin_write().map_err(db_err)?;
        for table in [COMPONENTS, ACCOUNTS, TASKS, SEQUENCES] {
            wt.open_table(table).map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(Self { db })
    }

    fn get<T: DeserializeOwned>(&self, table: Table, key: &str) -> Result<Option<T>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(table).map_err(db_err)?;
        let found = table.get(key).map_err(db_err)?;
        let decoded = match found {
            Some(v) => Some(serde_json::from_slice(v.value())?),
            None => None,
        };
        Ok(decoded)
    }

    fn put<T: Serialize>(&self, table: Table, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        let wt = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = wt.open_table(table).map_err(db_err)?;
            table.insert(key, bytes.as_slice()).map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, table: Table) -> Result<Vec<T>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(table).map_err(db_err)?;
        let mut out = Vec::new();
        for entry in table.iter().map_err(db_err)? {
            let (_, v) = entry.map_err(db_err)?;
            out.push(serde_json::from_slice(v.value())?);
        }
        Ok(out)
    }

    /// Remove `keys` from TASKS in one transaction, returning removed records.
    fn remove_tasks(&self, keys: &[String]) -> Result<Vec<Task>> {
        let wt = self.db.begin_write().map_err(db_err)?;
        let mut removed = Vec::new();
        {
            let mut table = wt.open_table(TASKS).map_err(db_err)?;
            for key in keys {
                let bytes = table
                    .remove(key.as_str())
                    .map_err(db_err)?
                    .map(|v| v.value().to_vec());
                if let Some(bytes) = bytes {
                    removed.push(serde_json::from_slice(&bytes)?);
                }
            }
        }
        wt.commit().map_err(db_err)?;
        Ok(removed)
    }
}

impl Store for RedbStore {
    fn find_component(&self, id: &str) -> Result<Option<Component>> {
        self.get(COMPONENTS, id)
    }

    fn save_component(&self, component: &Component) -> Result<Component> {
        self.put(COMPONENTS, &component.id, component)?;
        Ok(component.clone())
    }

    fn find_account_owning_component(&self, component_id: &str) -> Result<Option<Account>> {
        let accounts: Vec<Account> = self.scan(ACCOUNTS)?;
        Ok(accounts.into_iter().find(|a| a.owns(component_id)))
    }

    fn put_account(&self, account: &Account) -> Result<()> {
        self.put(ACCOUNTS, &account.id, account)
    }

    fn insert_task(&self, task: &Task) -> Result<Task> {
        self.put(TASKS, &task.id, task)?;
        Ok(task.clone())
    }

    fn find_task(&self, id: &str) -> Result<Option<Task>> {
        self.get(TASKS, id)
    }

    fn find_tasks_by_ids(&self, ids: &[String]) -> Result<Vec<Task>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(TASKS).map_err(db_err)?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(v) = table.get(id.as_str()).map_err(db_err)? {
                out.push(serde_json::from_slice(v.value())?);
            }
        }
        Ok(out)
    }

    fn delete_task(&self, id: &str) -> Result<Option<Task>> {
        let mut removed = self.remove_tasks(&[id.to_string()])?;
        Ok(removed.pop())
    }

    fn delete_tasks(&self, ids: &[String]) -> Result<usize> {
        Ok(self.remove_tasks(ids)?.len())
    }

    fn find_tasks(&self, criteria: &TaskCriteria) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .scan::<Task>(TASKS)?
            .into_iter()
            .filter(|t| criteria.matches(t))
            .collect();
        sort_tasks(&mut tasks);
        Ok(tasks)
    }
}

impl SequenceProvider for RedbStore {
    fn find_sequence(&self, id: &str) -> Result<Option<Sequence>> {
        self.get(SEQUENCES, id)
    }

    fn put_sequence(&self, sequence: &Sequence) -> Result<()> {
        self.put(SEQUENCES, &sequence.id, sequence)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
