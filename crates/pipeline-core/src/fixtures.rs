//! Seed data loading.
//!
//! Accounts, components and sequences are owned by collaborators outside the
//! engine; fixtures are how a deployment or a test gets them into a store.
//!
//! ```yaml
//! accounts:
//!   - id: acc-1
//!     name: Acme
//!     users:
//!       - { id: u1, name: Ada, roles: [assistant] }
//!     component_ids: [c1]
//! components:
//!   - { id: c1, kind: prospect, name: Pat, personality: 1 }
//! sequences:
//!   - id: seq-1
//!     name: Intro
//!     steps:
//!       - { id: s0, position: 0, timespan: 0, channel: linkedin }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::component::Component;
use crate::error::Result;
use crate::paths::validate_id;
use crate::sequence::Sequence;
use crate::store::{SequenceProvider, Store};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixtures {
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub sequences: Vec<Sequence>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FixtureSummary {
    pub accounts: usize,
    pub components: usize,
    pub sequences: usize,
}

impl Fixtures {
    pub fn parse(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::parse(&data)
    }

    /// Write every record into the given seams, replacing records with equal ids.
    pub fn apply(
        &self,
        store: &dyn Store,
        sequences: &dyn SequenceProvider,
    ) -> Result<FixtureSummary> {
        for account in &self.accounts {
            validate_id("account", &account.id)?;
        }
        for component in &self.components {
            validate_id("component", &component.id)?;
        }
        for sequence in &self.sequences {
            validate_id("sequence", &sequence.id)?;
        }

        for account in &self.accounts {
            store.put_account(account)?;
        }
        for component in &self.components {
            if !self.accounts.iter().any(|a| a.owns(&component.id)) {
                tracing::warn!(component_id = %component.id, "fixture component has no owning account");
            }
            store.save_component(component)?;
        }
        for sequence in &self.sequences {
            sequences.put_sequence(sequence)?;
        }

        let summary = FixtureSummary {
            accounts: self.accounts.len(),
            components: self.components.len(),
            sequences: self.sequences.len(),
        };
        tracing::info!(?summary, "applied fixtures");
        Ok(summary)
    }
}
