use crate::error::{EngineError, Result};
use crate::paths;
use crate::types::Role;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// AssignmentConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentConfig {
    /// Roles tried in order when no explicit assignee is given.
    #[serde(default = "default_role_precedence")]
    pub role_precedence: Vec<Role>,
}

fn default_role_precedence() -> Vec<Role> {
    vec![Role::Assistant, Role::Client]
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            role_precedence: default_role_precedence(),
        }
    }
}

// ---------------------------------------------------------------------------
// ScheduleConfig
// ---------------------------------------------------------------------------

/// How `add_task_list` checks a batch for slot collisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchConflicts {
    /// Each task is checked against the tasks present before the batch.
    #[default]
    PreExisting,
    /// Each task is also checked against earlier tasks of the same batch.
    Cumulative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_start_offset_days")]
    pub start_offset_days: u32,
    #[serde(default = "default_start_hour")]
    pub start_hour: u32,
    #[serde(default)]
    pub batch_conflicts: BatchConflicts,
}

fn default_start_offset_days() -> u32 {
    1
}

fn default_start_hour() -> u32 {
    9
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            start_offset_days: default_start_offset_days(),
            start_hour: default_start_hour(),
            batch_conflicts: BatchConflicts::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// LinksConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinksConfig {
    #[serde(default = "default_locale")]
    pub locale: String,
    /// Description of the synthesized conversation-thread link, per locale.
    #[serde(default = "default_thread_labels")]
    pub thread_labels: HashMap<String, String>,
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_thread_labels() -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert("en".to_string(), "Open the conversation".to_string());
    m.insert("fr".to_string(), "Ouvrir la conversation".to_string());
    m
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            thread_labels: default_thread_labels(),
        }
    }
}

impl LinksConfig {
    /// Label for the configured locale, falling back to English.
    pub fn thread_label(&self) -> Option<&str> {
        self.thread_labels
            .get(&self.locale)
            .or_else(|| self.thread_labels.get("en"))
            .map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// EngineConfig (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub assignment: AssignmentConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub links: LinksConfig,
}

impl EngineConfig {
    /// Load `.pipeline/config.yaml`, or defaults when the file is absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: EngineConfig = serde_yaml::from_str(&data)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schedule.start_hour > 23 {
            return Err(EngineError::validation(format!(
                "schedule.start_hour must be 0-23, got {}",
                self.schedule.start_hour
            )));
        }
        Ok(())
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }
}
