use crate::error::{EngineError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const PIPELINE_DIR: &str = ".pipeline";
pub const CONFIG_FILE: &str = ".pipeline/config.yaml";
pub const DB_FILE: &str = ".pipeline/pipeline.redb";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn pipeline_dir(root: &Path) -> PathBuf {
    root.join(PIPELINE_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn db_path(root: &Path) -> PathBuf {
    root.join(DB_FILE)
}

// ---------------------------------------------------------------------------
// Id validation
// ---------------------------------------------------------------------------

static ID_RE: OnceLock<Regex> = OnceLock::new();

fn id_re() -> &'static Regex {
    ID_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.:\-]*$").unwrap())
}

/// Reject empty or malformed ids before they reach the store.
pub fn validate_id(kind: &str, id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(EngineError::validation(format!("{kind} id must not be empty")));
    }
    if id.len() > 128 || !id_re().is_match(id) {
        return Err(EngineError::validation(format!("invalid {kind} id '{id}'")));
    }
    Ok(())
}
