use anyhow::Context;
use pipeline_core::config::EngineConfig;
use pipeline_core::paths;
use pipeline_core::store::{MemoryStore, RedbStore};
use pipeline_core::TaskEngine;
use std::path::Path;
use std::sync::Arc;

/// Build an engine for `root`: config from `.pipeline/config.yaml`, records
/// from `.pipeline/pipeline.redb` unless `memory` is set.
pub fn open_engine(root: &Path, memory: bool) -> anyhow::Result<TaskEngine> {
    let config = EngineConfig::load(root).context("failed to load pipeline config")?;
    if memory {
        tracing::debug!("using in-memory store");
        return Ok(TaskEngine::with_backend(Arc::new(MemoryStore::new()), config));
    }
    let db_path = paths::db_path(root);
    let store = RedbStore::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    Ok(TaskEngine::with_backend(Arc::new(store), config))
}
