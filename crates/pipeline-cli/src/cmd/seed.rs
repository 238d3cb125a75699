use crate::backend::open_engine;
use crate::output::print_json;
use anyhow::Context;
use pipeline_core::fixtures::{FixtureSummary, Fixtures};
use pipeline_core::TaskEngine;
use std::path::Path;

pub fn run(root: &Path, file: &Path, json: bool) -> anyhow::Result<()> {
    let engine = open_engine(root, false)?;
    let summary = apply_file(&engine, file)?;

    if json {
        print_json(&summary)?;
    } else {
        println!(
            "Seeded {} account(s), {} component(s), {} sequence(s)",
            summary.accounts, summary.components, summary.sequences
        );
    }
    Ok(())
}

pub(crate) fn apply_file(engine: &TaskEngine, file: &Path) -> anyhow::Result<FixtureSummary> {
    let fixtures = Fixtures::load(file)
        .with_context(|| format!("failed to read fixtures from {}", file.display()))?;
    let summary = fixtures.apply(engine.store(), engine.sequences())?;
    Ok(summary)
}
