use crate::backend::open_engine;
use crate::output::print_json;
use chrono::{DateTime, Utc};
use clap::Subcommand;
use std::path::Path;

use super::task::print_tasks;

#[derive(Subcommand)]
pub enum ScheduleSubcommand {
    /// Preview the tasks a sequence would create
    Eval {
        component: String,
        sequence: String,
        /// Account member to assign instead of the role-based default
        #[arg(long)]
        assignee: Option<String>,
        /// First slot, RFC 3339 (default: tomorrow at the configured hour)
        #[arg(long)]
        start: Option<DateTime<Utc>>,
    },
    /// Create the tasks a sequence produces
    Commit {
        component: String,
        sequence: String,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        start: Option<DateTime<Utc>>,
    },
}

pub fn run(root: &Path, subcmd: ScheduleSubcommand, json: bool) -> anyhow::Result<()> {
    let engine = open_engine(root, false)?;
    let (committed, tasks) = match subcmd {
        ScheduleSubcommand::Eval {
            component,
            sequence,
            assignee,
            start,
        } => {
            let tasks = match start {
                Some(start) => {
                    engine.eval_schedule_from(&component, &sequence, assignee.as_deref(), start)?
                }
                None => engine.eval_schedule(&component, &sequence, assignee.as_deref())?,
            };
            (false, tasks)
        }
        ScheduleSubcommand::Commit {
            component,
            sequence,
            assignee,
            start,
        } => {
            let tasks = match start {
                Some(start) => engine.commit_schedule_from(
                    &component,
                    &sequence,
                    assignee.as_deref(),
                    start,
                )?,
                None => engine.commit_schedule(&component, &sequence, assignee.as_deref())?,
            };
            (true, tasks)
        }
    };

    if json {
        return print_json(&tasks);
    }
    if tasks.is_empty() {
        println!("Sequence produced no tasks for this personality.");
        return Ok(());
    }
    print_tasks(&tasks);
    if committed {
        println!("\nCommitted {} task(s).", tasks.len());
    }
    Ok(())
}
