use crate::backend::open_engine;
use crate::output::{print_json, print_table};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use pipeline_core::task::{NewTask, TaskCriteria, TaskSource, TaskWithAssignee};
use pipeline_core::types::{Channel, TaskStatus};
use std::path::Path;

#[derive(Subcommand)]
pub enum TaskSubcommand {
    /// List a component's tasks with their assignees
    List { component: String },
    /// Show one task
    Get { component: String, task_id: String },
    /// Add a manual task
    Add {
        component: String,
        /// Slot, RFC 3339 (e.g. 2030-01-02T09:00:00Z)
        #[arg(long)]
        at: DateTime<Utc>,
        /// linkedin, email or call
        #[arg(long)]
        channel: Channel,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        message: Option<String>,
        /// Initial status (default: pending)
        #[arg(long)]
        status: Option<TaskStatus>,
    },
    /// Remove a task from a component
    Remove { component: String, task_id: String },
    /// Remove every task of the given components matching the filters
    Purge {
        #[arg(required = true)]
        components: Vec<String>,
        #[arg(long = "status")]
        statuses: Vec<TaskStatus>,
        #[arg(long = "channel")]
        channels: Vec<Channel>,
    },
}

pub fn run(root: &Path, subcmd: TaskSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        TaskSubcommand::List { component } => list(root, &component, json),
        TaskSubcommand::Get { component, task_id } => get(root, &component, &task_id, json),
        TaskSubcommand::Add {
            component,
            at,
            channel,
            assignee,
            message,
            status,
        } => {
            let task = NewTask {
                assignee_id: assignee,
                message,
                status,
                ..NewTask::manual(at, channel)
            };
            add(root, &component, task, json)
        }
        TaskSubcommand::Remove { component, task_id } => {
            remove(root, &component, &task_id, json)
        }
        TaskSubcommand::Purge {
            components,
            statuses,
            channels,
        } => {
            let criteria = TaskCriteria {
                component_ids: components,
                statuses,
                channels,
            };
            purge(root, &criteria, json)
        }
    }
}

fn list(root: &Path, component: &str, json: bool) -> anyhow::Result<()> {
    let engine = open_engine(root, false)?;
    let tasks = engine.list_tasks(component)?;

    if json {
        return print_json(&tasks);
    }
    if tasks.is_empty() {
        println!("No tasks on {component}.");
        return Ok(());
    }
    print_tasks(&tasks);
    Ok(())
}

fn get(root: &Path, component: &str, task_id: &str, json: bool) -> anyhow::Result<()> {
    let engine = open_engine(root, false)?;
    let task = engine.get_task(component, task_id)?;

    if json {
        return print_json(&task);
    }
    let t = &task.task;
    println!("Task:      {}", t.id);
    println!("Component: {}", t.component_id);
    println!("Scheduled: {}", t.scheduled.to_rfc3339());
    println!("Channel:   {}", t.channel);
    println!("Status:    {}", t.status);
    println!("Source:    {}", source_label(t.source.as_ref()));
    println!("Assignee:  {}", assignee_label(&task));
    if let Some(message) = &t.message {
        println!("Message:   {message}");
    }
    if let Some(link) = &t.link {
        match &link.description {
            Some(desc) => println!("Link:      {} ({desc})", link.url),
            None => println!("Link:      {}", link.url),
        }
    }
    Ok(())
}

fn add(root: &Path, component: &str, task: NewTask, json: bool) -> anyhow::Result<()> {
    let engine = open_engine(root, false)?;
    let task = engine.add_task(component, task)?;

    if json {
        print_json(&task)?;
    } else {
        println!(
            "Added task [{}] on {component} at {} ({})",
            task.id,
            task.scheduled.to_rfc3339(),
            task.channel
        );
    }
    Ok(())
}

fn remove(root: &Path, component: &str, task_id: &str, json: bool) -> anyhow::Result<()> {
    let engine = open_engine(root, false)?;
    let task = engine.remove_task(component, task_id)?;

    if json {
        print_json(&task)?;
    } else {
        println!("Removed task [{}] from {component}", task.id);
    }
    Ok(())
}

fn purge(root: &Path, criteria: &TaskCriteria, json: bool) -> anyhow::Result<()> {
    let engine = open_engine(root, false)?;
    let removed = engine.remove_tasks_matching(criteria)?;

    if json {
        print_json(&serde_json::json!({ "removed": removed }))?;
    } else {
        println!("Removed {removed} task(s)");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

pub(crate) fn print_tasks(tasks: &[TaskWithAssignee]) {
    let rows = tasks
        .iter()
        .map(|t| {
            vec![
                t.task.id.clone(),
                t.task.scheduled.format("%Y-%m-%d %H:%M").to_string(),
                t.task.channel.to_string(),
                t.task.status.to_string(),
                assignee_label(t),
                source_label(t.task.source.as_ref()),
            ]
        })
        .collect();
    print_table(
        &["ID", "SCHEDULED", "CHANNEL", "STATUS", "ASSIGNEE", "SOURCE"],
        rows,
    );
}

fn assignee_label(task: &TaskWithAssignee) -> String {
    match (&task.assignee, &task.task.assignee_id) {
        (Some(user), _) => user.name.clone(),
        (None, Some(id)) => format!("{id} (unknown)"),
        (None, None) => "-".to_string(),
    }
}

fn source_label(source: Option<&TaskSource>) -> String {
    match source {
        Some(TaskSource::Manual) => "manual".to_string(),
        Some(TaskSource::Automatic { sequence_id }) => format!("sequence:{sequence_id}"),
        None => "-".to_string(),
    }
}
