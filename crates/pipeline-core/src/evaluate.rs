//! Turns a sequence template into concrete scheduled touch-points.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::component::Component;
use crate::config::{LinksConfig, ScheduleConfig};
use crate::error::{EngineError, Result};
use crate::sequence::{Sequence, SequenceStep};
use crate::task::{NewTask, TaskLink, TaskSource};
use crate::types::TaskStatus;

/// A selected step with both its relative span and its absolute offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledStep {
    pub step: SequenceStep,
    /// Days after the previous selected step (the step's own `timespan`).
    pub relative_days: u32,
    /// Days after the start date.
    pub offset_days: u32,
    pub scheduled: DateTime<Utc>,
    pub link: Option<TaskLink>,
}

impl ScheduledStep {
    pub fn to_new_task(&self, sequence_id: &str, assignee_id: Option<&str>) -> NewTask {
        NewTask {
            scheduled: self.scheduled,
            channel: self.step.channel,
            status: Some(TaskStatus::Scheduled),
            assignee_id: assignee_id.map(str::to_string),
            source: Some(TaskSource::Automatic {
                sequence_id: sequence_id.to_string(),
            }),
            message: Some(self.step.message.clone()).filter(|m| !m.is_empty()),
            link: self.link.clone(),
        }
    }
}

/// Running sum of relative spans. Fails when the total does not fit in `u32`.
pub fn accumulate_offsets(spans: &[u32]) -> Result<Vec<u32>> {
    let mut acc = 0u32;
    spans
        .iter()
        .map(|&span| -> Result<u32> {
            acc = acc
                .checked_add(span)
                .ok_or_else(|| EngineError::validation("sequence timespans overflow"))?;
            Ok(acc)
        })
        .collect()
}

fn add_days(start: DateTime<Utc>, days: u32) -> Result<DateTime<Utc>> {
    start
        .checked_add_signed(Duration::days(i64::from(days)))
        .ok_or_else(|| {
            EngineError::validation(format!("{days} days after {start} is out of range"))
        })
}

/// Conventional start: `start_offset_days` after `now`, at `start_hour` UTC.
pub fn default_start(now: DateTime<Utc>, cfg: &ScheduleConfig) -> Result<DateTime<Utc>> {
    let time = NaiveTime::from_hms_opt(cfg.start_hour, 0, 0).ok_or_else(|| {
        EngineError::validation(format!("start_hour {} is not an hour of the day", cfg.start_hour))
    })?;
    let day = add_days(now, cfg.start_offset_days)?.date_naive();
    Ok(day.and_time(time).and_utc())
}

fn step_link(step: &SequenceStep, component: &Component, links: &LinksConfig) -> Option<TaskLink> {
    if let Some(url) = &step.attachment {
        return Some(TaskLink {
            url: url.clone(),
            description: None,
        });
    }
    if !step.channel.is_threaded() {
        return None;
    }
    component.thread_url.as_ref().map(|url| TaskLink {
        url: url.clone(),
        description: links.thread_label().map(str::to_string),
    })
}

/// Select the steps matching the component's personality and place them on
/// the calendar starting at `start`.
pub fn evaluate(
    sequence: &Sequence,
    component: &Component,
    start: DateTime<Utc>,
    links: &LinksConfig,
) -> Result<Vec<ScheduledStep>> {
    let personality =
        component
            .personality
            .ok_or_else(|| EngineError::PersonalityNotAssigned {
                sequence_id: sequence.id.clone(),
                component_id: component.id.clone(),
            })?;

    let selected = sequence.steps_for(personality);
    let spans: Vec<u32> = selected.iter().map(|s| s.timespan).collect();
    let offsets = accumulate_offsets(&spans)?;

    let scheduled = selected
        .into_iter()
        .zip(offsets)
        .map(|(step, offset)| -> Result<ScheduledStep> {
            let link = step_link(&step, component, links);
            Ok(ScheduledStep {
                relative_days: step.timespan,
                offset_days: offset,
                scheduled: add_days(start, offset)?,
                link,
                step,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(
        sequence_id = %sequence.id,
        component_id = %component.id,
        steps = scheduled.len(),
        "evaluated sequence"
    );
    Ok(scheduled)
}
