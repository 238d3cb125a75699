//! Slot double-booking guard.
//!
//! A slot is one `scheduled` instant on one component. A candidate collides
//! with an occupant at the same instant unless the candidate is a manual task
//! overriding an automatic one.

use crate::error::{EngineError, Result};
use crate::task::{Task, TaskRef, TaskSource};

fn overrides(candidate: Option<&TaskSource>, occupant: Option<&TaskSource>) -> bool {
    matches!(
        (candidate, occupant),
        (Some(TaskSource::Manual), Some(TaskSource::Automatic { .. }))
    )
}

pub fn collides(occupant: &TaskRef, candidate: &Task) -> bool {
    occupant.scheduled == candidate.scheduled
        && !overrides(candidate.source.as_ref(), occupant.source.as_ref())
}

pub fn check_conflict(existing: &[TaskRef], candidate: &Task, component_id: &str) -> Result<()> {
    if existing.iter().any(|occupant| collides(occupant, candidate)) {
        tracing::debug!(component_id, scheduled = %candidate.scheduled, "slot rejected");
        return Err(EngineError::SlotAlreadyScheduled {
            component_id: component_id.to_string(),
            scheduled: candidate.scheduled.to_rfc3339(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::NewTask;
    use crate::types::Channel;
    use chrono::{DateTime, TimeZone, Utc};

    fn slot(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 9, 0, 0).unwrap()
    }

    fn manual(day: u32) -> Task {
        NewTask::manual(slot(day), Channel::Email).into_task("c1", slot(1))
    }

    fn automatic(day: u32) -> Task {
        NewTask::automatic(slot(day), Channel::Email, "seq").into_task("c1", slot(1))
    }

    fn unsourced(day: u32) -> Task {
        Task {
            source: None,
            ..manual(day)
        }
    }

    fn occupied(tasks: &[Task]) -> Vec<TaskRef> {
        tasks.iter().map(TaskRef::from).collect()
    }

    #[test]
    fn free_slot_passes() {
        let existing = occupied(&[automatic(2)]);
        check_conflict(&existing, &automatic(3), "c1").unwrap();
        check_conflict(&[], &automatic(3), "c1").unwrap();
    }

    #[test]
    fn automatic_never_takes_an_occupied_slot() {
        for occupant in [automatic(2), manual(2), unsourced(2)] {
            let existing = occupied(&[occupant]);
            let err = check_conflict(&existing, &automatic(2), "c1").unwrap_err();
            match err {
                EngineError::SlotAlreadyScheduled {
                    component_id,
                    scheduled,
                } => {
                    assert_eq!(component_id, "c1");
                    assert_eq!(scheduled, slot(2).to_rfc3339());
                }
                other => panic!("expected SlotAlreadyScheduled, got {other:?}"),
            }
        }
    }

    #[test]
    fn manual_overrides_automatic_slot() {
        let existing = occupied(&[automatic(2)]);
        check_conflict(&existing, &manual(2), "c1").unwrap();
    }

    #[test]
    fn manual_does_not_override_manual_slot() {
        let existing = occupied(&[manual(2)]);
        assert!(check_conflict(&existing, &manual(2), "c1").is_err());
    }

    #[test]
    fn unsourced_candidate_is_treated_as_non_overriding() {
        let existing = occupied(&[automatic(2)]);
        assert!(check_conflict(&existing, &unsourced(2), "c1").is_err());
    }
}
