use axum::extract::{Path, Query, State};
use axum::Json;
use pipeline_core::task::TaskWithAssignee;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ScheduleQuery {
    pub assignee: Option<String>,
}

/// GET /api/components/{id}/schedule/{sequence_id}: preview a sequence.
pub async fn eval_schedule(
    State(app): State<AppState>,
    Path((component_id, sequence_id)): Path<(String, String)>,
    Query(q): Query<ScheduleQuery>,
) -> Result<Json<Vec<TaskWithAssignee>>, AppError> {
    let tasks = app
        .run(move |e| e.eval_schedule(&component_id, &sequence_id, q.assignee.as_deref()))
        .await?;
    Ok(Json(tasks))
}

/// POST /api/components/{id}/schedule/{sequence_id}: persist a sequence's tasks.
pub async fn commit_schedule(
    State(app): State<AppState>,
    Path((component_id, sequence_id)): Path<(String, String)>,
    Query(q): Query<ScheduleQuery>,
) -> Result<Json<Vec<TaskWithAssignee>>, AppError> {
    let tasks = app
        .run(move |e| e.commit_schedule(&component_id, &sequence_id, q.assignee.as_deref()))
        .await?;
    Ok(Json(tasks))
}
