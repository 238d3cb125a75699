use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use pipeline_core::task::{NewTask, Task, TaskCriteria, TaskWithAssignee};

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/components/{id}/tasks: list a component's tasks with assignees.
pub async fn list_tasks(
    State(app): State<AppState>,
    Path(component_id): Path<String>,
) -> Result<Json<Vec<TaskWithAssignee>>, AppError> {
    let tasks = app.run(move |e| e.list_tasks(&component_id)).await?;
    Ok(Json(tasks))
}

/// POST /api/components/{id}/tasks: add one task.
pub async fn add_task(
    State(app): State<AppState>,
    Path(component_id): Path<String>,
    Json(body): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let task = app.run(move |e| e.add_task(&component_id, body)).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// POST /api/components/{id}/tasks/batch: add several tasks in order.
pub async fn add_task_list(
    State(app): State<AppState>,
    Path(component_id): Path<String>,
    Json(body): Json<Vec<NewTask>>,
) -> Result<(StatusCode, Json<Vec<Task>>), AppError> {
    let tasks = app
        .run(move |e| e.add_task_list(&component_id, body))
        .await?;
    Ok((StatusCode::CREATED, Json(tasks)))
}

/// GET /api/components/{id}/tasks/{task_id}: one task with its assignee.
pub async fn get_task(
    State(app): State<AppState>,
    Path((component_id, task_id)): Path<(String, String)>,
) -> Result<Json<TaskWithAssignee>, AppError> {
    let task = app
        .run(move |e| e.get_task(&component_id, &task_id))
        .await?;
    Ok(Json(task))
}

/// DELETE /api/components/{id}/tasks/{task_id}: remove a task, returning it.
pub async fn remove_task(
    State(app): State<AppState>,
    Path((component_id, task_id)): Path<(String, String)>,
) -> Result<Json<Task>, AppError> {
    let task = app
        .run(move |e| e.remove_task(&component_id, &task_id))
        .await?;
    Ok(Json(task))
}

/// POST /api/tasks/purge: bulk removal by criteria.
pub async fn purge_tasks(
    State(app): State<AppState>,
    Json(criteria): Json<TaskCriteria>,
) -> Result<Json<serde_json::Value>, AppError> {
    let removed = app
        .run(move |e| e.remove_tasks_matching(&criteria))
        .await?;
    Ok(Json(serde_json::json!({ "removed": removed })))
}
