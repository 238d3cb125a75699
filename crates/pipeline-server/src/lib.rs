pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use pipeline_core::TaskEngine;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(engine: Arc<TaskEngine>) -> Router {
    let app_state = state::AppState::new(engine);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Tasks
        .route(
            "/api/components/{id}/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::add_task),
        )
        .route(
            "/api/components/{id}/tasks/batch",
            post(routes::tasks::add_task_list),
        )
        .route(
            "/api/components/{id}/tasks/{task_id}",
            get(routes::tasks::get_task).delete(routes::tasks::remove_task),
        )
        .route("/api/tasks/purge", post(routes::tasks::purge_tasks))
        // Sequences
        .route(
            "/api/components/{id}/schedule/{sequence_id}",
            get(routes::schedule::eval_schedule).post(routes::schedule::commit_schedule),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the API server on `port`.
pub async fn serve(engine: Arc<TaskEngine>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(engine, listener).await
}

/// Start the API server on a pre-bound listener.
///
/// Lets the caller read the actual port before starting (useful when
/// `port = 0` and the OS picks a free port).
pub async fn serve_on(
    engine: Arc<TaskEngine>,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(engine);

    tracing::info!("pipeline API listening on http://localhost:{actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
