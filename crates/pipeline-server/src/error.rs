use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pipeline_core::error::EngineError;

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<EngineError>() {
            Some(e) => match e {
                EngineError::NotFound { .. } | EngineError::TaskNotOnComponent { .. } => {
                    StatusCode::NOT_FOUND
                }
                EngineError::SlotAlreadyScheduled { .. } => StatusCode::CONFLICT,
                EngineError::Validation(_) => StatusCode::BAD_REQUEST,
                EngineError::PersonalityNotAssigned { .. }
                | EngineError::AssigneeNotFound { .. }
                | EngineError::NoAssigneeFound { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                EngineError::Storage(_)
                | EngineError::Io(_)
                | EngineError::Yaml(_)
                | EngineError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            None => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
