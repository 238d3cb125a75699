use pipeline_core::TaskEngine;
use std::sync::Arc;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TaskEngine>,
}

impl AppState {
    pub fn new(engine: Arc<TaskEngine>) -> Self {
        Self { engine }
    }

    /// Run a synchronous engine call off the async executor.
    pub async fn run<T, F>(&self, f: F) -> Result<T, crate::error::AppError>
    where
        F: FnOnce(&TaskEngine) -> pipeline_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        let result = tokio::task::spawn_blocking(move || f(&engine))
            .await
            .map_err(|e| crate::error::AppError(anyhow::anyhow!("task join error: {e}")))??;
        Ok(result)
    }
}
