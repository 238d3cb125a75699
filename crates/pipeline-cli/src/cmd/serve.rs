use crate::backend::open_engine;
use std::path::Path;
use std::sync::Arc;

pub fn run(root: &Path, port: u16, memory: bool, seed: Option<&Path>) -> anyhow::Result<()> {
    let engine = open_engine(root, memory)?;
    if let Some(file) = seed {
        let summary = super::seed::apply_file(&engine, file)?;
        tracing::info!(?summary, "seeded before serving");
    }
    let engine = Arc::new(engine);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
        let actual_port = listener.local_addr()?.port();
        let store = if memory { "memory" } else { "redb" };
        println!("pipeline API → http://localhost:{actual_port}  (store: {store})");

        tokio::select! {
            res = pipeline_server::serve_on(engine, listener) => res,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                Ok(())
            }
        }
    })
}
