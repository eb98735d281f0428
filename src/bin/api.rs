use anyhow::{Context, Result};
use linksummary::{
    api::{self, AppState},
    app::{build_services, init_tracing},
    config::Config,
    worker::{ScanQueue, ScanWorker, cancel_on_ctrl_c},
};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info,tower_http=debug");

    let config = Config::from_env()?;
    let services = build_services(&config).await?;

    let shutdown = CancellationToken::new();
    cancel_on_ctrl_c(shutdown.clone());

    let (queue, receiver) = ScanQueue::bounded(config.worker_concurrency() * 2);
    let worker = ScanWorker::new(
        services.controller.clone(),
        receiver,
        config.worker_concurrency(),
        shutdown.clone(),
    );
    let worker_handle = tokio::spawn(worker.run());

    let app = api::router(AppState {
        registry: services.registry,
        store: services.store,
        controller: services.controller,
        renderer: services.renderer,
        queue,
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr()))?;
    info!(addr = config.bind_addr(), "listening");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
        .await?;

    worker_handle.await??;
    Ok(())
}
