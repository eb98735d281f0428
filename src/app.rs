//! Process wiring shared by the API server and the CLI.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::assets::FsAssetImporter;
use crate::config::{Config, StaticConfig};
use crate::dispatch::FetchDispatcher;
use crate::fetcher::{HttpSettings, ReqwestClient};
use crate::handlers::{Registry, RegistryBuilder, register_builtin};
use crate::repositories::{FileScanStore, ScanStateStore};
use crate::scan::ScanController;
use crate::scanner::Prober;
use crate::summary::SummaryRenderer;

pub struct Services {
    pub registry: Arc<Registry>,
    pub store: Arc<dyn ScanStateStore>,
    pub controller: Arc<ScanController>,
    pub renderer: Arc<SummaryRenderer>,
}

/// Install the global subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();
}

/// Build the registry, stores and pipeline from process configuration.
/// Fails on configuration errors such as an enabled type without handler.
pub async fn build_services(config: &Config) -> Result<Services> {
    let settings = config.load_settings()?;

    let client = Arc::new(
        ReqwestClient::new(&HttpSettings::with_timeout(config.http_timeout()))
            .context("failed to build http client")?,
    );
    let importer = Arc::new(FsAssetImporter::new(
        client.clone(),
        config.media_dir(),
        config.media_base_url(),
    ));

    let mut builder = RegistryBuilder::new();
    register_builtin(&mut builder, client.clone(), importer)?;
    let registry = Arc::new(builder.build());
    registry.validate(&settings)?;
    info!(content_types = ?registry.content_types(), "handlers registered");

    let store: Arc<dyn ScanStateStore> = Arc::new(
        FileScanStore::open(config.state_dir())
            .await
            .with_context(|| format!("failed to open state dir {}", config.state_dir().display()))?,
    );
    let provider = Arc::new(StaticConfig::new(settings));

    let controller = ScanController::new(
        config.site_url().clone(),
        provider.clone(),
        store.clone(),
        Prober::new(client, config.probe_concurrency()),
        FetchDispatcher::new(registry.clone()),
    )
    .with_scan_timeout(config.scan_timeout());
    let renderer = SummaryRenderer::new(registry.clone(), provider, store.clone());

    Ok(Services {
        registry,
        store,
        controller: Arc::new(controller),
        renderer: Arc::new(renderer),
    })
}
