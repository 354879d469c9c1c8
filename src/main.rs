use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};

use frontdoor::adapters::http::ServerTimeouts;
use frontdoor::config::{ConfigWatcher, Settings, load_endpoints_or_default};
use frontdoor::ports::file_system::AssetSource;
use frontdoor::ports::http_server::HttpServer;
use frontdoor::utils::GracefulShutdown;
use frontdoor::{
    DiskAssets, EmbeddedAssets, EndpointStore, HyperHandler, HyperHttpClient, HyperServer,
    ProxyService, metrics, tracing_setup,
};

#[tokio::main]
async fn main() -> Result<()> {
    let started = Instant::now();
    let settings = Settings::load()?;

    tracing_setup::init_tracing(&settings.log_level, settings.log_format)
        .map_err(|e| anyhow!("Failed to initialize tracing: {e}"))?;
    tracing::info!("Starting Server");

    let table = load_endpoints_or_default(&settings.config_path).await;
    for mapping in &table {
        tracing::info!("Configured endpoint: {}", mapping);
    }
    let store = Arc::new(EndpointStore::new(table));

    // Dropping the watcher stops reloads, so it lives until main returns.
    let _watcher = if settings.watch_config {
        match ConfigWatcher::new(&settings.config_path, store.clone()).run() {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::warn!(
                    path = %settings.config_path.display(),
                    "Config file watching disabled: {}",
                    e
                );
                None
            }
        }
    } else {
        None
    };

    if let Some(addr) = settings.metrics_addr {
        metrics::install_exporter(addr)?;
    }

    let proxy = Arc::new(ProxyService::new(
        store,
        settings.dispatch_mode,
        settings.prefix_matching,
    ));
    let assets: Arc<dyn AssetSource> = match &settings.static_root {
        Some(root) => {
            tracing::info!("Serving static assets from {}", root.display());
            Arc::new(DiskAssets::new(root))
        }
        None => Arc::new(EmbeddedAssets::new()),
    };
    let http_client = Arc::new(HyperHttpClient::new()?);
    let handler = HyperHandler::new(proxy, http_client, assets, settings.upstream_timeout);

    let shutdown = Arc::new(GracefulShutdown::with_grace_period(settings.grace_period));
    let signal_task = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = shutdown.run_signal_handler().await {
                tracing::error!("Signal handler failed: {}", e);
            }
        })
    };

    let server = HyperServer::with_dependencies(
        settings.listen_addr,
        ServerTimeouts {
            read: settings.read_timeout,
            write: settings.write_timeout,
            idle: settings.idle_timeout,
        },
        handler,
        shutdown,
    );
    let result = server.run().await;
    signal_task.abort();

    let uptime = Duration::from_secs(started.elapsed().as_secs());
    tracing::info!(
        "Shutting down. The front door has been open for {}",
        humantime::format_duration(uptime)
    );
    result
}
