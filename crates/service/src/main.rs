use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use m2m_core::{
    create_certificate_provider, file_queue, load_config, validate_config, Archiver,
    CertificateProvider, Connector, Courier, DirectoryWatcher, FsArchiver, HeartbeatTicker,
    MetadataResolver, ReadinessGate, ReqwestConnector, ResourceTemplate, SanitizedConfig,
    TransferOrchestrator,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting m2m-courier v{}", VERSION);

    // Determine config path
    let config_path = std::env::var("M2M_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let sanitized = SanitizedConfig::from(&config);
    info!(
        "Configuration loaded: {}",
        serde_json::to_string(&sanitized).unwrap_or_default()
    );

    // Look up the client certificate once; without it nothing can be delivered
    let provider = create_certificate_provider(&config.certificate)
        .context("Failed to create certificate provider")?;
    let credential = provider
        .get_credential()
        .await
        .context("Client certificate unavailable")?;
    info!(
        "Using client certificate {} from {}",
        credential.serial_number,
        credential.source.display()
    );

    let template = ResourceTemplate::parse(&config.endpoint.upload_resource)
        .context("Invalid upload resource template")?;
    let connector: Arc<dyn Connector> = Arc::new(
        ReqwestConnector::new(&config.endpoint, &credential)
            .context("Failed to create HTTP connector")?,
    );
    info!("Endpoint: {}", config.endpoint.base_url);

    // Heartbeat opens its own channels, independent of transfers
    let heartbeat = if config.heartbeat.enabled {
        let ticker = HeartbeatTicker::new(
            config.heartbeat.clone(),
            Arc::clone(&connector),
            config.endpoint.ping_resource.clone(),
        );
        ticker.start().await;
        Some(ticker)
    } else {
        info!("Heartbeat disabled in config");
        None
    };

    let resolver = MetadataResolver::new(&config.watcher.read_dir, config.routing.clone());
    let (queue_handle, queue) = file_queue(ReadinessGate::new(config.readiness.clone()), resolver);

    let watcher = DirectoryWatcher::watch(&config.watcher.read_dir, queue_handle)
        .context("Failed to watch inbox")?;
    // Attached first so nothing lands unseen; the queue drops the duplicates.
    if config.watcher.scan_existing_on_start {
        watcher
            .scan_existing()
            .context("Failed to scan existing files")?;
    }

    let orchestrator = TransferOrchestrator::new(
        Arc::clone(&connector),
        config.endpoint.ping_resource.clone(),
        template,
        config.transfer.clone(),
    );
    let archiver: Arc<dyn Archiver> = Arc::new(FsArchiver::new(config.archive.clone()));
    info!("Archiving delivered files to {}", config.archive.done_dir.display());

    let courier = Courier::new(queue, orchestrator, archiver);
    let cancel = CancellationToken::new();
    let courier_task = tokio::spawn(courier.run(cancel.clone()));

    shutdown_signal().await;
    info!("Shutdown signal received");

    cancel.cancel();
    match courier_task.await {
        Ok(stats) => info!(
            "Delivered {} files ({} aborted, {} failed, {} errors)",
            stats.archived, stats.aborted, stats.failed, stats.errors
        ),
        Err(e) => warn!("Courier task ended abnormally: {}", e),
    }

    if let Some(ticker) = heartbeat {
        ticker.stop().await;
    }
    drop(watcher);

    info!("Stopped");
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
