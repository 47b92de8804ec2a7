use std::sync::Arc;

use anyhow::Context;
use certwatch_api::{config::CertwatchConfig, context::ApiContext, server};
use certwatch_db::storage::sqlite::{SqliteStorage, SqliteStorageOptions};
use certwatch_service::{
    CertificateManager, CertificateService,
    monitor::{MonitorConfig, spawn_expiry_monitor},
};
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CertwatchConfig::parse();

    if config.dump_openapi {
        let json = server::openapi().to_pretty_json()?;
        print!("{}", json);
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or(
            "certwatch_api=info,certwatch_service=info,certwatch_db=info".into(),
        ))
        .pretty()
        .init();

    let db_path = config.database_path();
    let storage = Arc::new(
        SqliteStorage::connect(
            SqliteStorageOptions::new(&db_path).query_timeout(config.query_timeout),
        )
        .await
        .with_context(|| format!("failed to open database at {}", db_path.display()))?,
    );

    let certificates: Arc<dyn CertificateService> =
        Arc::new(CertificateManager::new(storage.clone()));

    let shutdown = CancellationToken::new();
    let monitor = spawn_expiry_monitor(
        certificates.clone(),
        MonitorConfig {
            interval: config.expiry_check_interval,
            window: config.expiry_window,
        },
        shutdown.clone(),
    );

    let (router, _) = server::make(ApiContext::new(certificates, storage.clone()));

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!("Listening on http://{}", config.bind_addr);

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await;

    shutdown.cancel();
    match tokio::time::timeout(config.shutdown_timeout, monitor).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Expiry monitor exited abnormally"),
        Err(_) => warn!(
            timeout_secs = config.shutdown_timeout.as_secs(),
            "Expiry monitor did not stop in time"
        ),
    }

    storage.close().await;
    info!("Shutdown complete");

    served.context("server error")
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = cancel.cancelled() => {},
    }

    info!("Shutting down");
}
