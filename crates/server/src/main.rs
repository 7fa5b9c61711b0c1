//! Gradecast server - student pass/fail prediction over HTTP
//!
//! Loads student records and the trained model (if any) at startup,
//! then serves prediction, health and metrics endpoints.

use anyhow::{Context, Result};
use gradecast_lib::{
    health::{components, HealthRegistry},
    observability::{ServiceMetrics, StructuredLogger},
    predictor::{load_predictor, Predictor},
    InMemoryStudentStore, PredictionService,
};
use gradecast_server::{api, config::ServerConfig};
use std::future::Future;
use std::sync::Arc;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::oneshot;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting gradecast-server");

    let config = ServerConfig::load()?;
    info!(instance = %config.instance_name, addr = %config.listen_addr(), "Server configured");

    let health_registry = HealthRegistry::new();
    health_registry.register(components::PREDICTOR).await;
    health_registry.register(components::STORE).await;

    let metrics = ServiceMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);

    let store = match &config.data_path {
        Some(path) => InMemoryStudentStore::load(path)
            .with_context(|| format!("Failed to load student data from {}", path.display()))?,
        None => InMemoryStudentStore::new(),
    };
    let store = Arc::new(store);
    metrics.set_students_stored(store.len() as i64);
    health_registry.set_healthy(components::STORE).await;

    let predictor = load_predictor(config.model_source().as_ref(), config.fallback_predictor());
    health_registry.report_predictor(&predictor).await;
    metrics.set_model_info(predictor.model_version(), predictor.kind().as_str());
    if predictor.is_fallback() {
        logger.log_model_fallback(predictor.model_version());
    }
    logger.log_startup(SERVICE_VERSION, predictor.model_version());

    let service = Arc::new(PredictionService::new(
        store.clone(),
        Arc::new(predictor),
        metrics.clone(),
        logger.clone(),
    ));
    let app_state = Arc::new(api::AppState::new(
        service,
        store.clone(),
        health_registry.clone(),
        metrics,
    ));

    let shutdown = shutdown_signal()?;
    health_registry.set_ready(true).await;

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let addr = config.listen_addr();
    let mut api_handle = tokio::spawn(async move {
        api::serve(&addr, app_state, async {
            let _ = shutdown_rx.await;
        })
        .await
    });

    // Wait for shutdown signal, or for the server to stop on its own
    let signalled = tokio::select! {
        reason = shutdown => Some(reason),
        exit = &mut api_handle => {
            logger.log_shutdown("API server stopped");
            report_server_exit(exit);
            None
        }
    };

    if let Some(reason) = signalled {
        logger.log_shutdown(reason);
        health_registry.set_ready(false).await;
        let _ = shutdown_tx.send(());
        report_server_exit(api_handle.await);
    }

    if let Some(path) = &config.data_path {
        store
            .persist(path)
            .with_context(|| format!("Failed to save student data to {}", path.display()))?;
        info!(path = %path.display(), "Student data saved");
    }

    info!("Shutting down");
    Ok(())
}

/// Install shutdown handlers; the returned future resolves on SIGINT or SIGTERM
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = &'static str>> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => "SIGINT received",
            _ = terminate.recv() => "SIGTERM received",
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = &'static str>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        "SIGINT received"
    })
}

fn report_server_exit(exit: Result<Result<()>, tokio::task::JoinError>) {
    match exit {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "API server exited with error"),
        Err(e) => error!(error = %e, "API server task panicked"),
    }
}
