use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tracing::info;

use crate::config::settings::SettingsConfig;
use crate::facade::operations::Facade;
use crate::facade::routes;
use crate::observability::metrics::{get_metrics, Metrics};
use crate::observability::routes::MetricsState;

#[derive(Clone)]
pub struct AppState {
    pub facade: Arc<Facade>,
    pub metrics_state: MetricsState,
}

impl AppState {
    pub fn new(facade: Arc<Facade>, metrics: &Metrics) -> Self {
        Self {
            facade,
            metrics_state: MetricsState::new(metrics.registry.clone()),
        }
    }
}

pub fn router(settings_config: &SettingsConfig, state: AppState) -> Router {
    Router::new()
        .merge(routes::router())
        .merge(state.metrics_state.router(&settings_config.metrics))
        .with_state(state)
}

/// Serve the facade routes and metrics until a shutdown signal arrives.
pub async fn start(settings_config: &SettingsConfig, facade: Arc<Facade>) -> Result<()> {
    let metrics = get_metrics().await;
    let app = router(settings_config, AppState::new(facade, metrics));

    let bind_addr = format!("{}:{}", settings_config.server.host, settings_config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!(address = %bind_addr, "facade listening");

    metrics.up.set(1);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;
    metrics.up.set(0);

    info!("facade stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
