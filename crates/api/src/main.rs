use std::sync::Arc;

use anyhow::Context;

use crmdesk_api::{app, config::ApiConfig};
use crmdesk_auth::Argon2Hasher;
use crmdesk_gate::AccessGate;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    crmdesk_observability::init();

    let config = ApiConfig::from_env().context("invalid configuration")?;
    tracing::info!(?config, "starting crmdesk api");

    let gate = app::services::build_gate(&config, Arc::new(Argon2Hasher::default()))
        .context("failed to initialise services")?;

    if config.session_ttl.is_some() {
        spawn_session_sweeper(gate.clone(), config.session_sweep_interval);
    }

    let app = app::build_app(gate);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shut down");
    Ok(())
}

/// Periodically drop expired sessions so idle ones don't accumulate.
fn spawn_session_sweeper(gate: Arc<AccessGate>, every: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let purged = gate.purge_expired_sessions();
            if purged > 0 {
                tracing::debug!(purged, "expired sessions purged");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
