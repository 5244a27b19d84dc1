mod app;
mod config;
mod fetch;
mod render;
mod routes;
mod services;
mod state;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::config::ClientIdentity;
use crate::fetch::{RateLimitedFetcher, TokioRetryScheduler};
use crate::services::planet_poller::PlanetPoller;
use crate::services::war_poller::WarStatisticsHandler;
use crate::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let state = match AppState::new() {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "failed to build upstream HTTP client");
            return;
        }
    };

    let base_url = config::api_base_url();
    let identity = ClientIdentity::from_env();
    tracing::info!(
        %base_url,
        client = %identity.client,
        contact = %identity.contact,
        "polling Helldivers 2 API"
    );

    let war_fetcher = RateLimitedFetcher::new(
        state.http_client.clone(),
        &base_url,
        identity.clone(),
        Arc::new(WarStatisticsHandler::new(Arc::new(state.clone()))),
        Arc::new(TokioRetryScheduler),
        Arc::clone(&state.observability),
    );
    let planet_poller = {
        let client = state.http_client.clone();
        let observability = Arc::clone(&state.observability);
        let base_url = base_url.clone();
        PlanetPoller::new(
            move |handler| {
                RateLimitedFetcher::new(
                    client,
                    &base_url,
                    identity,
                    handler,
                    Arc::new(TokioRetryScheduler),
                    observability,
                )
            },
            Arc::new(state.clone()),
            Arc::clone(&state.observability),
            config::planet_count(),
        )
    };

    // Spawn background pollers
    tokio::spawn(services::war_poller::run(
        war_fetcher,
        config::war_poll_interval(),
    ));
    tokio::spawn(planet_poller.run(config::planet_poll_interval()));

    let app = app::build_app(state);

    let addr = format!("0.0.0.0:{}", config::SERVER_PORT);
    tracing::info!("Helldivers hub listening on {addr}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind TCP listener");
            return;
        }
    };
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server failed");
    }

    tracing::info!("Server shut down gracefully");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
