mod app;
mod config;
mod routes;
mod services;
mod state;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::state::{AppState, BootstrapPayload};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let data_dir = config::data_dir();
    let bootstrap = match services::bootstrap_loader::load(&data_dir).await {
        Ok(bootstrap) => bootstrap,
        Err(e) => {
            tracing::error!(error = %e, data_dir = %data_dir.display(), "failed to load map data");
            return;
        }
    };

    let http_client = match state::build_http_client() {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "failed to build HTTP client");
            return;
        }
    };

    let layers =
        services::layer_loader::load_all(&http_client, &data_dir, &bootstrap.config.geo_layers)
            .await;
    let payload = match BootstrapPayload::new(&bootstrap) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize map bootstrap");
            return;
        }
    };

    let state = AppState::new(payload, layers);
    if state.layers_failed() > 0 {
        tracing::warn!(
            loaded = state.layers_loaded(),
            failed = state.layers_failed(),
            "some geo layers are unavailable"
        );
    }

    let app = app::build_app(state);

    let addr = format!("0.0.0.0:{}", config::server_port());
    tracing::info!("Choropleth map server listening on {addr}");

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
