mod app;
mod config;
mod routes;
mod services;
mod state;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let state = AppState::new(config::geojson_path(), config::static_dir());

    // Load before accepting requests so the first page view has data.
    match services::dataset_loader::refresh(&state).await {
        Ok(services::dataset_loader::RefreshOutcome::Loaded { region_count, .. }) => {
            tracing::info!(
                region_count,
                path = %state.geojson_path.display(),
                "opportunity dataset loaded"
            );
        }
        Ok(_) => {
            tracing::warn!(
                path = %state.geojson_path.display(),
                "opportunity dataset not found; /data/opportunity.geojson will 404 until it appears"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, path = %state.geojson_path.display(), "failed to read dataset");
        }
    }

    // Spawn background services
    tokio::spawn(services::dataset_loader::run(state.clone()));

    let static_dir = state.static_dir.clone();
    let app = app::build_app(state);

    let addr = format!("0.0.0.0:{}", config::server_port());
    tracing::info!(static_dir = %static_dir.display(), "Opportunity Map server listening on {addr}");

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
