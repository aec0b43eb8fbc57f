use axum::Router;
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod config;
mod cors;
mod db;
mod gps_api;
mod model;
mod state;
mod upstream;

#[cfg(test)]
mod test_support;

use api::error::ApiError;
use config::Config;
use db::DBLayer;
use state::AppState;
use upstream::UpstreamClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------
    // Logging
    // -----------------------------
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!(
        maps_key_configured = config.google_maps_api_key.is_some(),
        upstream = %config.upstream_base_url,
        "Configuration loaded"
    );

    // -----------------------------
    // Shared state / Dependencies
    // -----------------------------
    let db = DBLayer::new(&config.dsn).await?;
    let upstream = UpstreamClient::new(
        &config.upstream_base_url,
        &config.onestepgps_api_key,
        config.upstream_timeout,
    )?;
    let state = AppState::new(db, upstream);

    let app = app(state, cors::cors_layer(&config.allowed_origins)?);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("HTTP listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Every route with its state attached, without transport middleware.
fn routes(state: AppState) -> Router {
    Router::new()
        .merge(api::router())
        .merge(gps_api::router())
        .fallback(|| async { ApiError::NotFound("not found".into()) })
        .with_state(state)
}

fn app(state: AppState, cors: CorsLayer) -> Router {
    routes(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install terminate handler: {e}");
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
