use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use reparto_geo::GeoCalculator;
use reparto_mesh::{EventHandlers, EventLoop};
use reparto_node::config::NodeConfig;
use reparto_node::state::AppState;
use reparto_node::transport::HttpPeerClient;
use reparto_node::{bootstrap, routes};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = NodeConfig::parse();
    tracing::info!(host = %config.host, port = config.port, "starting reparto node");

    let geo = GeoCalculator::new(config.influence_radius_km);
    let client = Arc::new(HttpPeerClient::new(Duration::from_secs(
        config.request_timeout_secs,
    ))?);
    let state = Arc::new(AppState::new(config.host.clone(), geo, client));

    bootstrap::join_mesh(&state, &config).await?;

    let handlers = Arc::new(EventHandlers::new(
        Arc::clone(&state.store),
        geo,
        Arc::clone(&state.propagator),
    ));
    let event_loop = EventLoop::new(Arc::clone(&state.queue), handlers)
        .with_tick(Duration::from_millis(config.tick_ms));
    let loop_task = event_loop.spawn();

    let app = routes::create_router(Arc::clone(&state));
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    loop_task.abort();
    tracing::info!("node shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };
    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }
}
