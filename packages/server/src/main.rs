//! Encoding job service binary.

use std::time::Duration;

use api::ServiceConfig;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// How long shutdown waits for running encodes.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Install the global subscriber. `RUST_LOG` overrides the `info` default;
/// `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = ServiceConfig::from_env()?;
    let engine = api::init_service(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, api::router(engine.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    match tokio::time::timeout(DRAIN_TIMEOUT, engine.drain()).await {
        Ok(Ok(())) => tracing::info!("Shutdown complete"),
        Ok(Err(e)) => tracing::warn!("Drain failed: {}", e),
        Err(_) => tracing::warn!("Drain timed out after {:?}", DRAIN_TIMEOUT),
    }

    Ok(())
}
