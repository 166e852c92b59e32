//! Service bootstrap.

use std::sync::Arc;

use actors::{Encoder, JobLifecycle, LoggingEncoder};

use crate::config::ServiceConfig;

/// Bind the process-wide storage and start the lifecycle engine with the
/// default [`LoggingEncoder`].
///
/// This should be called once at server startup before handling requests.
pub async fn init_service(config: &ServiceConfig) -> Result<JobLifecycle, Box<dyn std::error::Error>> {
    init_service_with(config, Arc::new(LoggingEncoder::new())).await
}

/// Like [`init_service`] with a caller-supplied encoder.
pub async fn init_service_with(
    config: &ServiceConfig,
    encoder: Arc<dyn Encoder>,
) -> Result<JobLifecycle, Box<dyn std::error::Error>> {
    tracing::info!("Initializing encoding service...");

    let storage = db::init(config.db.clone()).await?;
    storage.health().await?;
    tracing::info!("Storage ready: {}", storage.backend());

    let engine = JobLifecycle::start_with(storage, encoder, config.dispatcher.clone()).await?;

    tracing::info!("Encoding service initialized");
    Ok(engine)
}
