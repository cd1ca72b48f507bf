pub mod api;
pub mod capture;
pub mod config;
pub mod form;
pub mod pipeline;
pub mod session;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::{start_api_server, ApiContext, ServerError};
use crate::capture::UnavailableCamera;
use crate::config::{AppConfig, ConfigError};
use crate::pipeline::extraction::{ExtractionClient, ExtractionError, HttpExtractionClient};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("OCR client setup failed: {0}")]
    Client(#[from] ExtractionError),
    #[error("Failed to start async runtime: {0}")]
    Runtime(std::io::Error),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error("Failed to listen for shutdown signal: {0}")]
    Signal(std::io::Error),
}

pub fn run() -> Result<(), StartupError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let app_config = AppConfig::from_env()?;
    tracing::info!(
        ocr_endpoint = %app_config.ocr_endpoint,
        timeout_secs = app_config.request_timeout_secs,
        bind = %app_config.bind_addr,
        "Configuration loaded"
    );

    // The blocking client must be built and dropped outside the runtime;
    // `extractor` outlives `runtime` below.
    let extractor: Arc<dyn ExtractionClient> =
        Arc::new(HttpExtractionClient::from_config(&app_config)?);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(StartupError::Runtime)?;

    let ctx = ApiContext::new(
        Arc::new(UnavailableCamera),
        Arc::clone(&extractor),
        app_config.clone(),
    );

    let result = runtime.block_on(async move {
        let server = start_api_server(ctx, app_config.bind_addr).await?;
        tracing::info!(addr = %server.addr(), "Ready. Press Ctrl+C to stop");

        let signal = tokio::signal::ctrl_c().await.map_err(StartupError::Signal);
        server.shutdown_and_wait().await;
        signal
    });

    drop(runtime);
    drop(extractor);
    tracing::info!("{} stopped", config::APP_NAME);
    result
}
