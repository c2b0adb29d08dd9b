use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keyreel_core::{
    load_config, validate_config, ApimartClient, Assembler, FfmpegAssembler, GeminiImageClient,
    InMemorySessionRegistry, WorkflowOrchestrator,
};

use keyreel_server::api::create_router;
use keyreel_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("KEYREEL_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        version = VERSION,
        config_hash = &config_hash[..16],
        stages = config.plan.len(),
        "Configuration loaded"
    );

    if config.public.base_url.is_none() {
        warn!("public.base_url is not set; providers will receive the fallback reference image");
    }
    if config.video_provider.api_key.is_empty() {
        warn!("video_provider.api_key is empty; video submissions will be rejected");
    }
    if config.image_provider.api_key.is_empty() {
        warn!("image_provider.api_key is empty; keyframe stages will fall back to the reference");
    }

    config
        .storage
        .ensure_dirs()
        .context("Failed to create storage directories")?;

    // External collaborators
    let provider = Arc::new(
        ApimartClient::new(config.video_provider.clone())
            .context("Failed to create video provider client")?,
    );
    let image_generator = Arc::new(
        GeminiImageClient::new(
            config.image_provider.clone(),
            config.storage.generated_images_dir.clone(),
        )
        .context("Failed to create image provider client")?,
    );
    let assembler = Arc::new(
        FfmpegAssembler::new(config.assembler.clone())
            .context("Failed to create assembler")?,
    );
    match assembler.validate().await {
        Ok(()) => info!("FFmpeg available"),
        Err(e) => warn!(error = %e, "FFmpeg check failed; assembly will fail until it is installed"),
    }

    let orchestrator = WorkflowOrchestrator::new(
        &config,
        Arc::new(InMemorySessionRegistry::new()),
        provider,
        image_generator,
        assembler,
    );

    let state = Arc::new(AppState::new(config.clone(), orchestrator.clone()));
    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    orchestrator.shutdown();
    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
    info!("Shutdown signal received");
}
