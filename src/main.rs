/// Tree analysis HTTP service.
///
/// POST /analyze takes a base64 image and returns per-tree species and health
/// attributes plus an annotated JPEG. The detector runs live against a hosted
/// inference API when one is configured and reachable, otherwise in degraded
/// stand-in mode (see GET /model-status).

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tree_analysis::{router, AppError, AppState, Config};

fn main() -> Result<(), AppError> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tree_analysis=info,tower_http=debug")),
        )
        .init();

    eprintln!("[STARTUP] Tree analysis service starting...");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .enable_all()
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build runtime: {e}")))?;

    eprintln!("[STARTUP] Tokio runtime configured: {} worker threads", num_cpus::get());

    runtime.block_on(async_main())
}

async fn async_main() -> Result<(), AppError> {
    let config = Config::from_env();
    info!("Port: {}", config.port);
    info!(
        "Detector URL: {}",
        config.detector_url.as_deref().unwrap_or("<none, stand-in mode>")
    );
    info!("Model call timeout: {:?}", config.model_timeout);
    info!("Detector fallback: {}", config.detector_fallback);

    let state = Arc::new(AppState::new(config.clone())?);

    // Models initialize on first use; warm them up so the mode is logged at startup.
    let mode = state.models().await.detector.mode();
    eprintln!("[STARTUP] Detector mode: {mode:?}");

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    eprintln!("[STARTUP] Server ready! Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    eprintln!("[SHUTDOWN] Server stopped");
    Ok(())
}
