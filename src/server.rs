use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use crate::api::{create_router, AppState};
use crate::config::AppConfig;
use crate::error::Result;
use crate::inference::Predictor;

/// Start the inference API server and block until shutdown.
pub async fn start_api_server(config: &AppConfig) -> Result<()> {
    let predictor = Arc::new(Predictor::new(config.model.candidate_paths.clone()));

    if predictor.locate_artifact().is_none() {
        // Not fatal: /health must stay up, and /predict reports the
        // remediation on first call.
        tracing::warn!(
            "no model artifact found yet; /predict will fail until `digitd train` has run"
        );
    }

    let app = create_router(AppState::new(predictor));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("inference API listening on http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
