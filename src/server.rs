//! Router assembly and process lifecycle helpers.

use std::path::Path;

use axum::{http::HeaderValue, middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;

use crate::auth::middleware::{attach_error_detail, reject_during_shutdown};
use crate::routes::create_routes;
use crate::AppState;

pub fn build_app(state: AppState) -> Router {
    let mut router = create_routes();

    if state.config.apk_path.is_file() {
        tracing::info!("📦 STARTUP: Serving APK from {}", state.config.apk_path.display());
        router = router.route_service("/download/apk", ServeFile::new(&state.config.apk_path));
    }

    router
        .layer(middleware::from_fn_with_state(state.clone(), attach_error_detail))
        .layer(middleware::from_fn_with_state(state.clone(), reject_during_shutdown))
        .layer(cors_layer(&state.config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("⚠️ CONFIG: Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::permissive().allow_origin(allowed)
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("❌ SHUTDOWN: Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("❌ SHUTDOWN: Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("🛑 SHUTDOWN: Received Ctrl+C"),
        _ = terminate => tracing::info!("🛑 SHUTDOWN: Received SIGTERM"),
    }
}

/// Records the bound port so companion tooling can find the server.
pub fn write_port_file(path: &Path, port: u16) {
    match std::fs::write(path, port.to_string()) {
        Ok(()) => tracing::info!("📝 STARTUP: Port {} written to {}", port, path.display()),
        Err(e) => tracing::warn!("⚠️ STARTUP: Could not write port file {}: {}", path.display(), e),
    }
}

pub fn remove_port_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("⚠️ SHUTDOWN: Could not remove port file {}: {}", path.display(), e);
        }
    }
}
