use std::time::Duration;

use link_organizer::server::{build_app, remove_port_file, shutdown_signal, write_port_file};
use link_organizer::utils::find_available_port;
use link_organizer::{AppConfig, AppState};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🚀 STARTUP: Starting link organizer server...");

    // Load configuration from environment
    let config = AppConfig::from_env();
    config.log_warnings();
    info!(
        "⚙️ STARTUP: Environment {:?}, database {}",
        config.environment,
        config
            .database
            .target()
            .map(|t| t.describe())
            .unwrap_or_else(|| "not configured".to_string())
    );

    let app_state = AppState::new(config.clone());

    let (listener, port) = find_available_port(
        &config.server_host,
        config.server_port,
        config.port_search_attempts,
    )?;
    app_state.set_bound_port(port);
    write_port_file(&config.port_file, port);

    // The server accepts requests while the database comes up
    let initialization = app_state.db.spawn_initialization(config.admin.clone());

    let app = build_app(app_state.clone());
    info!("✅ STARTUP: Server running on http://{}:{}", config.server_host, port);

    let shutdown_state = app_state.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_state.begin_shutdown();
            tokio::spawn(async {
                tokio::time::sleep(SHUTDOWN_GRACE).await;
                error!("❌ SHUTDOWN: Graceful shutdown took longer than {}s, exiting", SHUTDOWN_GRACE.as_secs());
                std::process::exit(1);
            });
        })
        .await;

    initialization.abort();
    app_state.db.close().await;
    remove_port_file(&config.port_file);

    if let Err(e) = served {
        error!("❌ SHUTDOWN: Server error: {}", e);
        return Err(e.into());
    }

    info!("👋 SHUTDOWN: Server stopped");
    Ok(())
}
