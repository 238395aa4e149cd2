//! Timer Dashboard - A timer-management engine with optimistic updates
//!
//! This is the main entry point for the timer-dashboard server.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use timer_dashboard::{
    api::create_router,
    config::Config,
    engine::Dashboard,
    services::InMemoryGateway,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("timer_dashboard={},tower_http=info", config.log_level()))
        .init();

    info!("Starting timer-dashboard server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, tick={}ms, flush every {} ticks",
        config.host, config.port, config.tick_ms, config.flush_every
    );

    let gateway = if config.empty {
        InMemoryGateway::new(config.latency())
    } else {
        InMemoryGateway::with_demo_timers(config.latency())
    };

    // Mount the dashboard and run the initial load
    let dashboard = Dashboard::new(Arc::new(gateway), config.engine_settings());
    dashboard.mount().await?;

    let app = create_router(dashboard.clone());

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /dashboard          - Timers, stats and view state");
    info!("  POST /timers             - Create a timer");
    info!("  POST /timers/:id/start   - Start a timer");
    info!("  POST /timers/:id/pause   - Pause a timer");
    info!("  POST /bulk/start         - Start every paused timer");
    info!("  GET  /health             - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    dashboard.unmount();
    info!("Server shutdown complete");
    Ok(())
}
