//! Timer Deck - A state-managed countdown timer server
//!
//! This is the main entry point for the timer-deck application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use timer_deck::{
    api::create_router,
    config::Config,
    services::{JsonFileStore, LogNotifier},
    state::AppState,
    tasks::spawn_ticker,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("timer_deck={},tower_http=info", config.log_level()))
        .init();

    info!("Starting timer-deck server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, tick={}ms",
          config.host, config.port, config.tick_period().as_millis());

    let data_dir = config.resolve_data_dir()?;
    let store = Arc::new(JsonFileStore::open(&data_dir)?);
    info!("Data directory: {}", store.dir().display());

    // Create application state and its persistence writer
    let (state, writer) = AppState::new(store, Arc::new(LogNotifier), config.store_timeout());
    let state = Arc::new(state);
    let writer_task = tokio::spawn(writer.run());

    // Start the countdown ticker
    let ticker = spawn_ticker(Arc::clone(&state), config.tick_period());

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET    /timers                         - List timers");
    info!("  POST   /timers                         - Add a timer");
    info!("  POST   /timers/:id/:action             - start | pause | reset one timer");
    info!("  GET    /categories                     - List categories");
    info!("  POST   /categories/:name/toggle        - Expand or collapse a category");
    info!("  POST   /categories/:name/bulk/:action  - start | pause | reset a category");
    info!("  GET    /history                        - Completion log");
    info!("  DELETE /history                        - Clear completion log");
    info!("  GET    /events                         - Server-sent engine events");
    info!("  GET    /health                         - Health check");

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        result = shutdown_signal() => {
            if let Err(e) = result {
                tracing::error!("Signal handler error: {}", e);
            }
            info!("Shutdown signal received");
        }
    }

    // Stop ticking, then let the writer drain once the last state handle is gone
    ticker.shutdown().await;
    drop(state);
    match tokio::time::timeout(config.store_timeout(), writer_task).await {
        Ok(Err(e)) => tracing::error!("Persistence writer ended abnormally: {}", e),
        Err(_) => tracing::warn!("Persistence writer still busy at shutdown"),
        Ok(Ok(())) => {}
    }

    info!("Server shutdown complete");
    Ok(())
}
