pub mod config;
pub mod health;
pub mod registry;
pub mod server;
pub mod state;
pub mod ws;

use std::time::Duration;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use config::ServerConfig;
use state::AppState;

/// Build the Axum router and application state from a config.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let web_root = config.web_root.clone();
    let state = AppState::new(config);

    let app = Router::new()
        .route("/ws", axum::routing::get(ws::ws_handler))
        .route("/health", axum::routing::get(health::health_check))
        .fallback_service(ServeDir::new(&web_root))
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    (app, state)
}

/// Background task that periodically evicts sessions silent past the
/// liveness timeout. Ticks forever; eviction goes through the same
/// disconnect path as a socket close.
pub fn spawn_liveness_sweep(state: AppState) {
    let timeout = Duration::from_secs(state.config.liveness.timeout_secs);
    let interval = Duration::from_secs(state.config.liveness.sweep_interval_secs);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let evicted = {
                let mut game = state.game.write().await;
                game.evict_stale(timeout)
            };
            if evicted > 0 {
                tracing::info!(evicted, "Liveness sweep evicted stale sessions");
            }
        }
    });
}
