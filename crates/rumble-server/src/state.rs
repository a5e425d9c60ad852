use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use tokio::sync::RwLock;

use crate::config::ServerConfig;
use crate::server::GameServer;

pub type SharedGameServer = Arc<RwLock<GameServer>>;

#[derive(Clone)]
pub struct AppState {
    pub game: SharedGameServer,
    pub config: Arc<ServerConfig>,
    pub ws_connection_count: Arc<AtomicUsize>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let game = GameServer::new(&config);
        Self {
            game: Arc::new(RwLock::new(game)),
            config: Arc::new(config),
            ws_connection_count: Arc::new(AtomicUsize::new(0)),
            started_at: Instant::now(),
        }
    }
}

/// RAII guard for the raw WebSocket connection count.
pub struct ConnectionGuard {
    count: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    pub fn new(count: Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::Relaxed);
        Self { count }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::Relaxed);
    }
}
