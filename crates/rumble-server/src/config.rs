use serde::Deserialize;

use rumble_core::{DEFAULT_HIT_TOLERANCE, MAX_SESSIONS};

/// Top-level server configuration, loaded from `rumble.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub web_root: String,
    pub limits: LimitsConfig,
    pub combat: CombatConfig,
    pub liveness: LivenessConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            web_root: "public".to_string(),
            limits: LimitsConfig::default(),
            combat: CombatConfig::default(),
            liveness: LivenessConfig::default(),
        }
    }
}

/// Infrastructure limits (session/connection caps, buffers, rate limits).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum concurrent sessions in the arena. Joins beyond this are
    /// rejected, not queued.
    pub max_sessions: usize,
    /// Raw WebSocket connection cap, checked before the upgrade.
    pub max_ws_connections: usize,
    /// Per-connection inbound message rate (token bucket).
    pub ws_rate_limit_per_sec: f64,
    /// Outbound per-player channel depth before slow clients drop messages.
    pub player_message_buffer: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_sessions: MAX_SESSIONS,
            max_ws_connections: 64,
            ws_rate_limit_per_sec: 60.0,
            player_message_buffer: 256,
        }
    }
}

/// Combat rule tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Lag-compensation slack for hit validation, in world units.
    pub hit_tolerance: f32,
    pub friendly_fire: bool,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            hit_tolerance: DEFAULT_HIT_TOLERANCE,
            friendly_fire: false,
        }
    }
}

/// Heartbeat eviction settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LivenessConfig {
    /// A session silent for longer than this is force-removed.
    pub timeout_secs: u64,
    /// How often the eviction sweep runs.
    pub sweep_interval_secs: u64,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            sweep_interval_secs: 5,
        }
    }
}

impl ServerConfig {
    /// Validate configuration, exiting on values the server cannot run with.
    pub fn validate(&self) {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            tracing::error!(
                addr = %self.listen_addr,
                "listen_addr is not a valid socket address"
            );
            std::process::exit(1);
        }
        if self.limits.max_sessions == 0 {
            tracing::error!("limits.max_sessions must be > 0");
            std::process::exit(1);
        }
        if self.limits.max_ws_connections == 0 {
            tracing::error!("limits.max_ws_connections must be > 0");
            std::process::exit(1);
        }
        if self.limits.ws_rate_limit_per_sec <= 0.0 {
            tracing::error!("limits.ws_rate_limit_per_sec must be > 0");
            std::process::exit(1);
        }
        if self.limits.player_message_buffer == 0 {
            tracing::error!("limits.player_message_buffer must be > 0");
            std::process::exit(1);
        }
        if self.combat.hit_tolerance <= 0.0 {
            tracing::error!("combat.hit_tolerance must be > 0");
            std::process::exit(1);
        }
        if self.liveness.timeout_secs == 0 {
            tracing::error!("liveness.timeout_secs must be > 0");
            std::process::exit(1);
        }
        if self.liveness.sweep_interval_secs == 0 {
            tracing::error!("liveness.sweep_interval_secs must be > 0");
            std::process::exit(1);
        }
    }

    /// Load config from `rumble.toml` if it exists, then apply env overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("rumble.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from rumble.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse rumble.toml: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No rumble.toml found, using defaults");
                ServerConfig::default()
            },
        };

        if let Ok(addr) = std::env::var("RUMBLE_LISTEN_ADDR")
            && !addr.is_empty()
        {
            config.listen_addr = addr;
        }
        // Hosting platforms commonly hand out the port alone.
        if let Ok(port) = std::env::var("PORT")
            && let Ok(n) = port.parse::<u16>()
        {
            config.listen_addr = format!("0.0.0.0:{n}");
        }
        if let Ok(root) = std::env::var("RUMBLE_WEB_ROOT")
            && !root.is_empty()
        {
            config.web_root = root;
        }
        if let Ok(val) = std::env::var("RUMBLE_MAX_SESSIONS")
            && let Ok(n) = val.parse::<usize>()
        {
            config.limits.max_sessions = n;
        }
        if let Ok(val) = std::env::var("RUMBLE_WS_RATE_LIMIT")
            && let Ok(n) = val.parse::<f64>()
        {
            config.limits.ws_rate_limit_per_sec = n;
        }
        if let Ok(val) = std::env::var("RUMBLE_HIT_TOLERANCE")
            && let Ok(n) = val.parse::<f32>()
        {
            config.combat.hit_tolerance = n;
        }

        config
    }
}
