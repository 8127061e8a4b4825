use serde::Deserialize;

/// Top-level server configuration, loaded from `doodlechain.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub limits: LimitsConfig,
    pub rooms: RoomsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            limits: LimitsConfig::default(),
            rooms: RoomsConfig::default(),
        }
    }
}

/// Infrastructure limits (connection caps, buffer sizes).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    /// Outbound frame buffer per connection; full buffers are skipped
    /// during broadcast rather than awaited.
    pub player_message_buffer: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 200,
            player_message_buffer: 64,
        }
    }
}

/// Room reclamation settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    /// How long a fully disconnected room may linger before the
    /// janitor reclaims it.
    pub stale_timeout_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            stale_timeout_secs: 30 * 60,
            sweep_interval_secs: 5 * 60,
        }
    }
}

impl ServerConfig {
    /// Validate configuration, exiting on unusable values.
    pub fn validate(&self) {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            tracing::error!(
                addr = %self.listen_addr,
                "listen_addr is not a valid socket address"
            );
            std::process::exit(1);
        }
        if self.limits.max_ws_connections == 0 {
            tracing::error!("limits.max_ws_connections must be > 0");
            std::process::exit(1);
        }
        if self.limits.player_message_buffer == 0 {
            tracing::error!("limits.player_message_buffer must be > 0");
            std::process::exit(1);
        }
        if self.rooms.stale_timeout_secs == 0 {
            tracing::error!("rooms.stale_timeout_secs must be > 0");
            std::process::exit(1);
        }
        if self.rooms.sweep_interval_secs == 0 {
            tracing::error!("rooms.sweep_interval_secs must be > 0");
            std::process::exit(1);
        }
    }

    /// Load config from `doodlechain.toml` if it exists, then apply
    /// env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("doodlechain.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from doodlechain.toml");
                    cfg
                }
                Err(e) => {
                    tracing::warn!("Failed to parse doodlechain.toml: {e}, using defaults");
                    ServerConfig::default()
                }
            },
            Err(_) => {
                tracing::info!("No doodlechain.toml found, using defaults");
                ServerConfig::default()
            }
        };

        if let Ok(addr) = std::env::var("DOODLECHAIN_LISTEN_ADDR") {
            if !addr.is_empty() {
                config.listen_addr = addr;
            }
        }
        if let Ok(val) = std::env::var("DOODLECHAIN_MAX_WS_CONNECTIONS") {
            if let Ok(n) = val.parse::<usize>() {
                config.limits.max_ws_connections = n;
            }
        }
        if let Ok(val) = std::env::var("DOODLECHAIN_STALE_TIMEOUT_SECS") {
            if let Ok(n) = val.parse::<u64>() {
                config.rooms.stale_timeout_secs = n;
            }
        }
        if let Ok(val) = std::env::var("DOODLECHAIN_SWEEP_INTERVAL_SECS") {
            if let Ok(n) = val.parse::<u64>() {
                config.rooms.sweep_interval_secs = n;
            }
        }

        config
    }
}
