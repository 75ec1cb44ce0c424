use crate::types::AVAILABLE_INSTRUMENTS;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Which upstream transport carries the price stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedTransportKind {
    /// Server-sent events over HTTP.
    Sse,
    /// WebSocket subscription.
    Ws,
}

impl FromStr for FeedTransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sse" | "http" => Ok(Self::Sse),
            "ws" | "websocket" => Ok(Self::Ws),
            other => Err(format!("unknown feed transport: {}", other)),
        }
    }
}

/// Rolling statistics parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsConfig {
    /// Samples required before gameplay may begin.
    pub required_samples: usize,
    /// Maximum number of prices kept in history.
    pub max_history_length: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            required_samples: 15,
            max_history_length: 30,
        }
    }
}

/// Difficulty multiplier range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyConfig {
    pub base: f64,
    pub max: f64,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self { base: 1.0, max: 2.0 }
    }
}

/// Terrain speed limits and price-driven modulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainConfig {
    /// Speed restored on every new run.
    pub initial_speed: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    /// Step applied per price tick while playing.
    pub speed_change_factor: f64,
    /// Obstacle height scaling per unit of volatility.
    pub volatility_scalar: f64,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            initial_speed: 15.0,
            min_speed: 5.0,
            max_speed: 30.0,
            speed_change_factor: 0.5,
            volatility_scalar: 10.0,
        }
    }
}

/// Reconnect-with-backoff policy for the price feed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl ReconnectPolicy {
    /// Delay before the next attempt, or `None` once the budget is spent.
    ///
    /// `attempt` is the number of reconnects already scheduled since the last
    /// successful connection.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let delay = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Some(Duration::from_millis(delay))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
        }
    }
}

/// Session controller parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub difficulty: DifficultyConfig,
    pub terrain: TerrainConfig,
    /// Settle delay before auto-advancing from the start screen.
    pub auto_advance_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            difficulty: DifficultyConfig::default(),
            terrain: TerrainConfig::default(),
            auto_advance_delay: Duration::from_millis(500),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Upstream transport.
    pub feed_transport: FeedTransportKind,
    /// Base URL of the server-sent price stream.
    pub hermes_url: String,
    /// WebSocket URL of the price stream.
    pub hermes_ws_url: String,
    /// Instrument streamed at startup.
    pub default_instrument: String,
    pub stats: StatsConfig,
    pub session: SessionConfig,
    pub reconnect: ReconnectPolicy,
    /// Cadence of the host frame loop.
    pub frame_interval: Duration,
    /// Whether switching instrument discards collected price history.
    pub reset_history_on_instrument_change: bool,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let stats = StatsConfig::default();
        let difficulty = DifficultyConfig::default();
        let terrain = TerrainConfig::default();
        let reconnect = ReconnectPolicy::default();

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("PORT", 3030),
            feed_transport: env_or("FEED_TRANSPORT", FeedTransportKind::Sse),
            hermes_url: env::var("HERMES_URL")
                .unwrap_or_else(|_| "https://hermes.pyth.network".to_string()),
            hermes_ws_url: env::var("HERMES_WS_URL")
                .unwrap_or_else(|_| "wss://hermes.pyth.network/ws".to_string()),
            default_instrument: env::var("DEFAULT_INSTRUMENT")
                .unwrap_or_else(|_| AVAILABLE_INSTRUMENTS[0].0.to_string()),
            stats: StatsConfig {
                required_samples: env_or("REQUIRED_PRICE_SAMPLES", stats.required_samples),
                max_history_length: env_or("MAX_HISTORY_LENGTH", stats.max_history_length),
            },
            session: SessionConfig {
                difficulty: DifficultyConfig {
                    base: env_or("BASE_DIFFICULTY", difficulty.base),
                    max: env_or("MAX_DIFFICULTY_MULTIPLIER", difficulty.max),
                },
                terrain: TerrainConfig {
                    initial_speed: env_or("INITIAL_TERRAIN_SPEED", terrain.initial_speed),
                    min_speed: env_or("MIN_TERRAIN_SPEED", terrain.min_speed),
                    max_speed: env_or("MAX_TERRAIN_SPEED", terrain.max_speed),
                    speed_change_factor: env_or("SPEED_CHANGE_FACTOR", terrain.speed_change_factor),
                    volatility_scalar: env_or("TERRAIN_VOLATILITY_SCALAR", terrain.volatility_scalar),
                },
                auto_advance_delay: Duration::from_millis(env_or("AUTO_ADVANCE_DELAY_MS", 500)),
            },
            reconnect: ReconnectPolicy {
                max_attempts: env_or("MAX_RECONNECT_ATTEMPTS", reconnect.max_attempts),
                base_delay_ms: env_or("RECONNECT_BASE_DELAY_MS", reconnect.base_delay_ms),
                max_delay_ms: env_or("RECONNECT_MAX_DELAY_MS", reconnect.max_delay_ms),
            },
            frame_interval: Duration::from_millis(env_or("FRAME_INTERVAL_MS", 16)),
            reset_history_on_instrument_change: env_flag(
                "RESET_HISTORY_ON_INSTRUMENT_CHANGE",
                false,
            ),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3030,
            feed_transport: FeedTransportKind::Sse,
            hermes_url: "https://hermes.pyth.network".to_string(),
            hermes_ws_url: "wss://hermes.pyth.network/ws".to_string(),
            default_instrument: AVAILABLE_INSTRUMENTS[0].0.to_string(),
            stats: StatsConfig::default(),
            session: SessionConfig::default(),
            reconnect: ReconnectPolicy::default(),
            frame_interval: Duration::from_millis(16),
            reset_history_on_instrument_change: false,
        }
    }
}
