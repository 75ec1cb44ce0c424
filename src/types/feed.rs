use super::PriceTick;
use crate::error::FeedError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of the price feed connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Streaming,
    Reconnecting,
    /// Retry budget exhausted; only a manual `start` resumes.
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Streaming => write!(f, "streaming"),
            ConnectionState::Reconnecting => write!(f, "reconnecting"),
            ConnectionState::Failed => write!(f, "failed"),
        }
    }
}

/// Observable connector state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedStatus {
    pub state: ConnectionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument_id: Option<String>,
    pub attempt_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl FeedStatus {
    pub fn disconnected() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            instrument_id: None,
            attempt_count: 0,
            backoff_delay_ms: None,
            last_error: None,
        }
    }

    /// True once the retry budget is spent and the feed is unavailable.
    pub fn is_unavailable(&self) -> bool {
        self.state == ConnectionState::Failed
    }
}

impl Default for FeedStatus {
    fn default() -> Self {
        Self::disconnected()
    }
}

/// Messages emitted by the connector to its consumer.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// A normalized tick, tagged with the instrument it was quoted for.
    Tick {
        instrument_id: String,
        tick: PriceTick,
    },
    Status(FeedStatus),
    Error(FeedError),
}
