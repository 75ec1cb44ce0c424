use serde::{Deserialize, Serialize};

/// Rolling statistical summary of the recent price stream.
///
/// Instances are replaced wholesale by
/// [`ingest`](crate::services::stats::ingest); nothing mutates one in place.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolatilityState {
    /// Raw prices, oldest first.
    pub price_history: Vec<f64>,
    /// Exponential moving average of `price_history` (0 when empty).
    pub ema: f64,
    /// Normalized volatility in [0, 1].
    pub volatility: f64,
    /// Latched once enough samples have been collected.
    pub is_ready: bool,
}

impl VolatilityState {
    /// An empty state, as at session start.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of samples currently held.
    pub fn samples(&self) -> usize {
        self.price_history.len()
    }

    /// Most recent price, if any.
    pub fn last_price(&self) -> Option<f64> {
        self.price_history.last().copied()
    }
}
