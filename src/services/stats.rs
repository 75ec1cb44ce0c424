//! Streaming statistics over the live price feed.
//!
//! Every function here is total and side-effect free so it can be called from
//! the feed handler or the frame loop without coordination.

use crate::types::VolatilityState;

/// Average tick-over-tick change that saturates the volatility scale (5%).
const VOLATILITY_SCALE: f64 = 20.0;

/// Calculate the exponential moving average of `history`.
///
/// The first `period` prices seed the average as a simple mean; the rest are
/// folded in with `k = 2 / (period + 1)`. `period` is clamped to the history
/// length.
pub fn compute_ema(history: &[f64], period: usize) -> f64 {
    match history {
        [] => 0.0,
        [only] => *only,
        _ => {
            let period = period.clamp(1, history.len());
            let multiplier = 2.0 / (period as f64 + 1.0);

            let sma = history.iter().take(period).sum::<f64>() / period as f64;

            history
                .iter()
                .skip(period)
                .fold(sma, |ema, price| price * multiplier + ema * (1.0 - multiplier))
        }
    }
}

/// Normalized volatility in [0, 1] from the mean absolute percentage change
/// between consecutive prices.
///
/// Pairs whose earlier price is zero have no defined percentage change and are
/// left out of the mean.
pub fn compute_volatility(history: &[f64]) -> f64 {
    if history.len() < 2 {
        return 0.0;
    }

    let (sum, count) = history
        .windows(2)
        .filter(|pair| pair[0] != 0.0)
        .map(|pair| ((pair[1] - pair[0]) / pair[0]).abs())
        .fold((0.0, 0usize), |(sum, count), change| (sum + change, count + 1));

    if count == 0 {
        return 0.0;
    }

    let avg_change = sum / count as f64;
    (avg_change * VOLATILITY_SCALE).clamp(0.0, 1.0)
}

/// Linear interpolation from `base` to `max` by `volatility`.
///
/// The result is not re-clamped; callers pass a volatility already in [0, 1].
pub fn compute_difficulty(volatility: f64, base: f64, max: f64) -> f64 {
    base + (max - base) * volatility
}

/// Fold one price into a volatility state, returning the replacement state.
///
/// History keeps the newest `max_history_length` prices. Readiness latches:
/// once set it stays set for the lifetime of the state chain.
pub fn ingest(
    state: &VolatilityState,
    price: f64,
    required_samples: usize,
    max_history_length: usize,
) -> VolatilityState {
    let mut price_history = Vec::with_capacity(state.price_history.len() + 1);
    price_history.extend_from_slice(&state.price_history);
    price_history.push(price);

    if price_history.len() > max_history_length {
        let excess = price_history.len() - max_history_length;
        price_history.drain(..excess);
    }

    let ema = compute_ema(&price_history, required_samples.min(price_history.len()));
    let volatility = compute_volatility(&price_history);
    let is_ready = state.is_ready || price_history.len() >= required_samples;

    VolatilityState {
        price_history,
        ema,
        volatility,
        is_ready,
    }
}
