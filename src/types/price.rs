use serde::{Deserialize, Serialize};
use std::fmt;

/// Price direction between two consecutive ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    Up,
    Down,
    Flat,
}

/// A decoded quote from the upstream stream, before normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    /// Quoted value with the exponent already applied.
    pub price: f64,
    /// Producer publish time (unix seconds).
    pub publish_time: i64,
}

/// A single normalized observation from the price feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTick {
    pub price: f64,
    pub previous_price: f64,
    pub price_change: f64,
    pub price_change_percent: f64,
    /// Producer-supplied publish time. Not guaranteed monotonic.
    pub timestamp: i64,
}

impl PriceTick {
    /// Build a tick from a quote and the previous quoted price, if any.
    ///
    /// The first tick of a subscription uses its own price as the previous
    /// price, so its change is zero.
    pub fn from_quote(quote: Quote, previous: Option<f64>) -> Self {
        let previous_price = previous.unwrap_or(quote.price);
        let price_change = quote.price - previous_price;
        let price_change_percent = if previous_price == 0.0 {
            0.0
        } else {
            price_change / previous_price * 100.0
        };

        Self {
            price: quote.price,
            previous_price,
            price_change,
            price_change_percent,
            timestamp: quote.publish_time,
        }
    }

    pub fn direction(&self) -> TradeDirection {
        if self.price > self.previous_price {
            TradeDirection::Up
        } else if self.price < self.previous_price {
            TradeDirection::Down
        } else {
            TradeDirection::Flat
        }
    }

    /// Background trend scalar in [-1, 1]; a 5% move saturates it.
    pub fn trend(&self) -> f64 {
        (self.price_change_percent / 5.0).clamp(-1.0, 1.0)
    }
}

/// A selectable market instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    /// Opaque upstream feed identifier.
    pub id: String,
    /// Display name.
    pub name: String,
}

impl Instrument {
    /// Resolve an id against the built-in list, falling back to a custom entry.
    pub fn resolve(id: &str) -> Self {
        AVAILABLE_INSTRUMENTS
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(id))
            .map(|(known, name)| Self {
                id: known.to_string(),
                name: name.to_string(),
            })
            .unwrap_or_else(|| Self {
                id: id.to_string(),
                name: "CUSTOM".to_string(),
            })
    }

    /// All built-in instruments.
    pub fn all() -> Vec<Self> {
        AVAILABLE_INSTRUMENTS
            .iter()
            .map(|(id, name)| Self {
                id: id.to_string(),
                name: name.to_string(),
            })
            .collect()
    }

    /// The built-in instrument following this one, wrapping around.
    pub fn next(&self) -> Self {
        let position = AVAILABLE_INSTRUMENTS
            .iter()
            .position(|(id, _)| *id == self.id)
            .map(|i| (i + 1) % AVAILABLE_INSTRUMENTS.len())
            .unwrap_or(0);
        let (id, name) = AVAILABLE_INSTRUMENTS[position];
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/USD", self.name)
    }
}

/// Pyth price feed ids for the instruments offered in the game.
pub const AVAILABLE_INSTRUMENTS: &[(&str, &str)] = &[
    (
        "0xe62df6c8b4a85fe1a67db44dc12de5db330f7ac66b72dc658afedf0f4a415b43",
        "BTC",
    ),
    (
        "0xef0d8b6fda2ceba41da15d4095d1da392a0d2f8ed0c6c7bc0f4cfac8c280b56d",
        "SOL",
    ),
    (
        "0xff61491a931112ddf1bd8147cd1b641375f79f5825126d665480874634fd0ace",
        "ETH",
    ),
];
