//! Upstream streaming quote sources.

pub mod hermes;
pub mod hermes_sse;
pub mod hermes_ws;

pub use hermes_sse::HermesSse;
pub use hermes_ws::HermesWs;

use crate::config::{Config, FeedTransportKind};
use crate::error::FeedError;
use crate::types::Quote;
use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use std::sync::Arc;

/// Raw text payloads from an open subscription. An `Err` item means the
/// stream broke; the connector closes it and applies the reconnect policy.
pub type RawStream = BoxStream<'static, Result<String, FeedError>>;

/// A per-instrument streaming quote source.
pub trait QuoteTransport: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Open a subscription for one instrument.
    fn connect(&self, instrument_id: &str) -> BoxFuture<'static, Result<RawStream, FeedError>>;

    /// Decode one payload. `Ok(None)` marks a payload that carries no quote.
    fn parse(&self, payload: &str) -> Result<Option<Quote>, FeedError>;
}

/// Build the transport selected in the configuration.
pub fn from_config(config: &Config) -> Arc<dyn QuoteTransport> {
    match config.feed_transport {
        FeedTransportKind::Sse => Arc::new(HermesSse::new(config.hermes_url.clone())),
        FeedTransportKind::Ws => Arc::new(HermesWs::new(config.hermes_ws_url.clone())),
    }
}
