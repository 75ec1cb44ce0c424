//! Pyth Hermes price message formats.
//!
//! Both the server-sent event stream and the WebSocket API carry the same
//! price object: an integer mantissa as a string plus a base-10 exponent.

use crate::error::FeedError;
use crate::types::Quote;
use serde::{Deserialize, Serialize};

/// Raw Hermes price object.
#[derive(Debug, Deserialize)]
pub struct HermesPrice {
    /// Integer mantissa, serialized as a string.
    pub price: String,
    #[serde(default)]
    pub conf: Option<String>,
    pub expo: i32,
    pub publish_time: i64,
}

impl HermesPrice {
    /// Apply the exponent to the mantissa.
    pub fn to_quote(&self) -> Result<Quote, FeedError> {
        let mantissa: f64 = self
            .price
            .parse()
            .map_err(|_| FeedError::MalformedTick(format!("bad mantissa: {:?}", self.price)))?;
        let price = mantissa * 10f64.powi(self.expo);
        if !price.is_finite() {
            return Err(FeedError::MalformedTick(format!(
                "non-finite price from {} * 10^{}",
                self.price, self.expo
            )));
        }
        Ok(Quote {
            price,
            publish_time: self.publish_time,
        })
    }
}

/// One parsed feed entry.
#[derive(Debug, Deserialize)]
pub struct HermesPriceFeed {
    pub id: String,
    pub price: HermesPrice,
}

/// Server-sent event payload.
#[derive(Debug, Deserialize)]
pub struct StreamPayload {
    #[serde(default)]
    pub parsed: Vec<HermesPriceFeed>,
}

/// WebSocket subscribe request.
#[derive(Debug, Serialize)]
pub struct SubscribeMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub ids: Vec<String>,
}

impl SubscribeMessage {
    pub fn subscribe(instrument_id: &str) -> Self {
        Self {
            msg_type: "subscribe".to_string(),
            ids: vec![instrument_id.to_string()],
        }
    }
}

/// WebSocket message from Hermes.
#[derive(Debug, Deserialize)]
pub struct WsMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default)]
    pub price_feed: Option<HermesPriceFeed>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Parse a server-sent event payload. `Ok(None)` means the payload held no
/// price entry.
pub fn parse_stream_payload(text: &str) -> Result<Option<Quote>, FeedError> {
    let payload: StreamPayload =
        serde_json::from_str(text).map_err(|e| FeedError::MalformedTick(e.to_string()))?;

    payload
        .parsed
        .first()
        .map(|feed| feed.price.to_quote())
        .transpose()
}

/// Parse a WebSocket message. Acknowledgements and other non-price messages
/// yield `Ok(None)`.
pub fn parse_ws_message(text: &str) -> Result<Option<Quote>, FeedError> {
    let msg: WsMessage =
        serde_json::from_str(text).map_err(|e| FeedError::MalformedTick(e.to_string()))?;

    if msg.msg_type != "price_update" {
        return Ok(None);
    }

    match msg.price_feed {
        Some(feed) => feed.price.to_quote().map(Some),
        None => Err(FeedError::MalformedTick(
            "price_update without price_feed".to_string(),
        )),
    }
}

/// Longest line the decoder will buffer before giving up on the stream.
pub const MAX_SSE_LINE_BYTES: usize = 1 << 20;

/// Incremental decoder for a server-sent event byte stream.
///
/// Collects `data:` lines until the blank line that terminates an event.
/// Bytes are buffered raw and only complete lines are decoded, so UTF-8
/// sequences split across chunks survive.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning every event payload it completes.
    ///
    /// Fails once an unterminated line exceeds [`MAX_SSE_LINE_BYTES`].
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, FeedError> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if !self.data.is_empty() {
                    events.push(self.data.join("\n"));
                    self.data.clear();
                }
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
            }
            // Comments (":") and other fields (event, id, retry) are ignored.
        }

        if self.buffer.len() > MAX_SSE_LINE_BYTES {
            self.buffer.clear();
            return Err(FeedError::StreamError(format!(
                "event stream line exceeds {} bytes",
                MAX_SSE_LINE_BYTES
            )));
        }

        Ok(events)
    }
}
