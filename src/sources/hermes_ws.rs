//! Hermes WebSocket price subscription.

use super::hermes::{parse_ws_message, SubscribeMessage};
use super::{QuoteTransport, RawStream};
use crate::error::FeedError;
use crate::types::Quote;
use futures_util::future::{self, BoxFuture};
use futures_util::{FutureExt, SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info};

/// Streams price updates over a WebSocket subscription.
#[derive(Clone)]
pub struct HermesWs {
    url: String,
}

impl HermesWs {
    pub fn new(url: String) -> Self {
        Self { url }
    }
}

impl QuoteTransport for HermesWs {
    fn name(&self) -> &'static str {
        "hermes-ws"
    }

    fn connect(&self, instrument_id: &str) -> BoxFuture<'static, Result<RawStream, FeedError>> {
        let url = self.url.clone();
        let subscribe = SubscribeMessage::subscribe(instrument_id);

        async move {
            info!("Connecting to Hermes WebSocket");
            let (mut ws_stream, _) = connect_async(url.as_str())
                .await
                .map_err(|e| FeedError::ConnectionFailed(e.to_string()))?;

            let msg_json = serde_json::to_string(&subscribe)
                .map_err(|e| FeedError::ConnectionFailed(e.to_string()))?;
            ws_stream
                .send(Message::Text(msg_json))
                .await
                .map_err(|e| FeedError::ConnectionFailed(e.to_string()))?;
            info!("Subscribed to {:?} via Hermes WebSocket", subscribe.ids);

            // Pings are answered by tungstenite while the stream is polled.
            let frames = ws_stream
                .take_while(|msg| future::ready(!matches!(msg, Ok(Message::Close(_)))))
                .filter_map(|msg| {
                    future::ready(match msg {
                        Ok(Message::Text(text)) => Some(Ok(text)),
                        Ok(other) => {
                            debug!("Ignoring non-text frame: {:?}", other);
                            None
                        }
                        Err(e) => Some(Err(FeedError::StreamError(e.to_string()))),
                    })
                })
                .boxed();

            Ok(frames)
        }
        .boxed()
    }

    fn parse(&self, payload: &str) -> Result<Option<Quote>, FeedError> {
        parse_ws_message(payload)
    }
}
