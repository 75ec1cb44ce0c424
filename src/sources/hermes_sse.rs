//! Hermes server-sent event price stream.

use super::hermes::{parse_stream_payload, SseDecoder};
use super::{QuoteTransport, RawStream};
use crate::error::FeedError;
use crate::types::Quote;
use futures_util::future::{self, BoxFuture};
use futures_util::{stream, FutureExt, StreamExt};
use tracing::info;

/// Streams parsed price updates over HTTP.
#[derive(Clone)]
pub struct HermesSse {
    client: reqwest::Client,
    base_url: String,
}

impl HermesSse {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Stream endpoint for one instrument.
    pub fn stream_url(&self) -> String {
        format!("{}/v2/updates/price/stream", self.base_url)
    }
}

impl QuoteTransport for HermesSse {
    fn name(&self) -> &'static str {
        "hermes-sse"
    }

    fn connect(&self, instrument_id: &str) -> BoxFuture<'static, Result<RawStream, FeedError>> {
        let request = self
            .client
            .get(self.stream_url())
            .query(&[("ids[]", instrument_id), ("parsed", "true")])
            .header(reqwest::header::ACCEPT, "text/event-stream");
        let instrument_id = instrument_id.to_string();

        async move {
            let response = request
                .send()
                .await
                .map_err(|e| FeedError::ConnectionFailed(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FeedError::ConnectionFailed(format!(
                    "price stream returned HTTP {}",
                    status
                )));
            }
            info!("Opened Hermes price stream for {}", instrument_id);

            let events = response
                .bytes_stream()
                .scan(SseDecoder::new(), |decoder, chunk| {
                    let items: Vec<Result<String, FeedError>> = match chunk {
                        Ok(bytes) => match decoder.push(&bytes) {
                            Ok(events) => events.into_iter().map(Ok).collect(),
                            Err(e) => vec![Err(e)],
                        },
                        Err(e) => vec![Err(FeedError::StreamError(e.to_string()))],
                    };
                    future::ready(Some(stream::iter(items)))
                })
                .flatten()
                .boxed();

            Ok(events)
        }
        .boxed()
    }

    fn parse(&self, payload: &str) -> Result<Option<Quote>, FeedError> {
        parse_stream_payload(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_url_strips_trailing_slash() {
        let source = HermesSse::new("https://hermes.example.com/".to_string());
        assert_eq!(
            source.stream_url(),
            "https://hermes.example.com/v2/updates/price/stream"
        );
    }
}
