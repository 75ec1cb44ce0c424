//! Price feed connector.
//!
//! Keeps exactly one live subscription to a [`QuoteTransport`] for the
//! selected instrument, normalizes payloads into [`PriceTick`]s and recovers
//! from transport failures with a bounded exponential backoff.

use super::{lock, read, write};
use crate::config::ReconnectPolicy;
use crate::error::FeedError;
use crate::sources::QuoteTransport;
use crate::types::{ConnectionState, FeedEvent, FeedStatus, PriceTick};
use futures_util::StreamExt;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Status and event fan-out shared with the supervising task.
///
/// Every write is tagged with the generation of the subscription that made
/// it; writes from a superseded subscription are discarded under the same
/// lock that `start`/`stop` use to bump the generation.
struct Shared {
    inner: RwLock<SharedInner>,
    events: mpsc::UnboundedSender<FeedEvent>,
}

struct SharedInner {
    generation: u64,
    status: FeedStatus,
}

impl Shared {
    /// Retire the current generation and install a fresh status.
    fn begin_generation(&self, status: FeedStatus) -> u64 {
        let mut inner = write(&self.inner);
        inner.generation += 1;
        let changed = inner.status != status;
        inner.status = status;
        if changed {
            let _ = self.events.send(FeedEvent::Status(inner.status.clone()));
        }
        inner.generation
    }

    /// Update the status if `generation` is still current. Returns false for a
    /// superseded subscription.
    fn update(&self, generation: u64, f: impl FnOnce(&mut FeedStatus)) -> bool {
        let mut inner = write(&self.inner);
        if inner.generation != generation {
            return false;
        }
        f(&mut inner.status);
        self.events
            .send(FeedEvent::Status(inner.status.clone()))
            .is_ok()
    }

    /// Deliver an event if `generation` is still current.
    fn emit(&self, generation: u64, event: FeedEvent) -> bool {
        let inner = read(&self.inner);
        inner.generation == generation && self.events.send(event).is_ok()
    }

    fn status(&self) -> FeedStatus {
        read(&self.inner).status.clone()
    }
}

struct Subscription {
    instrument_id: String,
    handle: JoinHandle<()>,
}

/// Maintains a single subscription and delivers [`FeedEvent`]s to its consumer.
pub struct PriceFeedConnector {
    transport: Arc<dyn QuoteTransport>,
    policy: ReconnectPolicy,
    shared: Arc<Shared>,
    active: Mutex<Option<Subscription>>,
}

impl PriceFeedConnector {
    /// Create a connector and the receiving end of its event stream.
    pub fn new(
        transport: Arc<dyn QuoteTransport>,
        policy: ReconnectPolicy,
    ) -> (Self, mpsc::UnboundedReceiver<FeedEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Self {
            transport,
            policy,
            shared: Arc::new(Shared {
                inner: RwLock::new(SharedInner {
                    generation: 0,
                    status: FeedStatus::disconnected(),
                }),
                events: tx,
            }),
            active: Mutex::new(None),
        };
        (connector, rx)
    }

    /// Subscribe to `instrument_id`.
    ///
    /// A no-op while a subscription for the same instrument is still live
    /// (connecting, streaming or waiting to reconnect). A subscription for a
    /// different instrument is torn down first, cancelling any in-flight
    /// attempt or pending reconnect timer. After the retry budget is spent,
    /// calling `start` again resumes with a fresh budget.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, instrument_id: &str) {
        let mut active = lock(&self.active);

        if let Some(sub) = active.as_ref() {
            if sub.instrument_id == instrument_id && !sub.handle.is_finished() {
                debug!(
                    "Price feed for {} already active, ignoring start",
                    instrument_id
                );
                return;
            }
        }

        if let Some(sub) = active.take() {
            info!("Tearing down price feed for {}", sub.instrument_id);
            sub.handle.abort();
        }

        let generation = self.shared.begin_generation(FeedStatus {
            state: ConnectionState::Connecting,
            instrument_id: Some(instrument_id.to_string()),
            attempt_count: 0,
            backoff_delay_ms: None,
            last_error: None,
        });

        let handle = tokio::spawn(supervise(
            self.transport.clone(),
            self.policy,
            self.shared.clone(),
            generation,
            instrument_id.to_string(),
        ));

        *active = Some(Subscription {
            instrument_id: instrument_id.to_string(),
            handle,
        });
    }

    /// Close the active subscription and cancel any pending reconnect.
    /// Safe to call any number of times.
    pub fn stop(&self) {
        let mut active = lock(&self.active);
        if let Some(sub) = active.take() {
            info!("Closing price feed for {}", sub.instrument_id);
            sub.handle.abort();
        }
        self.shared.begin_generation(FeedStatus::disconnected());
    }

    /// Current connector status.
    pub fn status(&self) -> FeedStatus {
        self.shared.status()
    }

    /// Instrument of the live subscription, if any.
    pub fn instrument_id(&self) -> Option<String> {
        lock(&self.active).as_ref().map(|sub| sub.instrument_id.clone())
    }

    /// Name of the underlying transport.
    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }
}

impl Drop for PriceFeedConnector {
    fn drop(&mut self) {
        let active = self
            .active
            .get_mut()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(sub) = active.take() {
            sub.handle.abort();
        }
    }
}

/// Connection loop for one subscription generation.
async fn supervise(
    transport: Arc<dyn QuoteTransport>,
    policy: ReconnectPolicy,
    shared: Arc<Shared>,
    generation: u64,
    instrument_id: String,
) {
    let mut attempt_count: u32 = 0;
    let mut previous_price: Option<f64> = None;

    loop {
        if !shared.update(generation, |s| {
            s.state = ConnectionState::Connecting;
            s.attempt_count = attempt_count;
            s.backoff_delay_ms = None;
        }) {
            return;
        }
        info!(
            "Establishing {} price feed for {}",
            transport.name(),
            instrument_id
        );

        let failure = match transport.connect(&instrument_id).await {
            Ok(mut stream) => {
                attempt_count = 0;
                shared.update(generation, |s| {
                    s.state = ConnectionState::Streaming;
                    s.attempt_count = 0;
                    s.last_error = None;
                });
                info!("Price feed for {} established", instrument_id);

                loop {
                    match stream.next().await {
                        Some(Ok(payload)) => match transport.parse(&payload) {
                            Ok(Some(quote)) => {
                                let tick = PriceTick::from_quote(quote, previous_price);
                                previous_price = Some(quote.price);
                                let event = FeedEvent::Tick {
                                    instrument_id: instrument_id.clone(),
                                    tick,
                                };
                                if !shared.emit(generation, event) {
                                    return;
                                }
                            }
                            Ok(None) => {}
                            Err(e) => {
                                warn!("Dropping malformed price message: {}", e);
                                shared.emit(generation, FeedEvent::Error(e));
                            }
                        },
                        Some(Err(e)) => break e,
                        None => break FeedError::StreamError("stream ended".to_string()),
                    }
                }
            }
            Err(e) => e,
        };

        error!("Price feed for {} failed: {}", instrument_id, failure);
        if !shared.emit(generation, FeedEvent::Error(failure.clone())) {
            return;
        }

        match policy.delay_for(attempt_count) {
            Some(delay) => {
                shared.update(generation, |s| {
                    s.state = ConnectionState::Reconnecting;
                    s.attempt_count = attempt_count;
                    s.backoff_delay_ms = Some(delay.as_millis() as u64);
                    s.last_error = Some(failure.to_string());
                });
                info!("Attempting to reconnect in {:?}", delay);
                tokio::time::sleep(delay).await;
                attempt_count += 1;
            }
            None => {
                warn!(
                    "Max reconnection attempts ({}) reached, giving up on {}",
                    policy.max_attempts, instrument_id
                );
                shared.update(generation, |s| {
                    s.state = ConnectionState::Failed;
                    s.attempt_count = attempt_count;
                    s.backoff_delay_ms = None;
                    s.last_error = Some(failure.to_string());
                });
                return;
            }
        }
    }
}
