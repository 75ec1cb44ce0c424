//! Game engine hub.
//!
//! Wires the price feed connector, the statistics engine and the session
//! controller together and exposes the outbound contract consumed by the
//! rendering, physics and UI layers.

use super::feed::PriceFeedConnector;
use super::session::SessionController;
use super::stats::{compute_difficulty, ingest};
use super::{lock, read, write};
use crate::config::Config;
use crate::sources::QuoteTransport;
use crate::types::{
    FeedEvent, FeedStatus, GameAction, GameSnapshot, Instrument, PriceTick, ServerMessage,
    TerrainParams, VolatilityState,
};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Market-facing state that is neither statistics nor session.
struct MarketView {
    instrument: Instrument,
    last_tick: Option<PriceTick>,
    feed: FeedStatus,
}

/// Owns all core state and the feed connector.
///
/// `VolatilityState` and the session each sit behind their own lock; locks
/// are never held across an await or nested.
pub struct GameEngine {
    config: Arc<Config>,
    volatility: RwLock<VolatilityState>,
    session: Mutex<SessionController>,
    market: RwLock<MarketView>,
    connector: PriceFeedConnector,
    updates: broadcast::Sender<ServerMessage>,
}

impl GameEngine {
    /// Create an engine. Feed events must be pumped through [`GameEngine::run`].
    pub fn new(
        config: Arc<Config>,
        transport: Arc<dyn QuoteTransport>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<FeedEvent>) {
        let (connector, feed_rx) = PriceFeedConnector::new(transport, config.reconnect);
        let (updates, _) = broadcast::channel(256);

        let engine = Arc::new(Self {
            volatility: RwLock::new(VolatilityState::new()),
            session: Mutex::new(SessionController::new(config.session)),
            market: RwLock::new(MarketView {
                instrument: Instrument::resolve(&config.default_instrument),
                last_tick: None,
                feed: FeedStatus::disconnected(),
            }),
            connector,
            updates,
            config,
        });

        (engine, feed_rx)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Subscribe to state and feed updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.updates.subscribe()
    }

    /// Start streaming the currently selected instrument.
    pub fn start_feed(&self) {
        let instrument = read(&self.market).instrument.clone();
        info!("Starting price feed for {} ({})", instrument, instrument.id);
        self.connector.start(&instrument.id);
    }

    /// Close the feed subscription.
    pub fn shutdown(&self) {
        self.connector.stop();
    }

    /// Consume feed events in arrival order until the connector goes away.
    pub async fn run(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<FeedEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_feed_event(event, Instant::now());
        }
        debug!("Feed event channel closed");
    }

    /// Spawn the host frame loop at the configured cadence.
    pub fn spawn_frame_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let engine = self.clone();
        let period = self.config.frame_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                engine.frame(Instant::now());
            }
        })
    }

    pub fn handle_feed_event(&self, event: FeedEvent, now: Instant) {
        match event {
            FeedEvent::Tick {
                instrument_id,
                tick,
            } => {
                // Ticks queued before an instrument switch are still in flight
                if read(&self.market).instrument.id != instrument_id {
                    debug!("Dropping tick for deselected instrument {}", instrument_id);
                    return;
                }
                self.on_price_tick(tick, now);
            }
            FeedEvent::Status(status) => {
                write(&self.market).feed = status.clone();
                let _ = self.updates.send(ServerMessage::Feed { data: status });
            }
            FeedEvent::Error(e) => debug!("Feed reported: {}", e),
        }
    }

    /// Ingest one tick: statistics, then difficulty, then session. The tick
    /// is assumed to belong to the selected instrument; feed events are
    /// filtered in [`GameEngine::handle_feed_event`].
    pub fn on_price_tick(&self, tick: PriceTick, now: Instant) {
        let stats = self.config.stats;
        let difficulty = self.config.session.difficulty;

        let (volatility, is_ready) = {
            let mut state = write(&self.volatility);
            let next = ingest(
                &state,
                tick.price,
                stats.required_samples,
                stats.max_history_length,
            );
            let summary = (next.volatility, next.is_ready);
            *state = next;
            summary
        };

        let multiplier = compute_difficulty(volatility, difficulty.base, difficulty.max);
        lock(&self.session).observe_market(&tick, is_ready, multiplier, now);
        write(&self.market).last_tick = Some(tick);
    }

    /// One render-loop callback: fires the auto-advance, accumulates score
    /// and publishes the resulting snapshot.
    pub fn frame(&self, now: Instant) -> GameSnapshot {
        lock(&self.session).frame(now);
        let snapshot = self.snapshot();
        let _ = self.updates.send(ServerMessage::State {
            data: Box::new(snapshot.clone()),
        });
        snapshot
    }

    /// Apply an action. Returns false when it was not applicable in the
    /// current state; such requests are ignored.
    pub fn apply(&self, action: GameAction, now: Instant) -> bool {
        match action {
            GameAction::Begin => lock(&self.session).begin(),
            GameAction::Enter => lock(&self.session).enter(now),
            GameAction::Restart => lock(&self.session).restart(now),
            GameAction::Collision => lock(&self.session).collide(),
            GameAction::FloorProximity { bonus } => {
                lock(&self.session).set_floor_proximity_bonus(bonus);
                true
            }
            GameAction::SelectInstrument { instrument_id } => {
                self.select_instrument(&instrument_id)
            }
        }
    }

    /// Switch instruments: rebuilds the feed subscription and clears the
    /// latest price. History is kept unless configured otherwise.
    pub fn select_instrument(&self, instrument_id: &str) -> bool {
        let instrument = Instrument::resolve(instrument_id.trim());
        if instrument.id.is_empty() {
            return false;
        }

        {
            let mut market = write(&self.market);
            if market.instrument.id == instrument.id {
                return false;
            }
            info!("Selected instrument {} ({})", instrument, instrument.id);
            market.instrument = instrument.clone();
            market.last_tick = None;
        }

        lock(&self.session).reset_price_reference();
        if self.config.reset_history_on_instrument_change {
            *write(&self.volatility) = VolatilityState::new();
        }

        self.connector.start(&instrument.id);
        true
    }

    /// Consistent read of the outbound contract.
    pub fn snapshot(&self) -> GameSnapshot {
        let volatility_data = read(&self.volatility).clone();
        let session = lock(&self.session).snapshot();
        let market = read(&self.market);

        GameSnapshot {
            terrain: TerrainParams {
                speed: session.effective_terrain_speed,
                height_multiplier: 1.0
                    + volatility_data.volatility * self.config.session.terrain.volatility_scalar,
            },
            price_trend: market.last_tick.map(|t| t.trend()).unwrap_or(0.0),
            required_samples: self.config.stats.required_samples,
            instrument: market.instrument.clone(),
            price_data: market.last_tick,
            feed: market.feed.clone(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            volatility_data,
            session,
        }
    }

    /// Current connector status.
    pub fn feed_status(&self) -> FeedStatus {
        self.connector.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeedError;
    use crate::sources::RawStream;
    use crate::types::{Quote, SessionPhase, AVAILABLE_INSTRUMENTS};
    use futures_util::future::{self, BoxFuture};
    use futures_util::FutureExt;
    use std::time::Duration;

    /// Never finishes connecting.
    struct Idle;

    impl QuoteTransport for Idle {
        fn name(&self) -> &'static str {
            "idle"
        }

        fn connect(&self, _: &str) -> BoxFuture<'static, std::result::Result<RawStream, FeedError>> {
            future::pending().boxed()
        }

        fn parse(&self, _: &str) -> std::result::Result<Option<Quote>, FeedError> {
            Ok(None)
        }
    }

    fn engine() -> Arc<GameEngine> {
        GameEngine::new(Arc::new(Config::default()), Arc::new(Idle)).0
    }

    fn tick(price: f64, previous: Option<f64>) -> PriceTick {
        PriceTick::from_quote(
            Quote {
                price,
                publish_time: 1_700_000_000,
            },
            previous,
        )
    }

    fn feed_prices(engine: &GameEngine, prices: &[f64], now: Instant) {
        let mut previous = None;
        for &price in prices {
            engine.on_price_tick(tick(price, previous), now);
            previous = Some(price);
        }
    }

    #[test]
    fn test_initial_snapshot() {
        let engine = engine();
        let snapshot = engine.snapshot();

        assert_eq!(snapshot.session.phase, SessionPhase::Start);
        assert_eq!(snapshot.session.score, 0);
        assert_eq!(snapshot.terrain.speed, 0.0);
        assert_eq!(snapshot.terrain.height_multiplier, 1.0);
        assert_eq!(snapshot.price_trend, 0.0);
        assert!(snapshot.price_data.is_none());
        assert_eq!(snapshot.instrument.id, AVAILABLE_INSTRUMENTS[0].0);
    }

    #[test]
    fn test_ticks_flow_into_stats_and_session() {
        let engine = engine();
        let now = Instant::now();
        feed_prices(&engine, &[100.0, 102.0], now);

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.volatility_data.samples(), 2);
        assert!(snapshot.volatility_data.volatility > 0.0);
        assert!(snapshot.session.difficulty_multiplier > 1.0);
        assert!(snapshot.terrain.height_multiplier > 1.0);
        assert!(snapshot.price_trend > 0.0);
        assert_eq!(snapshot.price_data.map(|t| t.price), Some(102.0));
    }

    #[test]
    fn test_full_round_keeps_history_on_restart() {
        let engine = engine();
        let start = Instant::now();
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + (i % 3) as f64).collect();
        feed_prices(&engine, &prices, start);

        assert!(engine.snapshot().session.ready);
        engine.frame(start + Duration::from_millis(500));
        assert_eq!(engine.snapshot().session.phase, SessionPhase::Instructions);

        let playing_at = start + Duration::from_secs(1);
        assert!(engine.apply(GameAction::Enter, playing_at));
        let snapshot = engine.frame(playing_at + Duration::from_millis(100));
        assert!(snapshot.session.score > 0);

        assert!(engine.apply(GameAction::Collision, playing_at));
        let volatility_before = engine.snapshot().volatility_data;
        assert!(engine.apply(GameAction::Restart, playing_at));

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.session.phase, SessionPhase::Playing);
        assert_eq!(snapshot.session.score, 0);
        assert_eq!(snapshot.volatility_data, volatility_before);
    }

    #[test]
    fn test_inapplicable_actions_are_ignored() {
        let engine = engine();
        let now = Instant::now();

        assert!(!engine.apply(GameAction::Enter, now));
        assert!(!engine.apply(GameAction::Collision, now));
        assert!(!engine.apply(GameAction::Restart, now));
        assert!(engine.apply(GameAction::Begin, now));
        // Not ready yet.
        assert!(!engine.apply(GameAction::Enter, now));
        assert_eq!(engine.snapshot().session.phase, SessionPhase::Instructions);
    }

    #[tokio::test]
    async fn test_select_instrument_clears_latest_price() {
        let engine = engine();
        let now = Instant::now();
        feed_prices(&engine, &[100.0, 101.0], now);

        let eth = AVAILABLE_INSTRUMENTS[2].0.to_string();
        assert!(engine.apply(
            GameAction::SelectInstrument {
                instrument_id: eth.clone()
            },
            now
        ));

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.instrument.id, eth);
        assert!(snapshot.price_data.is_none());
        // History is kept by default.
        assert_eq!(snapshot.volatility_data.samples(), 2);

        assert!(!engine.apply(
            GameAction::SelectInstrument { instrument_id: eth },
            now
        ));
        engine.shutdown();
    }

    #[tokio::test]
    async fn test_select_instrument_can_reset_history() {
        let config = Config {
            reset_history_on_instrument_change: true,
            ..Config::default()
        };
        let (engine, _rx) = GameEngine::new(Arc::new(config), Arc::new(Idle));
        feed_prices(&engine, &[100.0, 101.0], Instant::now());

        assert!(engine.select_instrument(AVAILABLE_INSTRUMENTS[1].0));
        assert_eq!(engine.snapshot().volatility_data.samples(), 0);
        engine.shutdown();
    }

    #[tokio::test]
    async fn test_reset_history_keeps_latched_readiness_gate() {
        let config = Config {
            reset_history_on_instrument_change: true,
            ..Config::default()
        };
        let (engine, _rx) = GameEngine::new(Arc::new(config), Arc::new(Idle));
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + (i % 3) as f64).collect();
        feed_prices(&engine, &prices, Instant::now());
        assert!(engine.snapshot().session.ready);

        assert!(engine.select_instrument(AVAILABLE_INSTRUMENTS[1].0));
        let snapshot = engine.snapshot();
        assert!(snapshot.session.ready);
        assert!(!snapshot.volatility_data.is_ready);
        assert_eq!(snapshot.sample_progress(), (15, 15));
        engine.shutdown();
    }

    #[tokio::test]
    async fn test_frame_broadcasts_state() {
        let engine = engine();
        let mut updates = engine.subscribe();

        engine.frame(Instant::now());

        match updates.recv().await {
            Ok(ServerMessage::State { data }) => assert_eq!(data.session.phase, SessionPhase::Start),
            other => panic!("unexpected update: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_status_events_update_snapshot() {
        let engine = engine();
        let mut updates = engine.subscribe();

        let status = FeedStatus {
            state: crate::types::ConnectionState::Failed,
            instrument_id: Some("abc".to_string()),
            attempt_count: 3,
            backoff_delay_ms: None,
            last_error: Some("boom".to_string()),
        };
        engine.handle_feed_event(FeedEvent::Status(status.clone()), Instant::now());

        assert!(engine.snapshot().feed.is_unavailable());
        match updates.recv().await {
            Ok(ServerMessage::Feed { data }) => assert_eq!(data, status),
            other => panic!("unexpected update: {:?}", other),
        }
    }

    /// Streams two prices for the default instrument and hangs for any other.
    struct DefaultOnly;

    impl QuoteTransport for DefaultOnly {
        fn name(&self) -> &'static str {
            "default-only"
        }

        fn connect(&self, instrument_id: &str) -> BoxFuture<'static, std::result::Result<RawStream, FeedError>> {
            use futures_util::{stream, StreamExt};

            if instrument_id != AVAILABLE_INSTRUMENTS[0].0 {
                return future::pending().boxed();
            }
            let payloads: RawStream = stream::iter(vec![Ok("60000".to_string()), Ok("60010".to_string())])
                .chain(stream::pending())
                .boxed();
            future::ready(Ok(payloads)).boxed()
        }

        fn parse(&self, payload: &str) -> std::result::Result<Option<Quote>, FeedError> {
            payload
                .parse()
                .map(|price| {
                    Some(Quote {
                        price,
                        publish_time: 0,
                    })
                })
                .map_err(|_| FeedError::MalformedTick(payload.to_string()))
        }
    }

    #[test]
    fn test_ticks_for_other_instrument_are_dropped() {
        let engine = engine();
        let now = Instant::now();
        let eth = AVAILABLE_INSTRUMENTS[2].0;

        engine.handle_feed_event(
            FeedEvent::Tick {
                instrument_id: eth.to_string(),
                tick: tick(3000.0, None),
            },
            now,
        );
        let snapshot = engine.snapshot();
        assert!(snapshot.price_data.is_none());
        assert_eq!(snapshot.volatility_data.samples(), 0);

        engine.handle_feed_event(
            FeedEvent::Tick {
                instrument_id: AVAILABLE_INSTRUMENTS[0].0.to_string(),
                tick: tick(60000.0, None),
            },
            now,
        );
        assert_eq!(engine.snapshot().price_data.map(|t| t.price), Some(60000.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_ticks_do_not_survive_instrument_switch() {
        let (engine, mut events) =
            GameEngine::new(Arc::new(Config::default()), Arc::new(DefaultOnly));

        engine.start_feed();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(engine.select_instrument(AVAILABLE_INSTRUMENTS[2].0));
        tokio::time::sleep(Duration::from_millis(10)).await;

        let now = Instant::now();
        let mut queued_ticks = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, FeedEvent::Tick { .. }) {
                queued_ticks += 1;
            }
            engine.handle_feed_event(event, now);
        }

        assert_eq!(queued_ticks, 2);
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.instrument.id, AVAILABLE_INSTRUMENTS[2].0);
        assert!(snapshot.price_data.is_none());
        assert!(snapshot.volatility_data.price_history.is_empty());
        engine.shutdown();
    }
}
