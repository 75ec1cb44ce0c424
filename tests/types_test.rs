//! Unit tests for types module

use space_surfer::types::*;

// ============================================================================
// Price Tests
// ============================================================================

#[test]
fn test_first_tick_has_no_change() {
    let tick = PriceTick::from_quote(
        Quote {
            price: 50.0,
            publish_time: 10,
        },
        None,
    );

    assert_eq!(tick.previous_price, 50.0);
    assert_eq!(tick.price_change, 0.0);
    assert_eq!(tick.price_change_percent, 0.0);
    assert_eq!(tick.direction(), TradeDirection::Flat);
}

#[test]
fn test_tick_from_zero_previous_price() {
    let tick = PriceTick::from_quote(
        Quote {
            price: 5.0,
            publish_time: 0,
        },
        Some(0.0),
    );

    assert_eq!(tick.price_change, 5.0);
    assert_eq!(tick.price_change_percent, 0.0);
    assert_eq!(tick.direction(), TradeDirection::Up);
}

#[test]
fn test_trend_saturates() {
    let quote = |price| Quote {
        price,
        publish_time: 0,
    };

    assert_eq!(PriceTick::from_quote(quote(120.0), Some(100.0)).trend(), 1.0);
    assert_eq!(PriceTick::from_quote(quote(80.0), Some(100.0)).trend(), -1.0);
    let small = PriceTick::from_quote(quote(101.0), Some(100.0)).trend();
    assert!((small - 0.2).abs() < 1e-9);
}

#[test]
fn test_price_tick_serialization() {
    let tick = PriceTick::from_quote(
        Quote {
            price: 102.0,
            publish_time: 1717000000,
        },
        Some(100.0),
    );
    let json = serde_json::to_value(tick).unwrap();

    assert_eq!(json["price"], 102.0);
    assert_eq!(json["previousPrice"], 100.0);
    assert_eq!(json["priceChange"], 2.0);
    assert_eq!(json["timestamp"], 1717000000);
}

// ============================================================================
// Instrument Tests
// ============================================================================

#[test]
fn test_instrument_resolve() {
    let btc = Instrument::resolve(AVAILABLE_INSTRUMENTS[0].0);
    assert_eq!(btc.name, "BTC");
    assert_eq!(btc.to_string(), "BTC/USD");

    let upper = Instrument::resolve(&AVAILABLE_INSTRUMENTS[1].0.to_uppercase());
    assert_eq!(upper.name, "SOL");

    let custom = Instrument::resolve("0xabc");
    assert_eq!(custom.id, "0xabc");
    assert_eq!(custom.name, "CUSTOM");
}

#[test]
fn test_instrument_cycle() {
    let all = Instrument::all();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].next(), all[1]);
    assert_eq!(all[2].next(), all[0]);
    assert_eq!(Instrument::resolve("0xabc").next(), all[0]);
}

// ============================================================================
// Session & Action Tests
// ============================================================================

#[test]
fn test_session_phase_display() {
    assert_eq!(SessionPhase::Start.to_string(), "start");
    assert_eq!(SessionPhase::GameOver.to_string(), "gameover");
    assert_eq!(
        serde_json::to_string(&SessionPhase::GameOver).unwrap(),
        "\"game_over\""
    );
}

#[test]
fn test_game_action_deserialization() {
    let action: GameAction = serde_json::from_str(r#"{"type":"begin"}"#).unwrap();
    assert_eq!(action, GameAction::Begin);

    let action: GameAction =
        serde_json::from_str(r#"{"type":"floor_proximity","bonus":0.25}"#).unwrap();
    assert_eq!(action, GameAction::FloorProximity { bonus: 0.25 });

    let action: GameAction =
        serde_json::from_str(r#"{"type":"select_instrument","instrument_id":"0xabc"}"#).unwrap();
    assert_eq!(
        action,
        GameAction::SelectInstrument {
            instrument_id: "0xabc".to_string()
        }
    );

    assert!(serde_json::from_str::<GameAction>(r#"{"type":"jump"}"#).is_err());
}

// ============================================================================
// Feed & Message Tests
// ============================================================================

#[test]
fn test_feed_status_serialization() {
    let status = FeedStatus {
        state: ConnectionState::Reconnecting,
        instrument_id: Some("0xabc".to_string()),
        attempt_count: 1,
        backoff_delay_ms: Some(2000),
        last_error: None,
    };
    let json = serde_json::to_value(&status).unwrap();

    assert_eq!(json["state"], "reconnecting");
    assert_eq!(json["attemptCount"], 1);
    assert_eq!(json["backoffDelayMs"], 2000);
    assert!(json.get("lastError").is_none());
    assert!(!status.is_unavailable());
}

#[test]
fn test_server_message_serialization() {
    let ack = ServerMessage::Ack { accepted: true };
    assert_eq!(ack.to_json(), r#"{"type":"ack","accepted":true}"#);

    let feed = ServerMessage::Feed {
        data: FeedStatus::disconnected(),
    };
    let json: serde_json::Value = serde_json::from_str(&feed.to_json()).unwrap();
    assert_eq!(json["type"], "feed");
    assert_eq!(json["data"]["state"], "disconnected");
}

#[test]
fn test_game_snapshot_flattens_session() {
    let snapshot = GameSnapshot {
        session: SessionSnapshot {
            phase: SessionPhase::Instructions,
            score: 0,
            terrain_speed: 15.0,
            effective_terrain_speed: 0.0,
            difficulty_multiplier: 1.0,
            floor_proximity_bonus: 0.0,
            ready: false,
        },
        terrain: TerrainParams {
            speed: 0.0,
            height_multiplier: 1.0,
        },
        price_trend: 0.0,
        volatility_data: VolatilityState {
            price_history: vec![1.0; 7],
            ..VolatilityState::new()
        },
        required_samples: 15,
        instrument: Instrument::all()[0].clone(),
        price_data: None,
        feed: FeedStatus::disconnected(),
        timestamp: 0,
    };

    assert_eq!(snapshot.sample_progress(), (7, 15));

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["phase"], "instructions");
    assert_eq!(json["terrainSpeed"], 15.0);
    assert_eq!(json["volatilityData"]["isReady"], false);
    assert!(json.get("priceData").is_none());
}
