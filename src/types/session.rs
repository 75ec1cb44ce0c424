use super::{FeedStatus, Instrument, PriceTick, VolatilityState};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Game phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Start,
    Instructions,
    Playing,
    GameOver,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Start => write!(f, "start"),
            SessionPhase::Instructions => write!(f, "instructions"),
            SessionPhase::Playing => write!(f, "playing"),
            SessionPhase::GameOver => write!(f, "gameover"),
        }
    }
}

/// Requests from the surrounding UI, physics layer or a remote client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameAction {
    /// Leave the start screen.
    Begin,
    /// Start playing from the instructions screen.
    Enter,
    /// Play again after a game over.
    Restart,
    /// The ship hit an obstacle.
    Collision,
    /// Latest floor-proximity bonus from the flight physics.
    FloorProximity { bonus: f64 },
    /// Switch the streamed instrument.
    SelectInstrument { instrument_id: String },
}

/// Numeric contract the terrain generator must honor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerrainParams {
    /// Effective obstacle speed (zero outside `Playing`).
    pub speed: f64,
    /// Scale applied to generated obstacle heights.
    pub height_multiplier: f64,
}

/// Session controller view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub score: u64,
    pub terrain_speed: f64,
    pub effective_terrain_speed: f64,
    pub difficulty_multiplier: f64,
    pub floor_proximity_bonus: f64,
    /// Latched once the history first fills; stays set if the history is
    /// later reset, unlike `VolatilityState::is_ready`.
    pub ready: bool,
}

/// Everything the rendering, physics and UI collaborators consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    #[serde(flatten)]
    pub session: SessionSnapshot,
    pub terrain: TerrainParams,
    pub price_trend: f64,
    pub volatility_data: VolatilityState,
    pub required_samples: usize,
    pub instrument: Instrument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_data: Option<PriceTick>,
    pub feed: FeedStatus,
    pub timestamp: i64,
}

impl GameSnapshot {
    /// Collected-sample progress for the readiness gate, e.g. `(7, 15)`.
    /// Reports a full gate once the session has latched ready.
    pub fn sample_progress(&self) -> (usize, usize) {
        let collected = if self.session.ready {
            self.required_samples
        } else {
            self.volatility_data.samples().min(self.required_samples)
        };
        (collected, self.required_samples)
    }
}
