//! Game session state machine.
//!
//! The controller is driven by three inputs: explicit actions from the UI or
//! physics layer, market observations from the feed handler, and frame
//! callbacks from the render loop. Time is always passed in, never read, so
//! every transition is reproducible in tests.

use crate::config::SessionConfig;
use crate::types::{PriceTick, SessionPhase, SessionSnapshot};
use std::time::Instant;
use tracing::{debug, info};

/// Finite-state machine for a single game session.
#[derive(Debug, Clone)]
pub struct SessionController {
    config: SessionConfig,
    phase: SessionPhase,
    score: u64,
    terrain_speed: f64,
    difficulty_multiplier: f64,
    floor_proximity_bonus: f64,
    /// Latched readiness of the price history.
    ready: bool,
    /// Price of the previous tick, for direction-based speed changes.
    last_price: Option<f64>,
    /// Time of the previous frame callback while playing.
    last_frame_at: Option<Instant>,
    /// Pending auto-advance out of `Start`.
    advance_at: Option<Instant>,
}

impl SessionController {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            phase: SessionPhase::Start,
            score: 0,
            terrain_speed: config.terrain.initial_speed,
            difficulty_multiplier: config.difficulty.base,
            floor_proximity_bonus: 0.0,
            ready: false,
            last_price: None,
            last_frame_at: None,
            advance_at: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn terrain_speed(&self) -> f64 {
        self.terrain_speed
    }

    pub fn difficulty_multiplier(&self) -> f64 {
        self.difficulty_multiplier
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Whether an auto-advance out of `Start` is scheduled.
    pub fn auto_advance_pending(&self) -> bool {
        self.advance_at.is_some()
    }

    /// Terrain speed after difficulty scaling; zero unless playing.
    pub fn effective_terrain_speed(&self) -> f64 {
        let multiplier = if self.phase == SessionPhase::Playing {
            self.difficulty_multiplier
        } else {
            0.0
        };
        self.terrain_speed * multiplier
    }

    /// `Start -> Instructions` on an explicit begin action.
    pub fn begin(&mut self) -> bool {
        if self.phase != SessionPhase::Start {
            return false;
        }
        self.transition(SessionPhase::Instructions);
        true
    }

    /// `Instructions -> Playing`, gated on readiness.
    pub fn enter(&mut self, now: Instant) -> bool {
        if self.phase != SessionPhase::Instructions || !self.ready {
            debug!("Ignoring enter in {} (ready: {})", self.phase, self.ready);
            return false;
        }
        self.start_run(now);
        true
    }

    /// `Playing -> GameOver` on a collision signal.
    pub fn collide(&mut self) -> bool {
        if self.phase != SessionPhase::Playing {
            return false;
        }
        self.transition(SessionPhase::GameOver);
        info!("Game over with score {}", self.score);
        true
    }

    /// `GameOver -> Playing`, gated on readiness. Market history is kept.
    pub fn restart(&mut self, now: Instant) -> bool {
        if self.phase != SessionPhase::GameOver || !self.ready {
            debug!("Ignoring restart in {} (ready: {})", self.phase, self.ready);
            return false;
        }
        self.start_run(now);
        true
    }

    /// Record the floor-proximity bonus reported by the flight physics.
    pub fn set_floor_proximity_bonus(&mut self, bonus: f64) {
        if bonus.is_finite() {
            self.floor_proximity_bonus = bonus.max(0.0);
        }
    }

    /// Apply one market observation.
    ///
    /// Updates readiness and difficulty, schedules the auto-advance when the
    /// history first becomes ready on the start screen, and while playing
    /// moves terrain speed against the price direction.
    pub fn observe_market(
        &mut self,
        tick: &PriceTick,
        ready: bool,
        difficulty_multiplier: f64,
        now: Instant,
    ) {
        self.difficulty_multiplier = difficulty_multiplier;

        if ready && !self.ready {
            self.ready = true;
            info!("Price history ready");
        }
        if self.ready && self.phase == SessionPhase::Start && self.advance_at.is_none() {
            self.advance_at = Some(now + self.config.auto_advance_delay);
        }

        if self.phase == SessionPhase::Playing {
            if let Some(last) = self.last_price {
                let terrain = &self.config.terrain;
                if tick.price > last {
                    self.terrain_speed =
                        (self.terrain_speed - terrain.speed_change_factor).max(terrain.min_speed);
                } else if tick.price < last {
                    self.terrain_speed =
                        (self.terrain_speed + terrain.speed_change_factor).min(terrain.max_speed);
                }
            }
        }

        self.last_price = Some(tick.price);
    }

    /// Forget the previous price, e.g. after an instrument switch.
    pub fn reset_price_reference(&mut self) {
        self.last_price = None;
    }

    /// Fire the auto-advance if its settle delay has elapsed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.advance_at {
            Some(at) if self.phase == SessionPhase::Start && now >= at => {
                self.transition(SessionPhase::Instructions);
                true
            }
            _ => false,
        }
    }

    /// One render-loop callback. Returns the score added by this frame.
    ///
    /// Scoring uses the wall-clock time since the previous callback, so it is
    /// independent of the frame rate.
    pub fn frame(&mut self, now: Instant) -> u64 {
        self.poll(now);

        if self.phase != SessionPhase::Playing {
            return 0;
        }

        let last = self.last_frame_at.replace(now).unwrap_or(now);
        let elapsed_ms = now.saturating_duration_since(last).as_secs_f64() * 1000.0;
        if elapsed_ms <= 0.0 {
            return 0;
        }

        let base_increment = (self.effective_terrain_speed() * elapsed_ms / 100.0).floor();
        let increment = (base_increment * (1.0 + self.floor_proximity_bonus)).floor();
        let increment = if increment.is_finite() && increment > 0.0 {
            increment as u64
        } else {
            0
        };

        self.score = self.score.saturating_add(increment);
        increment
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            score: self.score,
            terrain_speed: self.terrain_speed,
            effective_terrain_speed: self.effective_terrain_speed(),
            difficulty_multiplier: self.difficulty_multiplier,
            floor_proximity_bonus: self.floor_proximity_bonus,
            ready: self.ready,
        }
    }

    fn start_run(&mut self, now: Instant) {
        self.score = 0;
        self.terrain_speed = self.config.terrain.initial_speed;
        self.floor_proximity_bonus = 0.0;
        self.last_frame_at = Some(now);
        self.transition(SessionPhase::Playing);
    }

    fn transition(&mut self, next: SessionPhase) {
        info!("Session {} -> {}", self.phase, next);
        self.phase = next;
        if next != SessionPhase::Start {
            self.advance_at = None;
        }
    }
}
