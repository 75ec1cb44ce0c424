//! Terminal console for driving and watching a game session.

mod app;
mod events;
mod game;
mod market;
mod theme;

pub use app::run_tui;
pub use theme::Theme;

/// Route/View enum for navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Game,
    Market,
}

impl Route {
    /// Get all available routes.
    pub fn all() -> Vec<Self> {
        vec![Self::Game, Self::Market]
    }

    /// Get the route name.
    pub fn name(&self) -> &str {
        match self {
            Self::Game => "Game",
            Self::Market => "Market",
        }
    }

    /// Get the route shortcut key.
    pub fn key(&self) -> char {
        match self {
            Self::Game => '1',
            Self::Market => '2',
        }
    }
}
