//! Colors for the console.

use ratatui::style::{Color, Modifier, Style};
use space_surfer::types::{ConnectionState, SessionPhase, TradeDirection};

#[derive(Debug, Clone)]
pub struct Theme {
    pub primary: Color,
    pub secondary: Color,
    pub success: Color,
    pub warning: Color,
    pub danger: Color,
    pub muted: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: Color::Cyan,
            secondary: Color::Magenta,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
            muted: Color::DarkGray,
        }
    }
}

impl Theme {
    pub fn title(&self) -> Style {
        Style::default()
            .fg(self.primary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn header(&self) -> Style {
        Style::default()
            .fg(self.secondary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn muted(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn border(&self) -> Style {
        Style::default().fg(self.primary)
    }

    pub fn tab_active(&self) -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(self.primary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn tab_inactive(&self) -> Style {
        Style::default().fg(self.muted)
    }

    /// Price moves: green up, red down.
    pub fn direction(&self, direction: TradeDirection) -> Style {
        match direction {
            TradeDirection::Up => Style::default().fg(self.success),
            TradeDirection::Down => Style::default().fg(self.danger),
            TradeDirection::Flat => self.muted(),
        }
    }

    pub fn phase(&self, phase: SessionPhase) -> Style {
        let color = match phase {
            SessionPhase::Start | SessionPhase::Instructions => self.warning,
            SessionPhase::Playing => self.success,
            SessionPhase::GameOver => self.danger,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    pub fn connection(&self, state: ConnectionState) -> Style {
        let color = match state {
            ConnectionState::Streaming => self.success,
            ConnectionState::Connecting | ConnectionState::Reconnecting => self.warning,
            ConnectionState::Failed => self.danger,
            ConnectionState::Disconnected => self.muted,
        };
        Style::default().fg(color)
    }
}
