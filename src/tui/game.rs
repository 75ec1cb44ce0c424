//! Game view - session phase, score and terrain contract.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};
use space_surfer::types::{GameSnapshot, SessionPhase};

use super::Theme;

pub fn render(frame: &mut Frame, area: Rect, snapshot: &GameSnapshot, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Session
            Constraint::Length(3), // Readiness
            Constraint::Min(0),    // Terrain
        ])
        .split(area);

    render_session(frame, chunks[0], snapshot, theme);
    render_readiness(frame, chunks[1], snapshot, theme);
    render_terrain(frame, chunks[2], snapshot, theme);
}

fn prompt(phase: SessionPhase, ready: bool) -> &'static str {
    match phase {
        SessionPhase::Start => "Press space to begin",
        SessionPhase::Instructions if ready => "Press enter to play",
        SessionPhase::Instructions => "Collecting price samples...",
        SessionPhase::Playing => "Press x to crash",
        SessionPhase::GameOver => "Press r to play again",
    }
}

fn render_session(frame: &mut Frame, area: Rect, snapshot: &GameSnapshot, theme: &Theme) {
    let session = &snapshot.session;
    let lines = vec![
        Line::from(vec![
            Span::styled("Phase: ", theme.muted()),
            Span::styled(session.phase.to_string().to_uppercase(), theme.phase(session.phase)),
        ]),
        Line::from(vec![
            Span::styled("Score: ", theme.muted()),
            Span::styled(session.score.to_string(), theme.title()),
        ]),
        Line::from(vec![
            Span::styled("Instrument: ", theme.muted()),
            Span::raw(snapshot.instrument.to_string()),
        ]),
        Line::from(""),
        Line::from(Span::styled(prompt(session.phase, session.ready), theme.header())),
    ];

    let block = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Session")
            .border_style(theme.border()),
    );
    frame.render_widget(block, area);
}

fn render_readiness(frame: &mut Frame, area: Rect, snapshot: &GameSnapshot, theme: &Theme) {
    let (collected, required) = snapshot.sample_progress();
    let ratio = if snapshot.session.ready || required == 0 {
        1.0
    } else {
        collected as f64 / required as f64
    };
    let label = if snapshot.session.ready {
        "Ready".to_string()
    } else {
        format!("Collecting price data ({}/{})", collected, required)
    };

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Price History")
                .border_style(theme.border()),
        )
        .gauge_style(theme.phase(snapshot.session.phase))
        .ratio(ratio.clamp(0.0, 1.0))
        .label(label);
    frame.render_widget(gauge, area);
}

fn render_terrain(frame: &mut Frame, area: Rect, snapshot: &GameSnapshot, theme: &Theme) {
    let session = &snapshot.session;
    let row = |label: &'static str, value: String| {
        Line::from(vec![Span::styled(label, theme.muted()), Span::raw(value)])
    };

    let lines = vec![
        row("Terrain speed:      ", format!("{:.1}", session.terrain_speed)),
        row("Effective speed:    ", format!("{:.2}", snapshot.terrain.speed)),
        row("Difficulty:         ", format!("x{:.3}", session.difficulty_multiplier)),
        row("Height multiplier:  ", format!("x{:.3}", snapshot.terrain.height_multiplier)),
        row("Floor bonus:        ", format!("{:.2}", session.floor_proximity_bonus)),
        row("Background trend:   ", format!("{:+.2}", snapshot.price_trend)),
    ];

    let block = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Terrain")
            .border_style(theme.border()),
    );
    frame.render_widget(block, area);
}
