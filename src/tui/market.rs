//! Market view - latest price, rolling statistics and feed health.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Sparkline},
    Frame,
};
use space_surfer::types::GameSnapshot;

use super::Theme;

pub fn render(frame: &mut Frame, area: Rect, snapshot: &GameSnapshot, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Price & feed
            Constraint::Length(3), // Volatility
            Constraint::Min(0),    // History
        ])
        .split(area);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[0]);

    render_price(frame, top[0], snapshot, theme);
    render_feed(frame, top[1], snapshot, theme);
    render_volatility(frame, chunks[1], snapshot, theme);
    render_history(frame, chunks[2], snapshot, theme);
}

fn render_price(frame: &mut Frame, area: Rect, snapshot: &GameSnapshot, theme: &Theme) {
    let lines = match snapshot.price_data {
        Some(tick) => vec![
            Line::from(vec![
                Span::styled("Price:  ", theme.muted()),
                Span::styled(format!("{:.4}", tick.price), theme.direction(tick.direction())),
            ]),
            Line::from(vec![
                Span::styled("Change: ", theme.muted()),
                Span::styled(
                    format!("{:+.4} ({:+.3}%)", tick.price_change, tick.price_change_percent),
                    theme.direction(tick.direction()),
                ),
            ]),
            Line::from(vec![
                Span::styled("EMA:    ", theme.muted()),
                Span::raw(format!("{:.4}", snapshot.volatility_data.ema)),
            ]),
            Line::from(vec![
                Span::styled("Published: ", theme.muted()),
                Span::raw(
                    chrono::DateTime::from_timestamp(tick.timestamp, 0)
                        .map(|t| t.format("%H:%M:%S").to_string())
                        .unwrap_or_else(|| tick.timestamp.to_string()),
                ),
            ]),
        ],
        None => vec![Line::from(Span::styled("Waiting for first price...", theme.muted()))],
    };

    let block = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(snapshot.instrument.to_string())
            .border_style(theme.border()),
    );
    frame.render_widget(block, area);
}

fn render_feed(frame: &mut Frame, area: Rect, snapshot: &GameSnapshot, theme: &Theme) {
    let feed = &snapshot.feed;
    let mut lines = vec![
        Line::from(vec![
            Span::styled("State: ", theme.muted()),
            Span::styled(format!("● {}", feed.state), theme.connection(feed.state)),
        ]),
        Line::from(vec![
            Span::styled("Attempts: ", theme.muted()),
            Span::raw(feed.attempt_count.to_string()),
        ]),
    ];
    if let Some(delay) = feed.backoff_delay_ms {
        lines.push(Line::from(vec![
            Span::styled("Retry in: ", theme.muted()),
            Span::raw(format!("{} ms", delay)),
        ]));
    }
    if let Some(error) = &feed.last_error {
        lines.push(Line::from(Span::styled(error.clone(), theme.muted())));
    }
    if feed.is_unavailable() {
        lines.push(Line::from(Span::styled(
            "Feed unavailable, press a to retry",
            theme.connection(feed.state),
        )));
    }

    let block = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Feed")
            .border_style(theme.border()),
    );
    frame.render_widget(block, area);
}

fn render_volatility(frame: &mut Frame, area: Rect, snapshot: &GameSnapshot, theme: &Theme) {
    let volatility = snapshot.volatility_data.volatility;
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Volatility")
                .border_style(theme.border()),
        )
        .gauge_style(theme.header())
        .ratio(volatility.clamp(0.0, 1.0))
        .label(format!("{:.1}%", volatility * 100.0));
    frame.render_widget(gauge, area);
}

/// Rescale prices onto a small integer range for the sparkline.
fn sparkline_points(history: &[f64]) -> Vec<u64> {
    let min = history.iter().copied().fold(f64::INFINITY, f64::min);
    let max = history.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    history
        .iter()
        .map(|price| {
            if span > 0.0 {
                ((price - min) / span * 99.0).round() as u64 + 1
            } else {
                50
            }
        })
        .collect()
}

fn render_history(frame: &mut Frame, area: Rect, snapshot: &GameSnapshot, theme: &Theme) {
    let points = sparkline_points(&snapshot.volatility_data.price_history);
    let sparkline = Sparkline::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("History ({} samples)", points.len()))
                .border_style(theme.border()),
        )
        .data(&points)
        .max(100)
        .style(theme.title());
    frame.render_widget(sparkline, area);
}
