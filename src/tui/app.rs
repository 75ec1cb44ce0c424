//! Main console application logic.

use super::{events, game, market, Route, Theme};
use crate::AppState;
use crossterm::{
    event::{KeyCode, KeyEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Tabs},
    Frame, Terminal,
};
use space_surfer::types::{GameAction, GameSnapshot};
use std::{
    io,
    sync::Arc,
    time::{Duration, Instant},
};

pub struct App {
    current_route: Route,
    app_state: Arc<AppState>,
    theme: Theme,
    should_quit: bool,
    /// Outcome of the last key-driven action, shown in the status bar.
    last_action: Option<(String, bool)>,
}

impl App {
    pub fn new(app_state: Arc<AppState>) -> Self {
        Self {
            current_route: Route::Game,
            app_state,
            theme: Theme::default(),
            should_quit: false,
            last_action: None,
        }
    }

    pub fn handle_event(&mut self, event: events::Event) {
        match event {
            events::Event::Key(key) => self.handle_key(&key),
            // Redraw happens on every loop iteration
            events::Event::Tick | events::Event::Resize(_, _) => {}
        }
    }

    fn handle_key(&mut self, key: &KeyEvent) {
        if events::is_quit(key) {
            self.should_quit = true;
            return;
        }

        for route in Route::all() {
            if events::is_key(key, KeyCode::Char(route.key())) {
                self.current_route = route;
                return;
            }
        }

        let action = if events::is_key(key, KeyCode::Char('a')) {
            let next = self.app_state.engine.snapshot().instrument.next();
            Some(GameAction::SelectInstrument {
                instrument_id: next.id,
            })
        } else {
            events::action_for(key)
        };

        if let Some(action) = action {
            let label = format!("{:?}", action);
            let accepted = self.app_state.engine.apply(action, Instant::now());
            self.last_action = Some((label, accepted));
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn render(&self, frame: &mut Frame) {
        let area = frame.size();
        let snapshot = self.app_state.engine.snapshot();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Tabs
                Constraint::Min(0),    // Content
                Constraint::Length(3), // Status bar
            ])
            .split(area);

        self.render_tabs(frame, chunks[0]);

        match self.current_route {
            Route::Game => game::render(frame, chunks[1], &snapshot, &self.theme),
            Route::Market => market::render(frame, chunks[1], &snapshot, &self.theme),
        }

        self.render_status_bar(frame, chunks[2], &snapshot);
    }

    fn render_tabs(&self, frame: &mut Frame, area: Rect) {
        let routes = Route::all();
        let titles: Vec<Line> = routes
            .iter()
            .map(|r| {
                Line::from(vec![
                    Span::styled(format!("[{}] ", r.key()), self.theme.muted()),
                    Span::raw(r.name()),
                ])
            })
            .collect();

        let selected = routes
            .iter()
            .position(|r| *r == self.current_route)
            .unwrap_or(0);

        let tabs = Tabs::new(titles)
            .block(Block::default().borders(Borders::ALL).title("Space Surfer"))
            .select(selected)
            .style(self.theme.tab_inactive())
            .highlight_style(self.theme.tab_active());

        frame.render_widget(tabs, area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect, snapshot: &GameSnapshot) {
        let mut spans = vec![
            Span::styled(
                format!("{}:{}", self.app_state.config.host, self.app_state.config.port),
                self.theme.title(),
            ),
            Span::raw(" | "),
            Span::styled(snapshot.feed.state.to_string(), self.theme.connection(snapshot.feed.state)),
            Span::raw(" | "),
            Span::styled("space/enter/r/x", self.theme.muted()),
            Span::raw(" play | "),
            Span::styled("a", self.theme.muted()),
            Span::raw(" instrument | "),
            Span::styled("q", self.theme.muted()),
            Span::raw(" quit"),
        ];
        if let Some((label, accepted)) = &self.last_action {
            spans.push(Span::raw(" | "));
            spans.push(Span::styled(
                format!("{} {}", label, if *accepted { "ok" } else { "ignored" }),
                self.theme.muted(),
            ));
        }

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border());
        frame.render_widget(block, area);

        let inner = Rect {
            x: area.x + 2,
            y: area.y + 1,
            width: area.width.saturating_sub(4),
            height: 1,
        };
        frame.render_widget(Line::from(spans), inner);
    }
}

/// Run the console until the user quits.
pub async fn run_tui(app_state: Arc<AppState>) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Redraw at roughly the server's frame cadence
    let tick_rate = app_state.config.frame_interval.max(Duration::from_millis(50));
    let mut app = App::new(app_state);
    let mut event_handler = events::EventHandler::new(tick_rate);

    loop {
        terminal.draw(|f| app.render(f))?;

        if let Some(event) = event_handler.next().await {
            app.handle_event(event);
        }

        if app.should_quit() {
            break;
        }
    }

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support;
    use crossterm::event::KeyModifiers;
    use space_surfer::types::SessionPhase;

    fn press(app: &mut App, code: KeyCode) {
        app.handle_event(events::Event::Key(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    #[test]
    fn test_route_keys_switch_views() {
        let mut app = App::new(Arc::new(test_support::state()));
        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.current_route, Route::Market);
        press(&mut app, KeyCode::Char('1'));
        assert_eq!(app.current_route, Route::Game);
    }

    #[test]
    fn test_space_begins_session() {
        let state = Arc::new(test_support::state());
        let mut app = App::new(state.clone());

        press(&mut app, KeyCode::Char(' '));
        assert_eq!(state.engine.snapshot().session.phase, SessionPhase::Instructions);
        assert_eq!(app.last_action, Some(("Begin".to_string(), true)));

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.last_action, Some(("Enter".to_string(), false)));
    }

    #[tokio::test]
    async fn test_cycle_instrument() {
        let state = Arc::new(test_support::state());
        let mut app = App::new(state.clone());
        let before = state.engine.snapshot().instrument;

        press(&mut app, KeyCode::Char('a'));
        assert_eq!(state.engine.snapshot().instrument, before.next());
        state.engine.shutdown();
    }

    #[test]
    fn test_quit() {
        let mut app = App::new(Arc::new(test_support::state()));
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit());
    }
}
