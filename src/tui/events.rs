//! Event handling for the console.

use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyModifiers};
use space_surfer::types::GameAction;
use std::time::Duration;
use tokio::sync::mpsc;

/// Events that can occur in the console.
#[derive(Debug, Clone)]
pub enum Event {
    /// Keyboard input.
    Key(KeyEvent),
    /// Redraw tick.
    Tick,
    Resize(u16, u16),
}

/// Polls the terminal on a blocking thread and forwards events.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        // crossterm polling blocks, keep it off the async workers
        tokio::task::spawn_blocking(move || loop {
            let event = if event::poll(tick_rate).unwrap_or(false) {
                match event::read() {
                    Ok(CrosstermEvent::Key(key)) => Event::Key(key),
                    Ok(CrosstermEvent::Resize(w, h)) => Event::Resize(w, h),
                    _ => continue,
                }
            } else {
                Event::Tick
            };
            if tx.send(event).is_err() {
                break;
            }
        });

        Self { rx }
    }

    /// Receive the next event.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

/// Check if a key event matches a specific key code.
pub fn is_key(event: &KeyEvent, code: KeyCode) -> bool {
    event.code == code && event.modifiers == KeyModifiers::NONE
}

/// Check if a key event is `q` or Ctrl+C.
pub fn is_quit(event: &KeyEvent) -> bool {
    event.code == KeyCode::Char('c') && event.modifiers == KeyModifiers::CONTROL
        || is_key(event, KeyCode::Char('q'))
}

/// Session action bound to a key, if any. Instrument cycling is handled by
/// the app since it needs the current selection.
pub fn action_for(event: &KeyEvent) -> Option<GameAction> {
    if event.modifiers != KeyModifiers::NONE {
        return None;
    }
    match event.code {
        KeyCode::Char(' ') => Some(GameAction::Begin),
        KeyCode::Enter => Some(GameAction::Enter),
        KeyCode::Char('r') => Some(GameAction::Restart),
        KeyCode::Char('x') => Some(GameAction::Collision),
        _ => None,
    }
}
