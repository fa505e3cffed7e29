use std::time::Duration;
use tracing::trace;

use ratatui::crossterm::event::{self, Event, KeyCode};

use crate::domain::{DeskConfig, DeskError, Message};
use crate::model::Model;
use crate::records::DeskView;

pub struct Controller {
    event_poll_ms: u64,
}

impl Controller {
    pub fn new(config: &DeskConfig) -> Self {
        Self {
            event_poll_ms: config.event_poll_ms,
        }
    }

    /// Poll for one terminal event and map it to a Message. While the
    /// model collects text the key goes through unmapped.
    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, DeskError> {
        if event::poll(Duration::from_millis(self.event_poll_ms))? {
            match event::read()? {
                // crossterm also emits release and repeat events on Windows
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    if model.raw_keyevents() {
                        return Ok(Some(Message::RawKey(key)));
                    }
                    return Ok(self.handle_key(key));
                }
                Event::Resize(width, height) => {
                    return Ok(Some(Message::Resize(width as usize, height as usize)));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Char('/') => Some(Message::Search),
            KeyCode::Char('f') => Some(Message::Filter),
            KeyCode::Char('s') => Some(Message::SortAscending),
            KeyCode::Char('S') => Some(Message::SortDescending),
            KeyCode::Char('c') => Some(Message::ClearSort),
            KeyCode::Char('i') => Some(Message::ToggleIndex),
            KeyCode::Char('y') => Some(Message::CopyCell),
            KeyCode::Char('Y') => Some(Message::CopyRow),
            KeyCode::Char('b') => Some(Message::Breakdown),
            KeyCode::Char('n') => Some(Message::NewRule),
            KeyCode::Char('a') => Some(Message::Acknowledge),
            KeyCode::Char('x') => Some(Message::Remove),
            KeyCode::Char('t') => Some(Message::Toggle),
            KeyCode::Char(chr @ '1'..='5') => view_message(chr),
            KeyCode::Up => Some(Message::MoveUp),
            KeyCode::Down => Some(Message::MoveDown),
            KeyCode::Left => Some(Message::MoveLeft),
            KeyCode::Right => Some(Message::MoveRight),
            KeyCode::PageUp => Some(Message::MovePageUp),
            KeyCode::PageDown => Some(Message::MovePageDown),
            KeyCode::Home => Some(Message::MoveBeginning),
            KeyCode::End => Some(Message::MoveEnd),
            KeyCode::Enter => Some(Message::Enter),
            KeyCode::Esc => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

fn view_message(chr: char) -> Option<Message> {
    let idx = chr.to_digit(10)? as usize - 1;
    DeskView::ALL.get(idx).copied().map(Message::ShowView)
}
