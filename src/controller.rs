use std::time::Duration;
use tracing::trace;

use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};

use crate::domain::{AppConfig, CMDMode, CarteraError, ExportFormat, Message};
use crate::model::Model;

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &AppConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, CarteraError> {
        if event::poll(Duration::from_millis(self.event_poll_time))?
            && let Event::Key(key) = event::read()?
            && key.kind == event::KeyEventKind::Press
        {
            return Ok(Self::map_key(model, key));
        }
        Ok(None)
    }

    fn map_key(model: &Model, key: KeyEvent) -> Option<Message> {
        if model.raw_keyevents() {
            return Some(Message::RawKey(key));
        }
        if model.awaiting_confirmation() {
            return Self::handle_confirm_key(key);
        }
        Self::handle_key(key)
    }

    fn handle_confirm_key(key: KeyEvent) -> Option<Message> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('s') | KeyCode::Enter => Some(Message::Confirm),
            KeyCode::Char('n') | KeyCode::Esc => Some(Message::Exit),
            _ => None,
        }
    }

    fn handle_key(key: KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Tab, _) => Some(Message::NextTable),
            (KeyCode::BackTab, _) => Some(Message::PrevTable),
            (KeyCode::Up | KeyCode::Char('k'), _) => Some(Message::MoveUp),
            (KeyCode::Down | KeyCode::Char('j'), _) => Some(Message::MoveDown),
            (KeyCode::Left | KeyCode::PageUp, _) => Some(Message::PrevPage),
            (KeyCode::Right | KeyCode::PageDown, _) => Some(Message::NextPage),
            (KeyCode::Char('+'), _) => Some(Message::PageSizeUp),
            (KeyCode::Char('-'), _) => Some(Message::PageSizeDown),
            (KeyCode::Char('o'), _) => Some(Message::NextSortMode),
            (KeyCode::Char('O'), _) => Some(Message::PrevSortMode),
            (KeyCode::Char('/'), _) => Some(Message::EnterCommand(CMDMode::Search)),
            (KeyCode::Char('f'), _) => Some(Message::EnterCommand(CMDMode::Status)),
            (KeyCode::Char('c'), _) => Some(Message::EnterCommand(CMDMode::Collector)),
            (KeyCode::Char('m'), _) => Some(Message::EnterCommand(CMDMode::Month)),
            (KeyCode::Char('x'), _) => Some(Message::ClearFilters),
            (KeyCode::Char('e'), _) => Some(Message::Export(ExportFormat::Csv)),
            (KeyCode::Char('E'), _) => Some(Message::Export(ExportFormat::Xls)),
            (KeyCode::Char('y'), _) => Some(Message::CopyRow),
            (KeyCode::Char('d'), _) => Some(Message::Delete),
            (KeyCode::Char('r'), _) => Some(Message::Reload),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Esc, _) => Some(Message::Exit),
            (KeyCode::Enter, _) => Some(Message::Confirm),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
