use color_eyre::Result;
use crossterm::event::KeyEvent;
use ratatui::layout::Rect;

use crate::{
    action::Action,
    style::Theme,
    tui::{Event, EventResponse, Frame},
};

pub mod form;
pub mod popup;
pub mod popups;
pub mod sidebar;
pub mod text_area;

pub use form::{Form, FormEvent, TextField};
pub use popup::{PopupComponent, centered_rect_fixed, draw_popup_frame, render_backdrop};
pub use sidebar::Sidebar;
pub use text_area::TextArea;

/// A visual and interactive element that receives events, reacts to
/// actions and renders into an area.
pub trait Component {
    fn handle_events(&mut self, event: &Event) -> Result<Option<EventResponse<Action>>> {
        match event {
            Event::Key(key) => self.handle_key_events(*key),
            Event::Paste(text) => self.handle_paste(text),
            _ => Ok(None),
        }
    }

    fn handle_key_events(&mut self, _key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        Ok(None)
    }

    fn handle_paste(&mut self, _text: &str) -> Result<Option<EventResponse<Action>>> {
        Ok(None)
    }

    fn update(&mut self, _action: &Action) -> Result<Option<Action>> {
        Ok(None)
    }

    fn draw(&mut self, f: &mut Frame<'_>, area: Rect, theme: &Theme) -> Result<()>;
}
