use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    text::{Line, Span},
    widgets::{Block, Borders, Clear},
};

use crate::{action::Action, components::Component, tui::Frame};

/// A [`Component`] drawn over a backdrop that captures all key input while
/// it is open.
pub trait PopupComponent: Component {
    /// Action emitted on Esc.
    fn cancel_action(&mut self) -> Option<Action> {
        Some(Action::ClosePopup)
    }
}

/// Dims the page underneath a popup. Terminals have no transparency, so
/// this paints a solid background.
pub fn render_backdrop(frame: &mut Frame<'_>, area: Rect) {
    let backdrop = Block::default().style(Style::default().bg(Color::Black));
    frame.render_widget(backdrop, area);
}

/// Centered rectangle of the given size, clamped to `area`.
pub fn centered_rect_fixed(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);

    let x = area.x.saturating_add((area.width.saturating_sub(w)) / 2);
    let y = area.y.saturating_add((area.height.saturating_sub(h)) / 2);

    Rect {
        x,
        y,
        width: w,
        height: h,
    }
}

/// Clears `area` and draws a rounded, titled frame over it. Returns the
/// inner area.
pub fn draw_popup_frame(frame: &mut Frame<'_>, area: Rect, title: impl Into<String>) -> Rect {
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(format!(" {} ", title.into()))
        .borders(Borders::ALL)
        .border_set(symbols::border::ROUNDED)
        .style(Style::default().fg(Color::White).bg(Color::Black));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    inner
}

/// Dimmed `key: label` hint line shown at the bottom of popups.
pub fn hints(pairs: &[(&'static str, &'static str)]) -> Line<'static> {
    let mut spans = Vec::with_capacity(pairs.len() * 2);
    for (i, (key, label)) in pairs.iter().enumerate() {
        spans.push(Span::styled(*key, Style::default().fg(Color::White)));
        let sep = if i + 1 == pairs.len() { "" } else { "   " };
        spans.push(Span::raw(format!(": {label}{sep}")));
    }
    Line::from(spans).style(Style::default().fg(Color::DarkGray))
}
