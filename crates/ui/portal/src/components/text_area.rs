use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::Style,
    symbols::border,
    widgets::{Block, Paragraph},
};

use crate::{style::Theme, tui::Frame};

/// Multi-line plain text field for pasted PEM blocks. Editing is append-only
/// apart from Backspace; Ctrl+U empties it.
pub struct TextArea {
    label: &'static str,
    text: String,
}

impl TextArea {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            text: String::new(),
        }
    }

    pub fn value(&self) -> &str {
        &self.text
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.text.clear();
                true
            }
            _ if key.modifiers.contains(KeyModifiers::CONTROL) => false,
            KeyCode::Char(c) => {
                self.text.push(c);
                true
            }
            KeyCode::Enter => {
                self.text.push('\n');
                true
            }
            KeyCode::Backspace => self.text.pop().is_some(),
            _ => false,
        }
    }

    pub fn paste(&mut self, text: &str) {
        self.text.push_str(&text.replace("\r\n", "\n").replace('\r', "\n"));
    }

    pub fn draw(&self, frame: &mut Frame<'_>, area: Rect, theme: &Theme, focused: bool) {
        let inner_height = area.height.saturating_sub(2) as usize;
        let lines = self.text.lines().count() + usize::from(self.text.ends_with('\n'));
        let scroll = lines.saturating_sub(inner_height) as u16;
        let title = format!("{} ({} lignes)", self.label, self.text.lines().count());
        let widget = Paragraph::new(self.text.as_str())
            .scroll((scroll, 0))
            .style(Style::default().fg(if focused {
                theme.roles.text
            } else {
                theme.roles.subtle_text
            }))
            .block(
                Block::bordered()
                    .title(title)
                    .title_style(theme.title(focused))
                    .border_set(border::ROUNDED)
                    .border_style(theme.border(focused)),
            );
        frame.render_widget(widget, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn paste_normalizes_line_endings() {
        let mut area = TextArea::new("CSR");
        area.paste("-----BEGIN\r\nabc\r\n-----END");
        assert_eq!(area.value(), "-----BEGIN\nabc\n-----END");
        assert!(!area.is_blank());
    }

    #[test]
    fn ctrl_u_clears() {
        let mut area = TextArea::new("CSR");
        area.handle_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE));
        area.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(area.value(), "x\n");
        area.handle_key(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        assert!(area.is_blank());
    }
}
