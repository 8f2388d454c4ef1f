//! Single-line input fields and a focus-cycling form built from them.

use crossterm::event::{Event as CrosstermEvent, KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::Style,
    symbols::border,
    widgets::{Block, Paragraph},
};
use tui_input::{Input, InputRequest, backend::crossterm::EventHandler as _};

use crate::{style::Theme, tui::Frame};

pub struct TextField {
    label: &'static str,
    input: Input,
    masked: bool,
    transform: Option<fn(&str) -> String>,
}

impl TextField {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            input: Input::default(),
            masked: false,
            transform: None,
        }
    }

    /// Shows `•` instead of the typed characters.
    pub fn masked(mut self) -> Self {
        self.masked = true;
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.set_value(value);
        self
    }

    /// Rewrites the value after every edit, e.g. to upper-case it.
    pub fn with_transform(mut self, transform: fn(&str) -> String) -> Self {
        self.transform = Some(transform);
        let value = self.input.value().to_string();
        self.set_value(value);
        self
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn value(&self) -> &str {
        self.input.value()
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        let value = value.into();
        let value = match self.transform {
            Some(transform) => transform(&value),
            None => value,
        };
        self.input = Input::new(value);
    }

    pub fn clear(&mut self) {
        self.input.reset();
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let changed = self
            .input
            .handle_event(&CrosstermEvent::Key(key))
            .map(|state| state.value)
            .unwrap_or(false);
        if changed {
            self.apply_transform();
        }
        changed
    }

    pub fn paste(&mut self, text: &str) {
        for c in text.chars().filter(|c| !c.is_control()) {
            self.input.handle(InputRequest::InsertChar(c));
        }
        self.apply_transform();
    }

    fn apply_transform(&mut self) {
        if let Some(transform) = self.transform {
            let next = transform(self.input.value());
            if next != self.input.value() {
                self.input = Input::new(next);
            }
        }
    }

    pub fn draw(&self, frame: &mut Frame<'_>, area: Rect, theme: &Theme, focused: bool) {
        // 2 for the borders, 1 for the cursor
        let width = area.width.max(3) - 3;
        let scroll = self.input.visual_scroll(width as usize);
        let shown = if self.masked {
            self.input.value().chars().map(|_| '•').collect()
        } else {
            self.input.value().to_string()
        };
        let input_style = if focused {
            Style::default().fg(theme.roles.text)
        } else {
            Style::default().fg(theme.roles.subtle_text)
        };
        let widget = Paragraph::new(shown)
            .style(input_style)
            .scroll((0, scroll as u16))
            .block(
                Block::bordered()
                    .title(self.label)
                    .title_style(theme.title(focused))
                    .border_set(border::ROUNDED)
                    .border_style(theme.border(focused)),
            );
        frame.render_widget(widget, area);

        if focused {
            let x = self.input.visual_cursor().max(scroll) - scroll + 1;
            frame.set_cursor_position((area.x + x as u16, area.y + 1));
        }
    }
}

/// Outcome of a key press inside a [`Form`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
    Submitted,
    Edited,
    Moved,
    Ignored,
}

pub struct Form {
    fields: Vec<TextField>,
    focus: usize,
}

impl Form {
    pub fn new(fields: Vec<TextField>) -> Self {
        Self { fields, focus: 0 }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn value(&self, index: usize) -> &str {
        self.fields.get(index).map(TextField::value).unwrap_or("")
    }

    pub fn field_mut(&mut self, index: usize) -> Option<&mut TextField> {
        self.fields.get_mut(index)
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn set_focus(&mut self, index: usize) {
        if index < self.fields.len() {
            self.focus = index;
        }
    }

    pub fn next(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    pub fn prev(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    pub fn clear_masked(&mut self) {
        for field in self.fields.iter_mut().filter(|f| f.masked) {
            field.clear();
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormEvent {
        match key.code {
            KeyCode::Tab | KeyCode::Down => {
                self.next();
                FormEvent::Moved
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.prev();
                FormEvent::Moved
            }
            KeyCode::Enter => FormEvent::Submitted,
            _ if key.modifiers.contains(KeyModifiers::CONTROL) => FormEvent::Ignored,
            _ => match self.fields.get_mut(self.focus) {
                Some(field) => {
                    if field.handle_key(key) {
                        FormEvent::Edited
                    } else {
                        FormEvent::Ignored
                    }
                }
                None => FormEvent::Ignored,
            },
        }
    }

    pub fn paste(&mut self, text: &str) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.paste(text);
        }
    }

    /// Height needed to draw every field.
    pub fn height(&self) -> u16 {
        self.fields.len() as u16 * 3
    }

    /// Draws the fields stacked, highlighting the focused one when the form
    /// itself has focus.
    pub fn draw(&self, frame: &mut Frame<'_>, area: Rect, theme: &Theme, active: bool) {
        let rows = Layout::vertical(self.fields.iter().map(|_| Constraint::Length(3))).split(area);
        for (i, (field, row)) in self.fields.iter().zip(rows.iter()).enumerate() {
            field.draw(frame, *row, theme, active && i == self.focus);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(form: &mut Form, text: &str) {
        for c in text.chars() {
            form.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn typing_and_focus_cycle() {
        let mut form = Form::new(vec![TextField::new("Email"), TextField::new("Mot de passe").masked()]);
        type_text(&mut form, "a@b.cm");
        assert_eq!(form.handle_key(key(KeyCode::Tab)), FormEvent::Moved);
        type_text(&mut form, "secret");
        assert_eq!(form.value(0), "a@b.cm");
        assert_eq!(form.value(1), "secret");

        form.handle_key(key(KeyCode::Tab));
        assert_eq!(form.focus(), 0);
        form.handle_key(key(KeyCode::BackTab));
        assert_eq!(form.focus(), 1);
        assert_eq!(form.handle_key(key(KeyCode::Enter)), FormEvent::Submitted);

        form.clear_masked();
        assert_eq!(form.value(1), "");
        assert_eq!(form.value(0), "a@b.cm");
    }

    #[test]
    fn transform_applies_on_type_and_paste() {
        let mut field = TextField::new("Pays (C)")
            .with_transform(crate::validation::normalize_country)
            .with_value("cm");
        assert_eq!(field.value(), "CM");
        field.clear();
        field.paste("fra");
        assert_eq!(field.value(), "FR");
    }

    #[test]
    fn keys_report_whether_the_field_changed() {
        let mut form = Form::new(vec![TextField::new("Email")]);
        assert_eq!(form.handle_key(key(KeyCode::Char('a'))), FormEvent::Edited);
        assert_eq!(form.handle_key(key(KeyCode::Backspace)), FormEvent::Edited);
        assert_eq!(form.handle_key(key(KeyCode::Backspace)), FormEvent::Ignored);
        assert_eq!(form.handle_key(key(KeyCode::F(5))), FormEvent::Ignored);
        assert_eq!(form.value(0), "");
    }

    #[test]
    fn ctrl_keys_do_not_edit() {
        let mut form = Form::new(vec![TextField::new("x")]);
        let ctrl_s = KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL);
        assert_eq!(form.handle_key(ctrl_s), FormEvent::Ignored);
        assert_eq!(form.value(0), "");
    }
}
