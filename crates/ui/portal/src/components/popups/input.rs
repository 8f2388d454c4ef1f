use color_eyre::Result;
use crossterm::event::{Event as CrosstermEvent, KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Color, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use tui_input::{Input, InputRequest, backend::crossterm::EventHandler};

use crate::{
    action::{Action, PopupId, PopupResult},
    components::{Component, PopupComponent},
    style::Theme,
    tui::{EventResponse, Frame},
};

use crate::components::popup::{centered_rect_fixed, draw_popup_frame, hints};

pub type Validator = Box<dyn Fn(&str) -> std::result::Result<(), String> + Send + Sync + 'static>;

/// Single-line input dialog with an optional validator.
///
/// Enter validates and answers `PopupResult::InputSubmitted`, Esc answers
/// `PopupResult::Cancelled`. Every other key edits the field.
pub struct InputPopup {
    id: PopupId,
    title: String,
    label: String,
    input: Input,
    error: Option<String>,
    validator: Option<Validator>,
    min_width: u16,
    min_height: u16,
}

impl InputPopup {
    pub fn new<T: Into<String>, L: Into<String>, V: Into<String>>(
        id: PopupId,
        title: T,
        label: L,
        initial_value: V,
        validator: Option<Validator>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            label: label.into(),
            input: Input::new(initial_value.into()),
            error: None,
            validator,
            min_width: 64,
            min_height: 10,
        }
    }

    pub fn value(&self) -> &str {
        self.input.value()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn submit(&mut self) -> Action {
        let checked = match &self.validator {
            Some(validate) => validate(self.input.value()),
            None => Ok(()),
        };
        match checked {
            Ok(()) => {
                self.error = None;
                Action::PopupResult(
                    self.id.clone(),
                    PopupResult::InputSubmitted(self.input.value().trim().to_string()),
                )
            }
            Err(msg) => {
                self.error = Some(msg);
                Action::Update
            }
        }
    }

    fn input_box_area(inner: Rect) -> Rect {
        let box_height = 3;
        let y = inner.y.saturating_add(2).min(
            inner
                .y
                .saturating_add(inner.height.saturating_sub(box_height)),
        );
        Rect {
            x: inner.x,
            y,
            width: inner.width,
            height: box_height,
        }
    }
}

impl Component for InputPopup {
    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        let action = match key.code {
            KeyCode::Enter => self.submit(),
            KeyCode::Esc => Action::PopupResult(self.id.clone(), PopupResult::Cancelled),
            _ => {
                self.input.handle_event(&CrosstermEvent::Key(key));
                self.error = None;
                Action::Update
            }
        };
        Ok(Some(EventResponse::Stop(action)))
    }

    fn handle_paste(&mut self, text: &str) -> Result<Option<EventResponse<Action>>> {
        for c in text.chars().filter(|c| !c.is_control()) {
            self.input.handle(InputRequest::InsertChar(c));
        }
        Ok(Some(EventResponse::Stop(Action::Update)))
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::PopupResult(id, _) if *id == self.id => Ok(Some(Action::ClosePopup)),
            _ => Ok(None),
        }
    }

    fn draw(&mut self, f: &mut Frame<'_>, area: Rect, _theme: &Theme) -> Result<()> {
        if area.width < 5 || area.height < 5 {
            return Ok(());
        }

        let dialog = centered_rect_fixed(area, self.min_width, self.min_height);
        let inner = draw_popup_frame(f, dialog, &self.title);

        let label = Paragraph::new(Text::from(Line::from(vec![
            Span::styled(self.label.as_str(), Style::default().bold()),
            Span::raw(" :"),
        ])))
        .wrap(Wrap { trim: true });
        f.render_widget(label, Rect { height: 1, ..inner });

        let input_box = Self::input_box_area(inner);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(ratatui::widgets::BorderType::Rounded);
        let input_inner = block.inner(input_box);
        f.render_widget(block, input_box);

        let width = input_inner.width.max(1) as usize;
        let scroll = self.input.visual_scroll(width.saturating_sub(1));
        f.render_widget(
            Paragraph::new(self.input.value()).scroll((0, scroll as u16)),
            input_inner,
        );
        if input_inner.width > 0 && input_inner.height > 0 {
            let x = (self.input.visual_cursor().max(scroll) - scroll) as u16;
            f.set_cursor_position((input_inner.x + x.min(input_inner.width - 1), input_inner.y));
        }

        if let Some(err) = &self.error {
            let y = (input_box.y + input_box.height).min(inner.y + inner.height.saturating_sub(1));
            f.render_widget(
                Paragraph::new(Span::styled(err.as_str(), Style::default().fg(Color::Red))),
                Rect {
                    x: inner.x,
                    y,
                    width: inner.width,
                    height: 1,
                },
            );
        }

        let hints_y = inner.y + inner.height.saturating_sub(1);
        if hints_y > input_box.y + input_box.height {
            f.render_widget(
                Paragraph::new(hints(&[("Entrée", "Valider"), ("Échap", "Annuler")])),
                Rect {
                    x: inner.x,
                    y: hints_y,
                    width: inner.width,
                    height: 1,
                },
            );
        }
        Ok(())
    }
}

impl PopupComponent for InputPopup {
    fn cancel_action(&mut self) -> Option<Action> {
        Some(Action::PopupResult(self.id.clone(), PopupResult::Cancelled))
    }
}
