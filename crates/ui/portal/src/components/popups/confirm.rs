use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Color, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Paragraph, Wrap},
};

use crate::{
    action::{Action, PopupId, PopupResult},
    components::{Component, PopupComponent},
    style::Theme,
    tui::{EventResponse, Frame},
};

use crate::components::popup::{centered_rect_fixed, draw_popup_frame, hints};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Ok,
    Cancel,
}

/// OK/Annuler dialog.
///
/// Left/Right or Tab switch the button, Enter answers with the selected one,
/// Esc cancels. The answer comes back as `Action::PopupResult`, which this
/// popup maps to `Action::ClosePopup` when it is re-injected.
pub struct ConfirmPopup {
    id: PopupId,
    title: String,
    question: String,
    ok_label: String,
    cancel_label: String,
    selected: Choice,
    min_width: u16,
    min_height: u16,
}

impl ConfirmPopup {
    pub fn new<T: Into<String>, Q: Into<String>>(id: PopupId, title: T, question: Q) -> Self {
        Self {
            id,
            title: title.into(),
            question: question.into(),
            ok_label: "Confirmer".into(),
            cancel_label: "Annuler".into(),
            selected: Choice::Cancel,
            min_width: 60,
            min_height: 9,
        }
    }

    fn confirm_action(&self) -> Action {
        let result = match self.selected {
            Choice::Ok => PopupResult::Confirmed,
            Choice::Cancel => PopupResult::Cancelled,
        };
        Action::PopupResult(self.id.clone(), result)
    }

    fn toggle_selection(&mut self) {
        self.selected = match self.selected {
            Choice::Ok => Choice::Cancel,
            Choice::Cancel => Choice::Ok,
        };
    }
}

impl Component for ConfirmPopup {
    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        let action = match key.code {
            KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::BackTab => {
                self.toggle_selection();
                Action::Update
            }
            KeyCode::Char('o') | KeyCode::Char('y') => {
                self.selected = Choice::Ok;
                self.confirm_action()
            }
            KeyCode::Enter => self.confirm_action(),
            KeyCode::Esc | KeyCode::Char('n') => {
                Action::PopupResult(self.id.clone(), PopupResult::Cancelled)
            }
            _ => Action::Update,
        };
        Ok(Some(EventResponse::Stop(action)))
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

        let mut lines: Vec<Line> = self
            .question
            .lines()
            .map(|l| Line::from(Span::raw(l.to_string())))
            .collect();
        if inner.height >= 3 {
            lines.push(Line::raw(""));
        }

        let selected = Style::default().fg(Color::Black).bg(Color::White).bold();
        let unselected = Style::default().fg(Color::White).bg(Color::Black);
        let button = |label: &str, active: bool| {
            Span::styled(
                format!("[ {label} ]"),
                if active { selected } else { unselected },
            )
        };

        let spacing = "   ";
        let buttons_len = (4 + self.ok_label.chars().count())
            + spacing.len()
            + (4 + self.cancel_label.chars().count());
        let pad = (inner.width as usize).saturating_sub(buttons_len) / 2;
        lines.push(Line::from(vec![
            Span::raw(" ".repeat(pad)),
            button(&self.ok_label, self.selected == Choice::Ok),
            Span::raw(spacing),
            button(&self.cancel_label, self.selected == Choice::Cancel),
        ]));

        if inner.height >= 4 {
            lines.push(Line::raw(""));
            lines.push(hints(&[
                ("←/→/Tab", "Choisir"),
                ("Entrée", "Valider"),
                ("Échap", "Annuler"),
            ]));
        }

        f.render_widget(
            Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true }),
            inner,
        );
        Ok(())
    }
}

impl PopupComponent for ConfirmPopup {
    fn cancel_action(&mut self) -> Option<Action> {
        Some(Action::PopupResult(self.id.clone(), PopupResult::Cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;

    fn press(popup: &mut ConfirmPopup, code: KeyCode) -> Action {
        match popup
            .handle_key_events(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap()
        {
            Some(EventResponse::Stop(action)) => action,
            other => panic!("popup must capture keys, got {other:?}"),
        }
    }

    #[test]
    fn defaults_to_cancel() {
        let mut popup = ConfirmPopup::new(PopupId::InitializeCa, "AC", "Initialiser ?");
        assert_eq!(
            press(&mut popup, KeyCode::Enter),
            Action::PopupResult(PopupId::InitializeCa, PopupResult::Cancelled)
        );
    }

    #[test]
    fn toggle_then_confirm() {
        let mut popup = ConfirmPopup::new(PopupId::InitializeCa, "AC", "Initialiser ?");
        assert_eq!(press(&mut popup, KeyCode::Tab), Action::Update);
        assert_eq!(
            press(&mut popup, KeyCode::Enter),
            Action::PopupResult(PopupId::InitializeCa, PopupResult::Confirmed)
        );
    }

    #[test]
    fn closes_on_its_own_result_only() {
        let mut popup = ConfirmPopup::new(PopupId::InitializeCa, "AC", "?");
        let own = Action::PopupResult(PopupId::InitializeCa, PopupResult::Confirmed);
        let other = Action::PopupResult(PopupId::RejectReason, PopupResult::Cancelled);
        assert_eq!(popup.update(&own).unwrap(), Some(Action::ClosePopup));
        assert_eq!(popup.update(&other).unwrap(), None);
    }
}
