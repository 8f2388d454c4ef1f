use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    widgets::Paragraph,
};

use crate::{
    action::Action,
    components::{Component, PopupComponent},
    style::Theme,
    tui::{EventResponse, Frame},
};

use crate::components::popup::{centered_rect_fixed, draw_popup_frame, hints};

/// Shows a PEM block. `c` copies it through the terminal clipboard, `s`
/// saves it into the downloads directory.
pub struct PemViewer {
    title: String,
    file_name: String,
    pem: String,
    scroll: u16,
}

impl PemViewer {
    pub fn new(title: impl Into<String>, file_name: impl Into<String>, pem: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            file_name: file_name.into(),
            pem: pem.into(),
            scroll: 0,
        }
    }

    fn max_scroll(&self) -> u16 {
        self.pem.lines().count().saturating_sub(1) as u16
    }
}

impl Component for PemViewer {
    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        let action = match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.scroll = self.scroll.saturating_sub(1);
                Action::Update
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.scroll = (self.scroll + 1).min(self.max_scroll());
                Action::Update
            }
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_sub(10);
                Action::Update
            }
            KeyCode::PageDown => {
                self.scroll = (self.scroll + 10).min(self.max_scroll());
                Action::Update
            }
            KeyCode::Char('c') => Action::CopyToClipboard(self.pem.clone()),
            KeyCode::Char('s') => Action::SaveFile {
                file_name: self.file_name.clone(),
                bytes: self.pem.as_bytes().to_vec(),
            },
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => Action::ClosePopup,
            _ => Action::Update,
        };
        Ok(Some(EventResponse::Stop(action)))
    }

    fn draw(&mut self, f: &mut Frame<'_>, area: Rect, _theme: &Theme) -> Result<()> {
        let width = area.width.saturating_sub(4).min(76);
        let height = area.height.saturating_sub(2);
        let dialog = centered_rect_fixed(area, width, height);
        let inner = draw_popup_frame(f, dialog, &self.title);

        let [body, footer] =
            Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]).areas(inner);
        f.render_widget(
            Paragraph::new(self.pem.as_str())
                .style(Style::default().fg(Color::Green))
                .scroll((self.scroll, 0)),
            body,
        );
        f.render_widget(
            Paragraph::new(hints(&[
                ("↑/↓", "Défiler"),
                ("c", "Copier"),
                ("s", "Enregistrer"),
                ("Échap", "Fermer"),
            ])),
            footer,
        );
        Ok(())
    }
}

impl PopupComponent for PemViewer {}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;

    const PEM: &str = "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n";

    fn press(viewer: &mut PemViewer, code: KeyCode) -> Action {
        match viewer
            .handle_key_events(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap()
        {
            Some(EventResponse::Stop(action)) => action,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn copy_and_save() {
        let mut viewer = PemViewer::new("Certificat émis", "certificate-9.pem", PEM);
        assert_eq!(press(&mut viewer, KeyCode::Char('c')), Action::CopyToClipboard(PEM.into()));
        assert_eq!(
            press(&mut viewer, KeyCode::Char('s')),
            Action::SaveFile {
                file_name: "certificate-9.pem".into(),
                bytes: PEM.as_bytes().to_vec(),
            }
        );
        assert_eq!(press(&mut viewer, KeyCode::Esc), Action::ClosePopup);
    }

    #[test]
    fn scroll_is_bounded() {
        let mut viewer = PemViewer::new("t", "f.pem", PEM);
        for _ in 0..10 {
            press(&mut viewer, KeyCode::Down);
        }
        assert_eq!(viewer.scroll, 2);
        press(&mut viewer, KeyCode::PageUp);
        assert_eq!(viewer.scroll, 0);
    }
}
