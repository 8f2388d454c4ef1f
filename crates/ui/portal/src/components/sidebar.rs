use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use pki_api::User;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::Style,
    symbols::border,
    text::{Line, Span},
    widgets::{Block, List, ListItem, ListState, Paragraph},
};

use super::Component;
use crate::{
    action::Action,
    router::{MenuEntry, MenuTarget, Route, menu_for},
    style::Theme,
    tui::{EventResponse, Frame},
};

/// Role-specific navigation shown left of authenticated pages.
pub struct Sidebar {
    entries: Vec<MenuEntry>,
    state: ListState,
    focused: bool,
    user_name: String,
    user_email: String,
    role_label: &'static str,
}

impl Sidebar {
    pub fn new(user: &User, current: &Route) -> Self {
        let entries = menu_for(user.role);
        let selected = entries
            .iter()
            .position(|e| matches!(&e.target, MenuTarget::Route(r) if r == current))
            .unwrap_or(0);
        Self {
            entries,
            state: ListState::default().with_selected(Some(selected)),
            focused: false,
            user_name: user.full_name(),
            user_email: user.email.clone(),
            role_label: if user.role.is_admin() {
                "Administrateur"
            } else {
                "Utilisateur"
            },
        }
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn selected(&self) -> Option<&MenuEntry> {
        self.state.selected().and_then(|i| self.entries.get(i))
    }

    fn activate(&self) -> Option<Action> {
        self.selected().map(|entry| match &entry.target {
            MenuTarget::Route(route) => Action::Navigate(route.clone()),
            MenuTarget::Logout => Action::Logout,
        })
    }
}

impl Component for Sidebar {
    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        if !self.focused {
            return Ok(None);
        }
        let last = self.entries.len().saturating_sub(1);
        let selected = self.state.selected().unwrap_or(0);
        let action = match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.state.select(Some(selected.saturating_sub(1)));
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.state.select(Some((selected + 1).min(last)));
                None
            }
            KeyCode::Enter => {
                self.focused = false;
                self.activate()
            }
            KeyCode::Esc => {
                self.focused = false;
                None
            }
            _ => None,
        };
        Ok(Some(EventResponse::Stop(action.unwrap_or(Action::Update))))
    }

    fn draw(&mut self, f: &mut Frame<'_>, area: Rect, theme: &Theme) -> Result<()> {
        let [profile, menu] =
            Layout::vertical([Constraint::Length(5), Constraint::Fill(1)]).areas(area);

        let header = Paragraph::new(vec![
            Line::from(Span::styled(
                self.user_name.as_str(),
                theme.title(true),
            )),
            Line::from(Span::styled(
                self.user_email.as_str(),
                theme.style(crate::style::Role::SubtleText),
            )),
            Line::from(Span::styled(
                self.role_label,
                Style::default().fg(theme.roles.accent),
            )),
        ])
        .block(
            Block::bordered()
                .title(" PKI Souverain ")
                .border_set(border::ROUNDED)
                .border_style(theme.border(false)),
        );
        f.render_widget(header, profile);

        let items: Vec<ListItem> = self
            .entries
            .iter()
            .map(|entry| {
                let style = match entry.target {
                    MenuTarget::Logout => Style::default().fg(theme.roles.danger),
                    MenuTarget::Route(_) => Style::default().fg(theme.roles.text),
                };
                ListItem::new(Line::from(Span::styled(entry.label, style)))
            })
            .collect();
        let list = List::new(items)
            .highlight_style(if self.focused {
                theme.selected_row()
            } else {
                Style::default().fg(theme.roles.primary)
            })
            .highlight_symbol("▸ ")
            .block(
                Block::bordered()
                    .title(" Menu (Ctrl+B) ")
                    .title_style(theme.title(self.focused))
                    .border_set(border::ROUNDED)
                    .border_style(theme.border(self.focused)),
            );
        f.render_stateful_widget(list, menu, &mut self.state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use pki_api::Role;
    use pretty_assertions::assert_eq;

    fn admin() -> User {
        User {
            id: "1".into(),
            email: "root@pki.cm".into(),
            first_name: "Root".into(),
            last_name: "Admin".into(),
            role: Role::Admin,
            is_active: true,
            email_verified: true,
            created_at: String::new(),
            last_login: None,
        }
    }

    fn press(sidebar: &mut Sidebar, code: KeyCode) -> Option<EventResponse<Action>> {
        sidebar
            .handle_key_events(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap()
    }

    #[test]
    fn selects_current_route() {
        let sidebar = Sidebar::new(&admin(), &Route::AdminRequests);
        assert_eq!(sidebar.selected().map(|e| e.label), Some("Demandes"));
    }

    #[test]
    fn ignores_keys_until_focused() {
        let mut sidebar = Sidebar::new(&admin(), &Route::AdminDashboard);
        assert_eq!(press(&mut sidebar, KeyCode::Enter), None);

        sidebar.set_focused(true);
        press(&mut sidebar, KeyCode::Down);
        assert_eq!(
            press(&mut sidebar, KeyCode::Enter),
            Some(EventResponse::Stop(Action::Navigate(Route::AdminStats)))
        );
        assert!(!sidebar.is_focused());
    }

    #[test]
    fn last_entry_logs_out() {
        let mut sidebar = Sidebar::new(&admin(), &Route::AdminDashboard);
        sidebar.set_focused(true);
        for _ in 0..20 {
            press(&mut sidebar, KeyCode::Down);
        }
        assert_eq!(
            press(&mut sidebar, KeyCode::Enter),
            Some(EventResponse::Stop(Action::Logout))
        );
    }
}
