use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use pki_api::{Certificate, User};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Text},
    widgets::{Block, Paragraph, TableState},
};

use crate::{
    action::{Action, Dispatcher},
    core::{TaskKind, TaskResult},
    layers::NotificationKind,
    pages::{
        Page, PageContext, Remote, certificates::{LOAD_ERROR, certificate_table}, field_line,
        format_opt_timestamp, format_timestamp, page_block, placeholder, stop,
    },
    router::Route,
    style::{Role, Theme},
    tui::{EventResponse, Frame},
};

/// Profile summary and the user's certificates.
pub struct UserDashboardPage {
    dispatcher: Dispatcher,
    user: Option<User>,
    certs: Remote<Vec<Certificate>>,
}

impl UserDashboardPage {
    pub fn new(ctx: PageContext) -> Self {
        Self {
            dispatcher: ctx.dispatcher,
            user: ctx.user,
            certs: Remote::Loading,
        }
    }

    fn active_count(certs: &[Certificate]) -> usize {
        certs
            .iter()
            .filter(|c| matches!(c.status.as_str(), "ACTIVE" | "VALID"))
            .count()
    }
}

impl Page for UserDashboardPage {
    fn name(&self) -> &str {
        "dashboard"
    }

    fn on_enter(&mut self) -> Result<()> {
        self.dispatcher.spawn(TaskKind::LoadMyCertificates);
        Ok(())
    }

    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        match key.code {
            KeyCode::Char('r') => {
                self.dispatcher.spawn(TaskKind::LoadMyCertificates);
                stop(Action::Update)
            }
            KeyCode::Char('n') => stop(Action::Navigate(Route::GenerateCsr)),
            KeyCode::Enter => stop(Action::Navigate(Route::Certificates)),
            _ => Ok(None),
        }
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        if let Action::TaskDone {
            result: TaskResult::MyCertificates(outcome),
            ..
        } = action
        {
            match outcome {
                Ok(certs) => self.certs = Remote::Loaded(certs.clone()),
                Err(err) => {
                    if !matches!(self.certs, Remote::Loaded(_)) {
                        self.certs = Remote::Failed(LOAD_ERROR.into());
                    }
                    self.dispatcher
                        .toast(NotificationKind::Error, err.user_message(LOAD_ERROR));
                }
            }
        }
        Ok(None)
    }

    fn shortcuts(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("Entrée", "Mes certificats"),
            ("n", "Nouvelle demande"),
            ("r", "Actualiser"),
        ]
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) -> Result<()> {
        let [profile_area, certs_area] =
            Layout::vertical([Constraint::Length(8), Constraint::Fill(1)]).areas(area);

        let inner = page_block(frame, profile_area, "Mon profil", theme);
        if let Some(user) = &self.user {
            let mut lines = vec![
                field_line("Nom", user.full_name(), theme),
                field_line("Email", user.email.clone(), theme),
                field_line("Rôle", user.role.to_string(), theme),
                field_line("Inscrit le", format_timestamp(&user.created_at), theme),
                field_line(
                    "Dernière connexion",
                    format_opt_timestamp(user.last_login.as_deref()),
                    theme,
                ),
            ];
            if let Some(certs) = self.certs.loaded() {
                lines.push(Line::styled(
                    format!(
                        "{} certificat(s), dont {} actif(s)",
                        certs.len(),
                        Self::active_count(certs)
                    ),
                    theme.style(Role::Accent),
                ));
            }
            frame.render_widget(Paragraph::new(Text::from(lines)), inner);
        }

        let block = Block::bordered()
            .title(" Mes certificats ")
            .title_style(theme.title(false))
            .border_style(theme.border(false));
        let list = block.inner(certs_area);
        frame.render_widget(block, certs_area);
        match &self.certs {
            Remote::Loading => {
                placeholder(frame, list, "Chargement…", theme.style(Role::SubtleText))
            }
            Remote::Failed(message) => placeholder(frame, list, message, theme.style(Role::Danger)),
            Remote::Loaded(certs) if certs.is_empty() => placeholder(
                frame,
                list,
                "Aucun certificat. Appuyez sur n pour soumettre une demande.",
                theme.style(Role::SubtleText),
            ),
            Remote::Loaded(certs) => {
                let mut state = TableState::default();
                frame.render_stateful_widget(certificate_table(certs, theme), list, &mut state);
            }
        }
        Ok(())
    }
}
