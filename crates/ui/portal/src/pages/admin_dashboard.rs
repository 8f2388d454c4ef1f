use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use pki_api::DashboardData;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::Modifier,
    text::{Line, Text},
    widgets::{Block, Paragraph, Wrap},
};
use tracing::warn;

use crate::{
    action::{Action, Dispatcher, PopupResult},
    core::{TaskKind, TaskResult},
    layers::NotificationKind,
    pages::{Page, PageContext, Remote, ca, page_block, placeholder, stop},
    router::Route,
    style::{Role, Theme},
    tui::{EventResponse, Frame},
};

const LOAD_ERROR: &str = "Erreur lors du chargement du tableau de bord";

pub struct AdminDashboardPage {
    dispatcher: Dispatcher,
    data: Remote<DashboardData>,
    initializing: bool,
}

impl AdminDashboardPage {
    pub fn new(ctx: PageContext) -> Self {
        Self {
            dispatcher: ctx.dispatcher,
            data: Remote::Loading,
            initializing: false,
        }
    }

    fn load(&self) {
        self.dispatcher.spawn(TaskKind::LoadAdminDashboard);
    }

    fn stat_card(frame: &mut Frame<'_>, area: Rect, label: &str, value: u64, role: Role, theme: &Theme) {
        let text = Text::from(vec![
            Line::styled(
                value.to_string(),
                theme.style(role).add_modifier(Modifier::BOLD),
            ),
            Line::styled(label.to_string(), theme.style(Role::SubtleText)),
        ]);
        frame.render_widget(
            Paragraph::new(text)
                .centered()
                .block(Block::bordered().border_style(theme.border(false))),
            area,
        );
    }
}

impl Page for AdminDashboardPage {
    fn name(&self) -> &str {
        "admin-dashboard"
    }

    fn on_enter(&mut self) -> Result<()> {
        self.load();
        Ok(())
    }

    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        match key.code {
            KeyCode::Char('i') if !self.initializing => {
                ca::request_init(&self.dispatcher, self.data.loaded().map(|d| &d.ca_status));
                stop(Action::Update)
            }
            KeyCode::Char('r') => {
                self.load();
                stop(Action::Update)
            }
            KeyCode::Char('d') | KeyCode::Enter => stop(Action::Navigate(Route::AdminRequests)),
            KeyCode::Char('s') => stop(Action::Navigate(Route::AdminStats)),
            _ => Ok(None),
        }
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        if ca::on_popup(&self.dispatcher, action) {
            self.initializing = matches!(action, Action::PopupResult(_, PopupResult::Confirmed));
            return Ok(None);
        }
        match action {
            Action::TaskDone {
                result: TaskResult::AdminDashboard(outcome),
                ..
            } => match outcome {
                Ok(data) => self.data = Remote::Loaded(data.clone()),
                Err(err) => {
                    warn!(error = %err, "dashboard load failed");
                    if !matches!(self.data, Remote::Loaded(_)) {
                        self.data = Remote::Failed(LOAD_ERROR.into());
                    }
                    self.dispatcher
                        .toast(NotificationKind::Error, err.user_message(LOAD_ERROR));
                }
            },
            Action::TaskDone {
                result: TaskResult::CaInitialized(outcome),
                ..
            } => {
                self.initializing = false;
                if ca::on_initialized(&self.dispatcher, outcome).is_some() {
                    self.load();
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn shortcuts(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("d", "Demandes"),
            ("s", "Statistiques"),
            ("i", "Initialiser l'AC"),
            ("r", "Actualiser"),
        ]
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) -> Result<()> {
        let inner = page_block(frame, area, "Administration", theme);
        let data = match &self.data {
            Remote::Loading => {
                placeholder(frame, inner, "Chargement…", theme.style(Role::SubtleText));
                return Ok(());
            }
            Remote::Failed(message) => {
                placeholder(frame, inner, message, theme.style(Role::Danger));
                return Ok(());
            }
            Remote::Loaded(data) => data,
        };

        let [cards, ca_area] =
            Layout::vertical([Constraint::Length(4), Constraint::Fill(1)]).areas(inner);
        let [users, pending, active, revoked] = Layout::horizontal([Constraint::Fill(1); 4]).areas(cards);
        Self::stat_card(frame, users, "Utilisateurs", data.total_users, Role::Info, theme);
        Self::stat_card(frame, pending, "Demandes en attente", data.pending_requests, Role::Warning, theme);
        Self::stat_card(frame, active, "Certificats actifs", data.active_certificates, Role::Success, theme);
        Self::stat_card(frame, revoked, "Certificats révoqués", data.revoked_certificates, Role::Danger, theme);

        let mut lines = ca::status_lines(&data.ca_status, theme);
        if self.initializing {
            lines.push(Line::styled("Initialisation en cours…", theme.style(Role::SubtleText)));
        } else if !data.ca_status.is_initialized {
            lines.push(Line::styled(
                "Appuyez sur i pour initialiser l'AC racine.",
                theme.style(Role::Accent),
            ));
        }
        frame.render_widget(
            Paragraph::new(Text::from(lines))
                .wrap(Wrap { trim: true })
                .block(
                    Block::bordered()
                        .title(" Autorité racine ")
                        .title_style(theme.title(false))
                        .border_style(theme.border(false)),
                ),
            ca_area,
        );
        Ok(())
    }
}
