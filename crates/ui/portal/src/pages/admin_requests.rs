use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use pki_api::{CertificateRequest, RequestStatus};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, Table, TableState},
};
use tracing::{debug, warn};

use crate::{
    action::{Action, Dispatcher},
    core::{TaskKind, TaskResult},
    layers::NotificationKind,
    pages::{Page, PageContext, format_opt_timestamp, page_block, placeholder, step_selection, stop},
    pagination::Pager,
    router::Route,
    style::{Role, Theme},
    tui::{EventResponse, Frame},
};

const LOAD_ERROR: &str = "Erreur lors du chargement";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Pending,
    Issued,
    Rejected,
}

impl StatusFilter {
    fn next(self) -> Self {
        match self {
            StatusFilter::All => StatusFilter::Pending,
            StatusFilter::Pending => StatusFilter::Issued,
            StatusFilter::Issued => StatusFilter::Rejected,
            StatusFilter::Rejected => StatusFilter::All,
        }
    }

    fn status(self) -> Option<RequestStatus> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Pending => Some(RequestStatus::Pending),
            StatusFilter::Issued => Some(RequestStatus::Issued),
            StatusFilter::Rejected => Some(RequestStatus::Rejected),
        }
    }

    fn label(self) -> &'static str {
        match self {
            StatusFilter::All => "Toutes",
            StatusFilter::Pending => "En attente",
            StatusFilter::Issued => "Émises",
            StatusFilter::Rejected => "Rejetées",
        }
    }
}

/// Paginated, filterable list of every certificate request.
pub struct AdminRequestsPage {
    dispatcher: Dispatcher,
    filter: StatusFilter,
    pager: Pager,
    items: Vec<CertificateRequest>,
    selected: usize,
    loading: bool,
    error: Option<String>,
}

impl AdminRequestsPage {
    pub fn new(ctx: PageContext) -> Self {
        Self {
            dispatcher: ctx.dispatcher,
            filter: StatusFilter::All,
            pager: Pager::new(ctx.config.default_page_size),
            items: Vec::new(),
            selected: 0,
            loading: true,
            error: None,
        }
    }

    fn load(&mut self) {
        self.loading = true;
        self.dispatcher.spawn(TaskKind::LoadRequests {
            status: self.filter.status(),
            page: self.pager.page(),
            size: self.pager.size(),
        });
    }
}

impl Page for AdminRequestsPage {
    fn name(&self) -> &str {
        "admin-requests"
    }

    fn on_enter(&mut self) -> Result<()> {
        self.load();
        Ok(())
    }

    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = step_selection(self.selected, self.items.len(), -1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected = step_selection(self.selected, self.items.len(), 1);
            }
            KeyCode::Right | KeyCode::Char('n') => {
                if self.pager.next() {
                    self.load();
                }
            }
            KeyCode::Left | KeyCode::Char('p') => {
                if self.pager.prev() {
                    self.load();
                }
            }
            KeyCode::Char('f') => {
                self.filter = self.filter.next();
                self.pager.reset();
                self.load();
            }
            KeyCode::Char('z') => {
                self.pager.cycle_size();
                self.load();
            }
            KeyCode::Char('r') => self.load(),
            KeyCode::Enter => match self.items.get(self.selected) {
                Some(request) => {
                    return stop(Action::Navigate(Route::AdminRequestDetail(
                        request.id.clone(),
                    )));
                }
                None => return Ok(None),
            },
            _ => return Ok(None),
        }
        stop(Action::Update)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        if let Action::TaskDone {
            result: TaskResult::Requests(outcome),
            ..
        } = action
        {
            self.loading = false;
            match outcome {
                Ok(paged) => {
                    if self.pager.absorb(paged) {
                        debug!(page = self.pager.page(), "page out of range, refetching");
                        self.load();
                        return Ok(None);
                    }
                    self.error = None;
                    self.items = paged.items.clone();
                    self.selected = self.selected.min(self.items.len().saturating_sub(1));
                }
                Err(err) => {
                    warn!(error = %err, "loading requests failed");
                    let message = err.user_message(LOAD_ERROR);
                    self.error = Some(message.clone());
                    self.dispatcher.toast(NotificationKind::Error, message);
                }
            }
        }
        Ok(None)
    }

    fn shortcuts(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("Entrée", "Ouvrir"),
            ("←/→", "Page"),
            ("f", "Filtre"),
            ("z", "Taille"),
            ("r", "Actualiser"),
        ]
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) -> Result<()> {
        let inner = page_block(frame, area, "Demandes de certificat", theme);
        let [toolbar, body, status] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(inner);

        let toolbar_line = Line::from(vec![
            Span::styled("Statut : ", theme.style(Role::SubtleText)),
            Span::styled(self.filter.label(), theme.style(Role::Accent)),
            Span::styled("    Par page : ", theme.style(Role::SubtleText)),
            Span::styled(self.pager.size().to_string(), theme.style(Role::Accent)),
            Span::styled(
                format!("    {} demande(s)", self.pager.total()),
                theme.style(Role::SubtleText),
            ),
        ]);
        frame.render_widget(Paragraph::new(toolbar_line), toolbar);

        if self.items.is_empty() {
            let (text, role) = match (&self.error, self.loading) {
                (Some(error), _) => (error.as_str(), Role::Danger),
                (None, true) => ("Chargement…", Role::SubtleText),
                (None, false) => ("Aucune demande.", Role::SubtleText),
            };
            placeholder(frame, body, text, theme.style(role));
        } else {
            let rows = self.items.iter().map(|r| {
                Row::new([
                    Cell::from(r.common_name.as_str()),
                    Cell::from(r.requester().to_string()),
                    Cell::from(r.status.as_str()).style(theme.status(&r.status)),
                    Cell::from(format_opt_timestamp(r.submitted_at.as_deref())),
                ])
            });
            let table = Table::new(
                rows,
                [
                    Constraint::Fill(1),
                    Constraint::Fill(1),
                    Constraint::Length(10),
                    Constraint::Length(17),
                ],
            )
            .header(
                Row::new(["CN", "Demandeur", "Statut", "Soumise le"])
                    .style(theme.title(true))
                    .bottom_margin(1),
            )
            .row_highlight_style(theme.selected_row());
            let mut state = TableState::default().with_selected(Some(self.selected));
            frame.render_stateful_widget(table, body, &mut state);
        }

        let page_line = Line::styled(
            format!(
                "Page {} / {}{}",
                self.pager.page() + 1,
                self.pager.total_pages(),
                if self.loading { "  ·  chargement…" } else { "" }
            ),
            theme.style(Role::Muted),
        );
        frame.render_widget(Paragraph::new(page_line).right_aligned(), status);
        Ok(())
    }
}
