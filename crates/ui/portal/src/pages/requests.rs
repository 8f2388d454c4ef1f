use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use pki_api::CertificateRequest;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Text},
    widgets::{Block, Cell, List, ListItem, ListState, Paragraph, Row, Table, TableState, Wrap},
};
use tracing::warn;

use crate::{
    action::{Action, Dispatcher},
    core::{TaskKind, TaskResult},
    layers::NotificationKind,
    pages::{
        Page, PageContext, Remote, field_line, format_opt_timestamp, page_block, placeholder,
        step_selection, stop,
    },
    router::Route,
    style::{Role, Theme},
    tui::{EventResponse, Frame},
};

const LOAD_ERROR: &str = "Erreur lors du chargement";

/// Subject and documents of a request, shared with the admin detail view.
pub(super) fn subject_lines<'a>(request: &CertificateRequest, theme: &Theme) -> Vec<Line<'a>> {
    let opt = |v: &Option<String>| {
        v.clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "-".into())
    };
    vec![
        field_line("CN", request.common_name.clone(), theme),
        field_line("O", opt(&request.organization), theme),
        field_line("OU", opt(&request.organizational_unit), theme),
        field_line("L", opt(&request.locality), theme),
        field_line("ST", opt(&request.state), theme),
        field_line("C", opt(&request.country), theme),
        field_line("Email", request.email.clone(), theme),
        field_line("Soumise le", format_opt_timestamp(request.submitted_at.as_deref()), theme),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Requests,
    Documents,
}

/// The user's own certificate requests.
pub struct RequestsPage {
    dispatcher: Dispatcher,
    requests: Remote<Vec<CertificateRequest>>,
    selected: usize,
    selected_document: usize,
    focus: Focus,
}

impl RequestsPage {
    pub fn new(ctx: PageContext) -> Self {
        Self {
            dispatcher: ctx.dispatcher,
            requests: Remote::Loading,
            selected: 0,
            selected_document: 0,
            focus: Focus::Requests,
        }
    }

    fn current(&self) -> Option<&CertificateRequest> {
        self.requests.loaded().and_then(|r| r.get(self.selected))
    }

    fn download_selected_document(&self) -> Option<TaskKind> {
        let request = self.current()?;
        let file_name = request.documents.get(self.selected_document)?;
        Some(TaskKind::DownloadMyDocument {
            request_id: request.id.clone(),
            file_name: file_name.clone(),
        })
    }
}

impl Page for RequestsPage {
    fn name(&self) -> &str {
        "requests"
    }

    fn on_enter(&mut self) -> Result<()> {
        self.dispatcher.spawn(TaskKind::LoadMyRequests);
        Ok(())
    }

    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        let len = self.requests.loaded().map_or(0, Vec::len);
        let documents = self.current().map_or(0, |r| r.documents.len());
        match (key.code, self.focus) {
            (KeyCode::Tab | KeyCode::BackTab, _) => {
                self.focus = match self.focus {
                    Focus::Requests if documents > 0 => Focus::Documents,
                    _ => Focus::Requests,
                };
            }
            (KeyCode::Up | KeyCode::Char('k'), Focus::Requests) => {
                self.selected = step_selection(self.selected, len, -1);
                self.selected_document = 0;
            }
            (KeyCode::Down | KeyCode::Char('j'), Focus::Requests) => {
                self.selected = step_selection(self.selected, len, 1);
                self.selected_document = 0;
            }
            (KeyCode::Up | KeyCode::Char('k'), Focus::Documents) => {
                self.selected_document = step_selection(self.selected_document, documents, -1);
            }
            (KeyCode::Down | KeyCode::Char('j'), Focus::Documents) => {
                self.selected_document = step_selection(self.selected_document, documents, 1);
            }
            (KeyCode::Enter | KeyCode::Char('d'), Focus::Documents) => {
                if let Some(task) = self.download_selected_document() {
                    self.dispatcher.spawn(task);
                }
            }
            (KeyCode::Esc, Focus::Documents) => self.focus = Focus::Requests,
            (KeyCode::Char('n'), _) => return stop(Action::Navigate(Route::GenerateCsr)),
            (KeyCode::Char('r'), _) => self.dispatcher.spawn(TaskKind::LoadMyRequests),
            _ => return Ok(None),
        }
        stop(Action::Update)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        if let Action::TaskDone {
            result: TaskResult::MyRequests(outcome),
            ..
        } = action
        {
            match outcome {
                Ok(requests) => {
                    self.selected = self.selected.min(requests.len().saturating_sub(1));
                    self.selected_document = 0;
                    self.requests = Remote::Loaded(requests.clone());
                }
                Err(err) => {
                    warn!(error = %err, "loading own requests failed");
                    if !matches!(self.requests, Remote::Loaded(_)) {
                        self.requests = Remote::Failed(LOAD_ERROR.into());
                    }
                    self.dispatcher
                        .toast(NotificationKind::Error, err.user_message(LOAD_ERROR));
                }
            }
        }
        Ok(None)
    }

    fn shortcuts(&self) -> &'static [(&'static str, &'static str)] {
        match self.focus {
            Focus::Requests => &[
                ("↑/↓", "Sélection"),
                ("Tab", "Documents"),
                ("n", "Nouvelle demande"),
                ("r", "Actualiser"),
            ],
            Focus::Documents => &[("↑/↓", "Document"), ("Entrée", "Télécharger"), ("Échap", "Retour")],
        }
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) -> Result<()> {
        let inner = page_block(frame, area, "Mes demandes", theme);
        let requests = match &self.requests {
            Remote::Loading => {
                placeholder(frame, inner, "Chargement…", theme.style(Role::SubtleText));
                return Ok(());
            }
            Remote::Failed(message) => {
                placeholder(frame, inner, message, theme.style(Role::Danger));
                return Ok(());
            }
            Remote::Loaded(requests) if requests.is_empty() => {
                placeholder(
                    frame,
                    inner,
                    "Aucune demande. Appuyez sur n pour en créer une.",
                    theme.style(Role::SubtleText),
                );
                return Ok(());
            }
            Remote::Loaded(requests) => requests,
        };

        let [table_area, detail_area] =
            Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)])
                .areas(inner);
        let rows = requests.iter().map(|r| {
            Row::new([
                Cell::from(r.common_name.as_str()),
                Cell::from(r.status.as_str()).style(theme.status(&r.status)),
                Cell::from(format_opt_timestamp(r.submitted_at.as_deref())),
                Cell::from(r.documents.len().to_string()),
            ])
        });
        let table = Table::new(
            rows,
            [
                Constraint::Fill(1),
                Constraint::Length(10),
                Constraint::Length(17),
                Constraint::Length(4),
            ],
        )
        .header(Row::new(["CN", "Statut", "Soumise le", "Doc"]).style(theme.title(true)))
        .row_highlight_style(theme.selected_row())
        .block(Block::bordered().border_style(theme.border(self.focus == Focus::Requests)));
        let mut state = TableState::default().with_selected(Some(self.selected));
        frame.render_stateful_widget(table, table_area, &mut state);

        if let Some(request) = requests.get(self.selected) {
            let [subject_area, docs_area] =
                Layout::vertical([Constraint::Length(10), Constraint::Fill(1)]).areas(detail_area);
            frame.render_widget(
                Paragraph::new(Text::from(subject_lines(request, theme)))
                    .block(Block::bordered().title(" Détails ").border_style(theme.border(false)))
                    .wrap(Wrap { trim: true }),
                subject_area,
            );
            let focused = self.focus == Focus::Documents;
            let items: Vec<ListItem> = request
                .documents
                .iter()
                .map(|d| ListItem::new(d.as_str()))
                .collect();
            let list = List::new(items)
                .block(
                    Block::bordered()
                        .title(" Justificatifs ")
                        .title_style(theme.title(focused))
                        .border_style(theme.border(focused)),
                )
                .highlight_style(theme.selected_row());
            let mut state = ListState::default()
                .with_selected(focused.then_some(self.selected_document));
            frame.render_stateful_widget(list, docs_area, &mut state);
        }
        Ok(())
    }
}
